use std::sync::Arc;
use std::task::{ Context, Poll };
use futures::task::noop_waker_ref;
use hardpoint_toolkit::{ Error, hp_unwrap, log_extra };
use crate::engine::context::QueryContext;
use crate::engine::query::{ HardpointQuery, QueryProcedure, ValueMap };
use crate::hardpoint::object::ObjectMap;

/* A HardpointTask runs one query's procedure for one hardpoint over the
 * objects that query accepted. The procedure is polled until it suspends
 * through its context; while anything it yielded is unfinished the task is
 * blocked and is not polled.
 */
pub(crate) struct HardpointTask {
    query: Arc<dyn HardpointQuery>,
    objects: ObjectMap,
    hardpoint: String,
    context: QueryContext,
    procedure: Option<QueryProcedure>,
    complete: bool
}

impl HardpointTask {
    pub(crate) fn new(query: &Arc<dyn HardpointQuery>, objects: ObjectMap, hardpoint: &str, context: QueryContext) -> HardpointTask {
        HardpointTask {
            query: query.clone(),
            objects,
            hardpoint: hardpoint.to_string(),
            context,
            procedure: None,
            complete: false
        }
    }

    pub(crate) fn is_complete(&self) -> bool { self.complete }

    pub(crate) fn describe_block(&self) -> String {
        let block = self.context.block();
        let requests = block.blocking_requests();
        format!("{} on {} future(s) and request(s) for {:?}",self.query.describe(),block.blocking_futures(),requests)
    }

    /* True if the task moved on: it yielded something new or finished. */
    pub(crate) fn update(&mut self) -> Result<bool,Error> {
        if self.complete || self.context.block().is_blocked() { return Ok(false); }
        if self.procedure.is_none() {
            self.procedure = Some(self.query.load_hardpoint(self.context.clone(),self.objects.clone(),&self.hardpoint));
        }
        let procedure = hp_unwrap!(self.procedure.as_mut())?;
        let mut context = Context::from_waker(noop_waker_ref());
        match procedure.as_mut().poll(&mut context) {
            Poll::Ready(result) => {
                self.procedure = None;
                self.complete = true;
                self.attach_result(result?)?;
                log_extra!("{} finished loading \"{}\"",self.query.describe(),self.hardpoint);
                Ok(true)
            },
            Poll::Pending => {
                if !self.context.block().take_yielded() {
                    return Err(Error::fatal(&format!("{} suspended while loading \"{}\" without yielding a future or a request",
                        self.query.describe(),self.hardpoint)));
                }
                Ok(true)
            }
        }
    }

    fn attach_result(&self, values: ValueMap) -> Result<(),Error> {
        for (key,value) in values {
            let object = self.objects.get(&key).ok_or_else(|| {
                Error::fatal(&format!("{} returned a value for object \"{}\", which it was not asked to load (it was asked for: {})",
                    self.query.describe(),key,self.objects.keys().cloned().collect::<Vec<_>>().join(", ")))
            })?;
            let definition = object.hardpoint_list().get_hardpoint_definition(&self.hardpoint)?;
            if definition.is_vector() {
                object.merge_hardpoint(&self.hardpoint,value)?;
            } else if !object.has_attached_hardpoint(&self.hardpoint)? {
                object.attach_hardpoint(&self.hardpoint,value)?;
            }
        }
        for (key,object) in self.objects.iter() {
            if !object.has_attached_hardpoint(&self.hardpoint)? {
                return Err(Error::fatal(&format!("{} finished without attaching \"{}\" to object \"{}\"",
                    self.query.describe(),self.hardpoint,key)));
            }
        }
        Ok(())
    }
}
