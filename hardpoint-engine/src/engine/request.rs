use std::sync::{ Arc, Mutex };
use hardpoint_toolkit::{ Error, lock, log_extra };
use crate::engine::task::HardpointTask;
use crate::hardpoint::hardpoint::Hardpoint;
use crate::hardpoint::object::ObjectMap;

/* A HardpointRequest is one hardpoint wanted on a set of objects. It owns
 * one task per query that is loading it. Objects that some other request
 * was already loading are covered by waiting on that request instead.
 *
 * The request is complete when it has no tasks left and everything it
 * waits on is complete. At that point every object must have the hardpoint
 * attached.
 */

struct RequestState {
    engine: u64,
    hardpoint: String,
    objects: ObjectMap,
    definition: Option<Hardpoint>,
    tasks: Vec<HardpointTask>,
    waits_on: Vec<HardpointRequest>,
    complete: bool
}

#[derive(Clone)]
pub struct HardpointRequest(Arc<Mutex<RequestState>>);

impl HardpointRequest {
    pub(crate) fn new(engine: u64, hardpoint: &str, objects: ObjectMap, definition: Option<Hardpoint>, tasks: Vec<HardpointTask>, waits_on: Vec<HardpointRequest>) -> HardpointRequest {
        let complete = tasks.is_empty() && waits_on.is_empty();
        HardpointRequest(Arc::new(Mutex::new(RequestState {
            engine,
            hardpoint: hardpoint.to_string(),
            objects,
            definition,
            tasks,
            waits_on,
            complete
        })))
    }

    pub(crate) fn engine_identity(&self) -> u64 { lock!(self.0).engine }
    pub(crate) fn same_as(&self, other: &HardpointRequest) -> bool { Arc::ptr_eq(&self.0,&other.0) }

    pub fn get_hardpoint(&self) -> String { lock!(self.0).hardpoint.clone() }
    pub fn get_objects(&self) -> ObjectMap { lock!(self.0).objects.clone() }
    pub fn get_definition(&self) -> Option<Hardpoint> { lock!(self.0).definition.clone() }
    pub fn num_tasks(&self) -> usize { lock!(self.0).tasks.len() }
    pub fn is_complete(&self) -> bool { lock!(self.0).complete }

    pub(crate) fn describe(&self) -> String {
        let state = lock!(self.0);
        let blocked = state.tasks.iter().map(|t| t.describe_block()).collect::<Vec<_>>();
        format!("\"{}\" with {} task(s) [{}] waiting on {} other request(s)",
            state.hardpoint,state.tasks.len(),blocked.join(", "),state.waits_on.len())
    }

    /* Run every task that can make progress. True if anything changed. The
     * tasks are taken out while they run because their procedures may start
     * new requests and look at this one.
     */
    pub(crate) fn update_tasks(&self) -> Result<bool,Error> {
        let (mut tasks,waits_on) = {
            let mut state = lock!(self.0);
            if state.complete { return Ok(false); }
            (std::mem::take(&mut state.tasks),std::mem::take(&mut state.waits_on))
        };
        let mut progress = false;
        let mut error = None;
        for task in tasks.iter_mut() {
            match task.update() {
                Ok(true) => { progress = true; },
                Ok(false) => {},
                Err(e) => { error = Some(e); break; }
            }
        }
        tasks.retain(|t| !t.is_complete());
        let waits_on = waits_on.into_iter().filter(|r| !r.is_complete()).collect::<Vec<_>>();
        let mut state = lock!(self.0);
        state.tasks = tasks;
        state.waits_on = waits_on;
        if let Some(error) = error { return Err(error); }
        if state.tasks.is_empty() && state.waits_on.is_empty() {
            for (key,object) in state.objects.iter() {
                if !object.has_attached_hardpoint(&state.hardpoint)? {
                    return Err(Error::fatal(&format!("every task for hardpoint \"{}\" finished, but none attached it to object \"{}\" (of type {})",
                        state.hardpoint,key,object.describe())));
                }
            }
            log_extra!("request for \"{}\" complete",state.hardpoint);
            state.complete = true;
            progress = true;
        }
        Ok(progress)
    }
}

/* The requests made by one request_hardpoints call */
#[derive(Clone)]
pub struct RequestList(Vec<HardpointRequest>);

impl RequestList {
    pub fn new() -> RequestList { RequestList(vec![]) }

    pub(crate) fn push(&mut self, request: HardpointRequest) { self.0.push(request); }

    pub fn iter(&self) -> impl Iterator<Item=&HardpointRequest> { self.0.iter() }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn is_complete(&self) -> bool { self.0.iter().all(|r| r.is_complete()) }
}

impl Default for RequestList {
    fn default() -> RequestList { RequestList::new() }
}
