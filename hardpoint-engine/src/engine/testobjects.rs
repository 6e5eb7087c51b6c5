use std::any::Any;
use std::sync::{ Arc, Mutex };
use hardpoint_scheduler::{ Future, Operation };
use hardpoint_toolkit::{ Error, lock };
use crate::engine::context::{ FutureList, QueryContext };
use crate::engine::query::{ HardpointQuery, QueryProcedure, ValueMap, value_map };
use crate::hardpoint::hardpoint::Hardpoint;
use crate::hardpoint::list::HardpointList;
use crate::hardpoint::object::{ HardpointObject, ObjectMap };
use crate::hardpoint::value::{ HardpointValue, Value };

fn by_string(value: &Value) -> String {
    value.downcast_ref::<String>().cloned().unwrap_or_default()
}

pub(crate) struct TestRef {
    name: String,
    list: HardpointList
}

impl TestRef {
    pub(crate) fn new(name: &str) -> Arc<TestRef> {
        let list = HardpointList::new(vec![
            Hardpoint::scalar("commit"),
            Hardpoint::scalar("message"),
            Hardpoint::vector_by("parents",by_string),
            Hardpoint::scalar("loop-a"),
            Hardpoint::scalar("loop-b"),
            Hardpoint::scalar("orphan"),
            Hardpoint::scalar("problem")
        ]).ok().unwrap();
        Arc::new(TestRef { name: name.to_string(), list })
    }

    pub(crate) fn name(&self) -> &str { &self.name }

    fn string(&self, key: &str) -> String {
        self.get_hardpoint(key).ok().and_then(|v| v.get::<String>()).map(|v| v.to_string()).unwrap_or_default()
    }

    pub(crate) fn commit(&self) -> String { self.string("commit") }
    pub(crate) fn message(&self) -> String { self.string("message") }

    pub(crate) fn parents(&self) -> Vec<String> {
        self.get_hardpoint("parents").ok().unwrap().items_of::<String>().iter().map(|x| x.to_string()).collect()
    }
}

impl HardpointObject for TestRef {
    fn hardpoint_list(&self) -> &HardpointList { &self.list }
    fn as_any(&self) -> &dyn Any { self }
}

/* Shares a hardpoint name with TestRef but no query accepts it */
pub(crate) struct TestTag {
    list: HardpointList
}

impl TestTag {
    pub(crate) fn new() -> Arc<TestTag> {
        Arc::new(TestTag { list: HardpointList::new(vec![Hardpoint::scalar("commit")]).ok().unwrap() })
    }
}

impl HardpointObject for TestTag {
    fn hardpoint_list(&self) -> &HardpointList { &self.list }
    fn as_any(&self) -> &dyn Any { self }
}

pub(crate) fn objects(refs: &[&Arc<TestRef>]) -> ObjectMap {
    refs.iter().map(|r| (r.name.clone(),(*r).clone() as Arc<dyn HardpointObject>)).collect()
}

fn is_ref(object: &dyn HardpointObject) -> bool { object.as_any().is::<TestRef>() }

fn ref_name(object: &Arc<dyn HardpointObject>) -> String {
    object.downcast_ref::<TestRef>().map(|r| r.name.clone()).unwrap_or_default()
}

/* Ready after some unready polls */
struct DelayOperation<T> {
    polls_left: usize,
    value: Option<T>
}

impl<T> Operation for DelayOperation<T> {
    type Output = T;

    fn poll(&mut self) -> Result<Option<T>,Error> {
        if self.polls_left > 0 {
            self.polls_left -= 1;
            return Ok(None);
        }
        Ok(self.value.take())
    }
}

pub(crate) fn delayed<T: 'static>(polls: usize, value: T) -> Future<T> {
    Future::new(DelayOperation { polls_left: polls, value: Some(value) })
}

struct FailOperation;

impl Operation for FailOperation {
    type Output = u32;

    fn poll(&mut self) -> Result<Option<u32>,Error> { Err(Error::operr("remote went away")) }
}

/* Tracks the most operations ever started and not yet finished */
struct RunningOperation {
    running: Arc<Mutex<(usize,usize)>>,
    polls_left: usize,
    value: String
}

impl Operation for RunningOperation {
    type Output = String;

    fn start(&mut self) -> Result<(),Error> {
        let mut running = lock!(self.running);
        running.0 += 1;
        running.1 = running.1.max(running.0);
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<String>,Error> {
        if self.polls_left > 0 {
            self.polls_left -= 1;
            return Ok(None);
        }
        lock!(self.running).0 -= 1;
        Ok(Some(self.value.clone()))
    }
}

pub(crate) struct CommitQuery {
    delay: usize,
    calls: Arc<Mutex<usize>>,
    seen: Arc<Mutex<Vec<String>>>
}

impl CommitQuery {
    pub(crate) fn new(delay: usize) -> Arc<CommitQuery> {
        Arc::new(CommitQuery { delay, calls: Arc::new(Mutex::new(0)), seen: Arc::new(Mutex::new(vec![])) })
    }

    pub(crate) fn calls(&self) -> usize { *lock!(self.calls) }
    pub(crate) fn seen(&self) -> Vec<String> { lock!(self.seen).clone() }
}

impl HardpointQuery for CommitQuery {
    fn get_hardpoints(&self) -> Vec<String> { vec!["commit".to_string()] }
    fn can_load_object(&self, object: &dyn HardpointObject) -> bool { is_ref(object) }

    fn load_hardpoint(&self, context: QueryContext, objects: ObjectMap, _hardpoint: &str) -> QueryProcedure {
        *lock!(self.calls) += 1;
        let seen = self.seen.clone();
        let delay = self.delay;
        Box::pin(async move {
            let mut futures = vec![];
            for (key,object) in objects.iter() {
                lock!(seen).push(key.clone());
                futures.push((key.clone(),delayed(delay,format!("commit-of-{}",ref_name(object)))));
            }
            context.yield_futures(futures.iter().map(|(_,f)| f.clone()).collect()).await?;
            let mut out = ValueMap::new();
            for (key,future) in futures {
                out.insert(key,HardpointValue::scalar(future.resolve()?));
            }
            Ok(out)
        })
    }
}

/* Needs the commit first */
pub(crate) struct MessageQuery;

impl HardpointQuery for MessageQuery {
    fn get_hardpoints(&self) -> Vec<String> { vec!["message".to_string()] }
    fn can_load_object(&self, object: &dyn HardpointObject) -> bool { is_ref(object) }

    fn load_hardpoint(&self, context: QueryContext, objects: ObjectMap, _hardpoint: &str) -> QueryProcedure {
        Box::pin(async move {
            context.yield_requests(&objects,&["commit"]).await?;
            let mut out = ValueMap::new();
            for (key,object) in objects.iter() {
                let commit = object.get_scalar::<String>("commit")?;
                let message = context.yield_future(delayed(1,format!("message for {}",commit))).await?;
                out.insert(key.clone(),HardpointValue::scalar(message));
            }
            Ok(out)
        })
    }
}

pub(crate) struct ParentsQuery(Vec<String>);

impl ParentsQuery {
    pub(crate) fn new(parents: &[&str]) -> Arc<ParentsQuery> {
        Arc::new(ParentsQuery(parents.iter().map(|x| x.to_string()).collect()))
    }
}

impl HardpointQuery for ParentsQuery {
    fn get_hardpoints(&self) -> Vec<String> { vec!["parents".to_string()] }
    fn can_load_object(&self, object: &dyn HardpointObject) -> bool { is_ref(object) }

    fn load_hardpoint(&self, context: QueryContext, objects: ObjectMap, _hardpoint: &str) -> QueryProcedure {
        let parents = self.0.clone();
        Box::pin(async move {
            let parents = context.yield_future(delayed(1,parents)).await?;
            Ok(value_map(&objects,HardpointValue::vector(parents)))
        })
    }
}

/* Loads one hardpoint by first requesting another */
pub(crate) struct LoopQuery {
    from: String,
    to: String
}

impl LoopQuery {
    pub(crate) fn new(from: &str, to: &str) -> Arc<LoopQuery> {
        Arc::new(LoopQuery { from: from.to_string(), to: to.to_string() })
    }
}

impl HardpointQuery for LoopQuery {
    fn get_hardpoints(&self) -> Vec<String> { vec![self.from.clone()] }
    fn can_load_object(&self, object: &dyn HardpointObject) -> bool { is_ref(object) }

    fn load_hardpoint(&self, context: QueryContext, objects: ObjectMap, _hardpoint: &str) -> QueryProcedure {
        let to = self.to.clone();
        Box::pin(async move {
            context.yield_requests(&objects,&[to.as_str()]).await?;
            Ok(context.value_map(&objects,HardpointValue::scalar(to)))
        })
    }
}

/* Waits on a future it was given and attaches its value */
pub(crate) struct KeyedQuery {
    hardpoint: String,
    future: Future<u32>
}

impl KeyedQuery {
    pub(crate) fn new(hardpoint: &str, future: &Future<u32>) -> Arc<KeyedQuery> {
        Arc::new(KeyedQuery { hardpoint: hardpoint.to_string(), future: future.clone() })
    }
}

impl HardpointQuery for KeyedQuery {
    fn get_hardpoints(&self) -> Vec<String> { vec![self.hardpoint.clone()] }
    fn can_load_object(&self, object: &dyn HardpointObject) -> bool { is_ref(object) }

    fn load_hardpoint(&self, context: QueryContext, objects: ObjectMap, _hardpoint: &str) -> QueryProcedure {
        let future = self.future.clone();
        Box::pin(async move {
            let value = context.yield_future(future).await?;
            Ok(value_map(&objects,HardpointValue::scalar(value)))
        })
    }
}

/* Queries for "problem" which go wrong in various ways, and one which doesn't */
pub(crate) enum ProblemQuery {
    Failing,
    Lazy,
    Forgetful,
    WrongKey,
    TwoResults,
    Immediate
}

impl HardpointQuery for ProblemQuery {
    fn get_hardpoints(&self) -> Vec<String> { vec!["problem".to_string()] }
    fn can_load_object(&self, object: &dyn HardpointObject) -> bool { is_ref(object) }

    fn load_hardpoint(&self, context: QueryContext, objects: ObjectMap, _hardpoint: &str) -> QueryProcedure {
        match self {
            ProblemQuery::Failing => Box::pin(async move {
                let value = context.yield_future(Future::new(FailOperation)).await?;
                Ok(value_map(&objects,HardpointValue::scalar(value)))
            }),
            ProblemQuery::Lazy => Box::pin(async move {
                futures::future::pending::<()>().await;
                Ok(value_map(&objects,HardpointValue::scalar(0_u32)))
            }),
            ProblemQuery::Forgetful => Box::pin(async move {
                Ok(ValueMap::new())
            }),
            ProblemQuery::WrongKey => Box::pin(async move {
                let mut out = ValueMap::new();
                out.insert("elsewhere".to_string(),HardpointValue::scalar(0_u32));
                Ok(out)
            }),
            ProblemQuery::TwoResults => Box::pin(async move {
                let list = FutureList::new(vec![delayed(0,1_u32),delayed(0,2_u32)]).send_result(true);
                let value = context.yield_future_list(list).await?;
                Ok(value_map(&objects,HardpointValue::scalar(value.unwrap_or(0))))
            }),
            ProblemQuery::Immediate => Box::pin(async move {
                let value = context.yield_future(Future::immediate(42_u32)).await?;
                Ok(value_map(&objects,HardpointValue::scalar(value)))
            })
        }
    }
}

/* One slow future per object, all yielded together */
pub(crate) struct RunningQuery(pub(crate) Arc<Mutex<(usize,usize)>>);

impl HardpointQuery for RunningQuery {
    fn get_hardpoints(&self) -> Vec<String> { vec!["commit".to_string()] }
    fn can_load_object(&self, object: &dyn HardpointObject) -> bool { is_ref(object) }

    fn load_hardpoint(&self, context: QueryContext, objects: ObjectMap, _hardpoint: &str) -> QueryProcedure {
        let running = self.0.clone();
        Box::pin(async move {
            let futures = objects.iter().map(|(key,object)| {
                (key.clone(),Future::new(RunningOperation {
                    running: running.clone(),
                    polls_left: 2,
                    value: format!("run-{}",ref_name(object))
                }))
            }).collect::<Vec<_>>();
            context.yield_futures(futures.iter().map(|(_,f)| f.clone()).collect()).await?;
            let mut out = ValueMap::new();
            for (key,future) in futures {
                out.insert(key,HardpointValue::scalar(future.resolve()?));
            }
            Ok(out)
        })
    }
}
