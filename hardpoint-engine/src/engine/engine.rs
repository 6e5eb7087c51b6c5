use std::sync::Arc;
use hardpoint_scheduler::{ FuturePool, Resolvable, SchedulerConfig, Step };
use hardpoint_toolkit::{ Error, identitynumber, log_extra, warn };
use crate::engine::link::EngineLink;
use crate::engine::query::HardpointQuery;
use crate::engine::request::RequestList;
use crate::hardpoint::object::ObjectMap;

identitynumber!(ENGINE_IDENTITY);

pub const DEFAULT_CONCURRENCY_LIMIT : usize = 32;

/* The HardpointEngine loads hardpoints onto objects using registered
 * queries. A request creates tasks; waiting runs the tasks until each is
 * blocked, then runs one step of the futures they are blocked on, and
 * repeats until no request is left.
 */
pub struct HardpointEngine {
    link: EngineLink,
    pool: FuturePool<Arc<dyn Resolvable>>
}

impl HardpointEngine {
    pub fn new() -> HardpointEngine {
        HardpointEngine::with_config(&SchedulerConfig::new().with_limit(Some(DEFAULT_CONCURRENCY_LIMIT)))
    }

    pub fn with_config(config: &SchedulerConfig) -> HardpointEngine {
        HardpointEngine {
            link: EngineLink::new(ENGINE_IDENTITY.next()),
            pool: FuturePool::with_config(config)
        }
    }

    pub fn identity(&self) -> u64 { self.link.identity() }

    pub fn set_queries(&mut self, queries: Vec<Arc<dyn HardpointQuery>>) {
        self.link.clear_queries();
        for query in queries {
            self.link.add_query(query);
        }
    }

    pub fn add_query(&mut self, query: Arc<dyn HardpointQuery>) { self.link.add_query(query); }

    /* Fails without starting anything if any hardpoint is unknown to an
     * object or no query can load it.
     */
    pub fn request_hardpoints(&mut self, objects: &ObjectMap, hardpoints: &[&str]) -> Result<RequestList,Error> {
        self.link.request_hardpoints(objects,hardpoints)
    }

    pub fn load_hardpoints(&mut self, objects: &ObjectMap, hardpoints: &[&str]) -> Result<(),Error> {
        let requests = self.request_hardpoints(objects,hardpoints)?;
        self.wait_for_requests(&requests)
    }

    pub fn pending_requests(&self) -> usize { self.link.get_requests().len() }

    /* Runs until every request on this engine, not just those passed, is
     * complete.
     */
    pub fn wait_for_requests(&mut self, requests: &RequestList) -> Result<(),Error> {
        let identity = self.identity();
        for request in requests.iter() {
            if request.engine_identity() != identity {
                return Err(Error::config(&format!("request for \"{}\" belongs to a different engine",request.get_hardpoint())));
            }
        }
        loop {
            let mut progress = false;
            for request in self.link.get_requests() {
                if request.update_tasks()? {
                    progress = true;
                }
            }
            if progress { continue; }
            self.link.remove_complete();
            if !self.link.has_requests() { return Ok(()); }
            if !self.update_futures()? {
                let message = format!("hardpoint engine is stalled: no request can make progress and no futures are running. Pending: {}",
                    self.link.describe_pending());
                warn!("{}",message);
                return Err(Error::stall(&message));
            }
        }
    }

    /* One step of the futures tasks are blocked on. False if there are none.
     * A future yielded by several tasks is run once. A different future
     * reusing a live key is an error.
     */
    fn update_futures(&mut self) -> Result<bool,Error> {
        for future in self.link.take_futures() {
            if future.can_resolve() { continue; }
            let running = self.pool.get_future(&future.key()).map(|f| f.identity() == future.identity());
            if running != Some(true) {
                self.pool.add_future(future)?;
            }
        }
        if !self.pool.has_futures() { return Ok(false); }
        match self.pool.resolve()? {
            Some(Step::Resolved(key,_)) => {
                log_extra!("future {} resolved",key);
                Ok(true)
            },
            Some(Step::Tick) => Ok(true),
            None => Ok(self.pool.has_futures())
        }
    }
}

impl Default for HardpointEngine {
    fn default() -> HardpointEngine { HardpointEngine::new() }
}

#[cfg(test)]
mod test {
    use std::sync::{ Arc, Mutex };
    use hardpoint_toolkit::{ ErrorType, lock };
    use crate::engine::testobjects::*;
    use crate::hardpoint::object::HardpointObject;
    use crate::hardpoint::value::HardpointValue;
    use super::*;

    fn engine(queries: &[Arc<dyn HardpointQuery>]) -> HardpointEngine {
        let mut engine = HardpointEngine::new();
        engine.set_queries(queries.to_vec());
        engine
    }

    #[test]
    pub fn test_load_scalar() {
        let commits = CommitQuery::new(2);
        let mut engine = engine(&[commits.clone()]);
        let a = TestRef::new("a");
        let b = TestRef::new("b");
        let objects = objects(&[&a,&b]);
        let requests = engine.request_hardpoints(&objects,&["commit"]).ok().unwrap();
        assert_eq!(1,requests.len());
        assert_eq!(1,requests.iter().next().unwrap().num_tasks());
        engine.wait_for_requests(&requests).ok().unwrap();
        assert!(requests.is_complete());
        assert_eq!("commit-of-a",a.commit());
        assert_eq!("commit-of-b",b.commit());
        assert_eq!(1,commits.calls());
        assert_eq!(0,engine.pending_requests());
    }

    #[test]
    pub fn test_already_attached() {
        let commits = CommitQuery::new(0);
        let mut engine = engine(&[commits.clone()]);
        let a = TestRef::new("a");
        a.attach_hardpoint("commit",HardpointValue::scalar("preset".to_string())).ok().unwrap();
        let requests = engine.request_hardpoints(&objects(&[&a]),&["commit"]).ok().unwrap();
        let request = requests.iter().next().unwrap();
        assert_eq!(0,request.num_tasks());
        assert!(request.is_complete());
        engine.wait_for_requests(&requests).ok().unwrap();
        assert_eq!("preset",a.commit());
        assert_eq!(0,commits.calls());
    }

    #[test]
    pub fn test_partly_attached() {
        let commits = CommitQuery::new(0);
        let mut engine = engine(&[commits.clone()]);
        let a = TestRef::new("a");
        let b = TestRef::new("b");
        a.attach_hardpoint("commit",HardpointValue::scalar("preset".to_string())).ok().unwrap();
        engine.load_hardpoints(&objects(&[&a,&b]),&["commit"]).ok().unwrap();
        assert_eq!("preset",a.commit());
        assert_eq!("commit-of-b",b.commit());
        assert_eq!(vec!["b".to_string()],commits.seen());
    }

    #[test]
    pub fn test_nested_request() {
        let commits = CommitQuery::new(1);
        let mut engine = engine(&[commits.clone(),Arc::new(MessageQuery)]);
        let a = TestRef::new("a");
        engine.load_hardpoints(&objects(&[&a]),&["message"]).ok().unwrap();
        assert_eq!("message for commit-of-a",a.message());
        assert_eq!("commit-of-a",a.commit());
    }

    #[test]
    pub fn test_shared_in_flight() {
        let commits = CommitQuery::new(3);
        let mut engine = engine(&[commits.clone(),Arc::new(MessageQuery)]);
        let a = TestRef::new("a");
        let b = TestRef::new("b");
        engine.load_hardpoints(&objects(&[&a,&b]),&["message","commit"]).ok().unwrap();
        assert_eq!("message for commit-of-b",b.message());
        assert_eq!(1,commits.calls());
        engine.load_hardpoints(&objects(&[&a,&b]),&["message","commit"]).ok().unwrap();
        assert_eq!(1,commits.calls());
    }

    #[test]
    pub fn test_vector_merge() {
        let mut engine = engine(&[
            ParentsQuery::new(&["p1","p2"]),
            ParentsQuery::new(&["p2","p3"])
        ]);
        let a = TestRef::new("a");
        let requests = engine.request_hardpoints(&objects(&[&a]),&["parents"]).ok().unwrap();
        assert_eq!(2,requests.iter().next().unwrap().num_tasks());
        assert!(a.has_attached_hardpoint("parents").ok().unwrap());
        engine.wait_for_requests(&requests).ok().unwrap();
        assert_eq!(vec!["p1","p2","p3"],a.parents());
    }

    #[test]
    pub fn test_unknown_hardpoint() {
        let mut engine = engine(&[CommitQuery::new(0)]);
        let e = engine.request_hardpoints(&objects(&[&TestRef::new("a")]),&["colour"]).err().unwrap();
        assert_eq!(ErrorType::ConfigError,e.error_type);
        assert!(e.message.contains("\"commit\""));
    }

    #[test]
    pub fn test_unsatisfiable() {
        let commits = CommitQuery::new(0);
        let mut engine = engine(&[commits.clone()]);
        let a = TestRef::new("a");
        let e = engine.request_hardpoints(&objects(&[&a]),&["commit","orphan"]).err().unwrap();
        assert_eq!(ErrorType::ConfigError,e.error_type);
        assert!(e.message.contains("orphan"));
        assert_eq!(0,engine.pending_requests());
        assert!(!a.has_attached_hardpoint("commit").ok().unwrap());
        assert_eq!(0,commits.calls());
    }

    #[test]
    pub fn test_query_rejects_object() {
        let mut engine = engine(&[CommitQuery::new(0)]);
        let tag = TestTag::new();
        let mut objects = ObjectMap::new();
        objects.insert("tag".to_string(),tag);
        let e = engine.request_hardpoints(&objects,&["commit"]).err().unwrap();
        assert_eq!(ErrorType::ConfigError,e.error_type);
        assert!(e.message.contains("TestTag"));
    }

    #[test]
    pub fn test_cycle_stalls() {
        let mut engine = engine(&[LoopQuery::new("loop-a","loop-b"),LoopQuery::new("loop-b","loop-a")]);
        let e = engine.load_hardpoints(&objects(&[&TestRef::new("a")]),&["loop-a"]).err().unwrap();
        assert!(e.is_stall());
    }

    #[test]
    pub fn test_self_cycle_stalls() {
        let mut engine = engine(&[LoopQuery::new("loop-a","loop-a")]);
        let e = engine.load_hardpoints(&objects(&[&TestRef::new("a")]),&["loop-a"]).err().unwrap();
        assert!(e.is_stall());
    }

    #[test]
    pub fn test_future_error() {
        let mut engine = engine(&[Arc::new(ProblemQuery::Failing)]);
        let e = engine.load_hardpoints(&objects(&[&TestRef::new("a")]),&["problem"]).err().unwrap();
        assert_eq!(ErrorType::OperationError,e.error_type);
        assert_eq!("remote went away",e.message);
    }

    #[test]
    pub fn test_suspend_without_yield() {
        let mut engine = engine(&[Arc::new(ProblemQuery::Lazy)]);
        let e = engine.load_hardpoints(&objects(&[&TestRef::new("a")]),&["problem"]).err().unwrap();
        assert!(e.is_fatal());
    }

    #[test]
    pub fn test_missing_attach() {
        let mut engine = engine(&[Arc::new(ProblemQuery::Forgetful)]);
        let e = engine.load_hardpoints(&objects(&[&TestRef::new("a")]),&["problem"]).err().unwrap();
        assert!(e.is_fatal());
    }

    #[test]
    pub fn test_bad_object_key() {
        let mut engine = engine(&[Arc::new(ProblemQuery::WrongKey)]);
        let e = engine.load_hardpoints(&objects(&[&TestRef::new("a")]),&["problem"]).err().unwrap();
        assert!(e.is_fatal());
        assert!(e.message.contains("elsewhere"));
    }

    #[test]
    pub fn test_bad_future_list() {
        let mut engine = engine(&[Arc::new(ProblemQuery::TwoResults)]);
        let e = engine.load_hardpoints(&objects(&[&TestRef::new("a")]),&["problem"]).err().unwrap();
        assert!(e.is_fatal());
    }

    #[test]
    pub fn test_foreign_request() {
        let mut one = engine(&[CommitQuery::new(0)]);
        let mut two = engine(&[CommitQuery::new(0)]);
        assert_ne!(one.identity(),two.identity());
        let requests = one.request_hardpoints(&objects(&[&TestRef::new("a")]),&["commit"]).ok().unwrap();
        let e = two.wait_for_requests(&requests).err().unwrap();
        assert_eq!(ErrorType::ConfigError,e.error_type);
        one.wait_for_requests(&requests).ok().unwrap();
    }

    #[test]
    pub fn test_concurrency_limit() {
        let running = Arc::new(Mutex::new((0,0)));
        let mut engine = HardpointEngine::with_config(&SchedulerConfig::new().with_limit(Some(2)));
        engine.add_query(Arc::new(RunningQuery(running.clone())));
        let refs = (0..6).map(|i| TestRef::new(&format!("r{}",i))).collect::<Vec<_>>();
        let objects = objects(&refs.iter().collect::<Vec<_>>());
        engine.load_hardpoints(&objects,&["commit"]).ok().unwrap();
        assert_eq!(2,lock!(running).1);
        for r in &refs {
            assert_eq!(format!("run-{}",r.name()),r.commit());
        }
    }

    #[test]
    pub fn test_same_future_from_two_tasks() {
        let shared = delayed(2,7_u32);
        shared.set_key("shared").ok().unwrap();
        let mut engine = engine(&[
            KeyedQuery::new("commit",&shared),
            KeyedQuery::new("message",&shared)
        ]);
        let a = TestRef::new("a");
        engine.load_hardpoints(&objects(&[&a]),&["commit","message"]).ok().unwrap();
        for hardpoint in &["commit","message"] {
            assert_eq!(7,*a.get_hardpoint(hardpoint).ok().unwrap().get::<u32>().unwrap());
        }
    }

    #[test]
    pub fn test_different_futures_same_key() {
        let first = delayed(2,7_u32);
        first.set_key("shared").ok().unwrap();
        let second = delayed(2,7_u32);
        second.set_key("shared").ok().unwrap();
        let mut engine = engine(&[
            KeyedQuery::new("commit",&first),
            KeyedQuery::new("message",&second)
        ]);
        let e = engine.load_hardpoints(&objects(&[&TestRef::new("a")]),&["commit","message"]).err().unwrap();
        assert_eq!(ErrorType::ConfigError,e.error_type);
        assert!(e.message.contains("shared"));
    }

    #[test]
    pub fn test_yield_future_sends_result() {
        let mut engine = engine(&[Arc::new(ProblemQuery::Immediate)]);
        let a = TestRef::new("a");
        engine.load_hardpoints(&objects(&[&a]),&["problem"]).ok().unwrap();
        let value = a.hardpoint_list().get_hardpoint("problem").ok().unwrap();
        assert_eq!(42,*value.get::<u32>().unwrap());
    }
}
