use std::sync::{ Arc, Mutex };
use hashbrown::HashMap;
use hardpoint_scheduler::Resolvable;
use hardpoint_toolkit::{ Error, lock, log_extra };
use crate::engine::context::{ QueryContext, TaskBlock };
use crate::engine::query::HardpointQuery;
use crate::engine::request::{ HardpointRequest, RequestList };
use crate::engine::task::HardpointTask;
use crate::hardpoint::hardpoint::Hardpoint;
use crate::hardpoint::object::ObjectMap;
use crate::hardpoint::value::HardpointValue;

/* EngineLink is the part of the engine shared with query contexts, so that
 * procedures can start nested requests and hand over futures while the
 * engine is running them.
 *
 * Nothing here polls procedures, so the lock is never held while user code
 * runs (apart from can_load_object).
 */

struct EngineState {
    identity: u64,
    queries: Vec<Arc<dyn HardpointQuery>>,
    query_map: HashMap<String,Vec<usize>>,
    requests: Vec<HardpointRequest>,
    in_flight: HashMap<(u64,String),HardpointRequest>,
    futures: Vec<Arc<dyn Resolvable>>
}

/* One hardpoint of a request_hardpoints call, checked but not yet started */
struct RequestPlan {
    hardpoint: String,
    objects: ObjectMap,
    definition: Option<Hardpoint>,
    loads: Vec<(usize,ObjectMap)>,
    waits_on: Vec<HardpointRequest>
}

impl EngineState {
    fn in_flight(&self, identity: u64, hardpoint: &str) -> Option<HardpointRequest> {
        self.in_flight.get(&(identity,hardpoint.to_string())).filter(|r| !r.is_complete()).cloned()
    }

    fn plan(&self, objects: &ObjectMap, hardpoint: &str) -> Result<RequestPlan,Error> {
        let no_queries = vec![];
        let candidates = self.query_map.get(hardpoint).unwrap_or(&no_queries);
        let mut plan = RequestPlan {
            hardpoint: hardpoint.to_string(),
            objects: objects.clone(),
            definition: None,
            loads: vec![],
            waits_on: vec![]
        };
        for (key,object) in objects.iter() {
            if !object.has_hardpoint(hardpoint) {
                return Err(Error::config(&format!("object \"{}\" (of type {}) has no hardpoint \"{}\"; its hardpoints are: {}",
                    key,object.describe(),hardpoint,object.hardpoint_list().get_hardpoint_list_for_display())));
            }
            let identity = object.hardpoint_list().identity();
            if let Some(request) = self.in_flight(identity,hardpoint) {
                if !plan.waits_on.iter().any(|r| r.same_as(&request)) {
                    plan.waits_on.push(request);
                }
                continue;
            }
            if object.has_attached_hardpoint(hardpoint)? { continue; }
            let mut found = false;
            for index in candidates {
                if self.queries[*index].can_load_object(object.as_ref()) {
                    found = true;
                    match plan.loads.iter_mut().find(|(q,_)| q == index) {
                        Some((_,group)) => { group.insert(key.clone(),object.clone()); },
                        None => {
                            let mut group = ObjectMap::new();
                            group.insert(key.clone(),object.clone());
                            plan.loads.push((*index,group));
                        }
                    }
                }
            }
            if !found {
                return Err(Error::config(&format!("no query can load hardpoint \"{}\" for object \"{}\" (of type {})",
                    hardpoint,key,object.describe())));
            }
            if plan.definition.is_none() {
                plan.definition = Some(object.hardpoint_list().get_hardpoint_definition(hardpoint)?.clone());
            }
        }
        plan.loads.sort_by_key(|(index,_)| *index);
        Ok(plan)
    }
}

#[derive(Clone)]
pub(crate) struct EngineLink(Arc<Mutex<EngineState>>);

impl EngineLink {
    pub(crate) fn new(identity: u64) -> EngineLink {
        EngineLink(Arc::new(Mutex::new(EngineState {
            identity,
            queries: vec![],
            query_map: HashMap::new(),
            requests: vec![],
            in_flight: HashMap::new(),
            futures: vec![]
        })))
    }

    pub(crate) fn identity(&self) -> u64 { lock!(self.0).identity }

    pub(crate) fn add_query(&self, query: Arc<dyn HardpointQuery>) {
        let mut state = lock!(self.0);
        let index = state.queries.len();
        for hardpoint in query.get_hardpoints() {
            let indexes = state.query_map.entry(hardpoint).or_insert_with(Vec::new);
            if !indexes.contains(&index) { indexes.push(index); }
        }
        state.queries.push(query);
    }

    pub(crate) fn clear_queries(&self) {
        let mut state = lock!(self.0);
        state.queries.clear();
        state.query_map.clear();
    }

    pub(crate) fn request_hardpoints(&self, objects: &ObjectMap, hardpoints: &[&str]) -> Result<RequestList,Error> {
        let mut state = lock!(self.0);
        /* check everything before starting anything */
        let mut plans = vec![];
        for (i,hardpoint) in hardpoints.iter().enumerate() {
            if !hardpoints[..i].contains(hardpoint) {
                plans.push(state.plan(objects,hardpoint)?);
            }
        }
        let mut out = RequestList::new();
        for plan in plans {
            let mut tasks = vec![];
            for (index,group) in &plan.loads {
                for (key,object) in group.iter() {
                    let definition = object.hardpoint_list().get_hardpoint_definition(&plan.hardpoint)?;
                    if definition.is_vector() && !object.has_attached_hardpoint(&plan.hardpoint)? {
                        object.attach_hardpoint(&plan.hardpoint,HardpointValue::empty_vector())?;
                    }
                    log_extra!("loading \"{}\" for \"{}\" with {}",plan.hardpoint,key,state.queries[*index].describe());
                }
                let context = QueryContext::new(self,&TaskBlock::new());
                tasks.push(HardpointTask::new(&state.queries[*index],group.clone(),&plan.hardpoint,context));
            }
            let request = HardpointRequest::new(state.identity,&plan.hardpoint,plan.objects,plan.definition,tasks,plan.waits_on);
            for (_,group) in &plan.loads {
                for object in group.values() {
                    let key = (object.hardpoint_list().identity(),plan.hardpoint.clone());
                    state.in_flight.insert(key,request.clone());
                }
            }
            if !request.is_complete() {
                state.requests.push(request.clone());
            }
            out.push(request);
        }
        Ok(out)
    }

    pub(crate) fn add_futures(&self, futures: &[Arc<dyn Resolvable>]) {
        lock!(self.0).futures.extend(futures.iter().cloned());
    }

    pub(crate) fn take_futures(&self) -> Vec<Arc<dyn Resolvable>> {
        std::mem::take(&mut lock!(self.0).futures)
    }

    pub(crate) fn get_requests(&self) -> Vec<HardpointRequest> { lock!(self.0).requests.clone() }
    pub(crate) fn has_requests(&self) -> bool { !lock!(self.0).requests.is_empty() }

    pub(crate) fn remove_complete(&self) {
        let mut state = lock!(self.0);
        state.requests.retain(|r| !r.is_complete());
        state.in_flight.retain(|_,r| !r.is_complete());
    }

    pub(crate) fn describe_pending(&self) -> String {
        let requests = self.get_requests();
        requests.iter().map(|r| r.describe()).collect::<Vec<_>>().join("; ")
    }
}
