use std::future::Future as StdFuture;
use std::pin::Pin;
use std::sync::{ Arc, Mutex };
use std::task::{ Context, Poll };
use hardpoint_scheduler::{ Future, Resolvable };
use hardpoint_toolkit::{ Error, hp_unwrap, lock };
use crate::engine::link::EngineLink;
use crate::engine::request::{ HardpointRequest, RequestList };
use crate::hardpoint::object::ObjectMap;
use crate::hardpoint::value::HardpointValue;
use crate::engine::query::{ ValueMap, value_map };

/* A list of futures yielded together. If send_result is set the list must
 * hold exactly one future, and its result is handed back to the procedure.
 */
pub struct FutureList<T> {
    futures: Vec<Future<T>>,
    send_result: bool
}

impl<T: Clone + 'static> FutureList<T> {
    pub fn new(futures: Vec<Future<T>>) -> FutureList<T> { FutureList { futures, send_result: false } }
    pub fn single(future: Future<T>) -> FutureList<T> { FutureList::new(vec![future]) }

    pub fn send_result(mut self, send_result: bool) -> FutureList<T> {
        self.send_result = send_result;
        self
    }

    pub fn get_futures(&self) -> &[Future<T>] { &self.futures }
    pub fn get_send_result(&self) -> bool { self.send_result }
}

/* What one task is waiting on. Shared between the task and the context its
 * procedure holds.
 */
struct TaskBlockState {
    futures: Vec<Arc<dyn Resolvable>>,
    requests: Vec<HardpointRequest>,
    yielded: bool
}

#[derive(Clone)]
pub(crate) struct TaskBlock(Arc<Mutex<TaskBlockState>>);

impl TaskBlock {
    pub(crate) fn new() -> TaskBlock {
        TaskBlock(Arc::new(Mutex::new(TaskBlockState {
            futures: vec![],
            requests: vec![],
            yielded: false
        })))
    }

    fn block_on_futures(&self, futures: &[Arc<dyn Resolvable>]) {
        let mut state = lock!(self.0);
        state.futures.extend(futures.iter().cloned());
        state.yielded = true;
    }

    fn block_on_requests(&self, requests: &RequestList) {
        let mut state = lock!(self.0);
        state.requests.extend(requests.iter().cloned());
        state.yielded = true;
    }

    pub(crate) fn is_blocked(&self) -> bool {
        let requests = {
            let mut state = lock!(self.0);
            state.futures.retain(|f| !f.can_resolve());
            std::mem::take(&mut state.requests)
        };
        let requests = requests.into_iter().filter(|r| !r.is_complete()).collect::<Vec<_>>();
        let mut state = lock!(self.0);
        state.requests = requests;
        !state.futures.is_empty() || !state.requests.is_empty()
    }

    /* Did the procedure yield since we last asked? */
    pub(crate) fn take_yielded(&self) -> bool {
        std::mem::replace(&mut lock!(self.0).yielded,false)
    }

    pub(crate) fn blocking_requests(&self) -> Vec<String> {
        lock!(self.0).requests.iter().map(|r| r.get_hardpoint()).collect()
    }

    pub(crate) fn blocking_futures(&self) -> usize { lock!(self.0).futures.len() }
}

enum Wait {
    Futures(Vec<Arc<dyn Resolvable>>),
    Requests(RequestList)
}

/* Pending until everything it registered is done. The first poll registers
 * and always suspends, handing control back to the engine.
 */
struct Suspend {
    link: EngineLink,
    block: TaskBlock,
    wait: Option<Wait>
}

impl StdFuture for Suspend {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if let Some(wait) = self.wait.take() {
            match wait {
                Wait::Futures(futures) => {
                    self.link.add_futures(&futures);
                    self.block.block_on_futures(&futures);
                },
                Wait::Requests(requests) => {
                    self.block.block_on_requests(&requests);
                }
            }
            return Poll::Pending;
        }
        if self.block.is_blocked() { Poll::Pending } else { Poll::Ready(()) }
    }
}

/* The handle a query procedure uses to talk to the engine. */
#[derive(Clone)]
pub struct QueryContext {
    link: EngineLink,
    block: TaskBlock
}

impl QueryContext {
    pub(crate) fn new(link: &EngineLink, block: &TaskBlock) -> QueryContext {
        QueryContext { link: link.clone(), block: block.clone() }
    }

    pub(crate) fn block(&self) -> &TaskBlock { &self.block }

    fn suspend(&self, wait: Wait) -> Suspend {
        Suspend { link: self.link.clone(), block: self.block.clone(), wait: Some(wait) }
    }

    pub async fn yield_future<T: Clone + 'static>(&self, future: Future<T>) -> Result<T,Error> {
        let result = self.yield_future_list(FutureList::single(future).send_result(true)).await?;
        hp_unwrap!(result)
    }

    /* Wait for all of them. Results (or errors) are left on the futures. */
    pub async fn yield_futures<T: Clone + 'static>(&self, futures: Vec<Future<T>>) -> Result<(),Error> {
        self.yield_future_list(FutureList::new(futures)).await.map(|_| ())
    }

    pub async fn yield_future_list<T: Clone + 'static>(&self, list: FutureList<T>) -> Result<Option<T>,Error> {
        if list.send_result && list.futures.len() != 1 {
            return Err(Error::fatal(&format!("future list is marked to send its result to the query, but holds {} futures rather than exactly one",list.futures.len())));
        }
        let waits = list.futures.iter().map(|f| Arc::new(f.clone()) as Arc<dyn Resolvable>).collect();
        self.suspend(Wait::Futures(waits)).await;
        if list.send_result {
            Ok(Some(list.futures[0].resolve()?))
        } else {
            Ok(None)
        }
    }

    /* Start requests without waiting for them */
    pub fn request_hardpoints(&self, objects: &ObjectMap, hardpoints: &[&str]) -> Result<RequestList,Error> {
        self.link.request_hardpoints(objects,hardpoints)
    }

    pub async fn yield_requests(&self, objects: &ObjectMap, hardpoints: &[&str]) -> Result<RequestList,Error> {
        let requests = self.request_hardpoints(objects,hardpoints)?;
        self.yield_request_list(&requests).await;
        Ok(requests)
    }

    pub async fn yield_request_list(&self, requests: &RequestList) {
        self.suspend(Wait::Requests(requests.clone())).await;
    }

    pub fn value_map(&self, objects: &ObjectMap, value: HardpointValue) -> ValueMap { value_map(objects,value) }
}
