use std::sync::{ Arc, Mutex };
use hardpoint_toolkit::{ Error, lock };
use crate::future::operation::Operation;
use crate::integration::integration::WaitHandle;
use crate::integration::testintegration::TestIntegration;

/* Ready on the poll after `polls_left` unready polls. Counts every poll. */
pub(crate) struct CountdownOperation<T> {
    polls_left: usize,
    value: Option<T>,
    polls: Arc<Mutex<usize>>
}

impl<T> CountdownOperation<T> {
    pub(crate) fn new(polls_left: usize, value: T, polls: &Arc<Mutex<usize>>) -> CountdownOperation<T> {
        CountdownOperation { polls_left, value: Some(value), polls: polls.clone() }
    }
}

impl<T> Operation for CountdownOperation<T> {
    type Output = T;

    fn poll(&mut self) -> Result<Option<T>,Error> {
        *lock!(self.polls) += 1;
        if self.polls_left > 0 {
            self.polls_left -= 1;
            return Ok(None);
        }
        Ok(self.value.take())
    }
}

pub(crate) struct FailingOperation {
    message: String,
    on_start: bool
}

impl FailingOperation {
    pub(crate) fn new(message: &str, on_start: bool) -> FailingOperation {
        FailingOperation { message: message.to_string(), on_start }
    }
}

impl Operation for FailingOperation {
    type Output = u32;

    fn start(&mut self) -> Result<(),Error> {
        if self.on_start { Err(Error::operr(&self.message)) } else { Ok(()) }
    }

    fn poll(&mut self) -> Result<Option<u32>,Error> { Err(Error::operr(&self.message)) }
}

/* Ready once the test clock reaches a given time. */
pub(crate) struct ClockOperation {
    integration: TestIntegration,
    ready_at: f64,
    value: u32,
    handle: Option<WaitHandle>
}

impl ClockOperation {
    pub(crate) fn new(integration: &TestIntegration, ready_at: f64, value: u32) -> ClockOperation {
        ClockOperation { integration: integration.clone(), ready_at, value, handle: None }
    }

    pub(crate) fn with_handle(mut self, handle: WaitHandle) -> ClockOperation {
        self.handle = Some(handle);
        self
    }
}

impl Operation for ClockOperation {
    type Output = u32;

    fn poll(&mut self) -> Result<Option<u32>,Error> {
        use crate::integration::integration::Integration;
        if self.integration.current_time() >= self.ready_at { Ok(Some(self.value)) } else { Ok(None) }
    }

    fn read_handles(&self) -> Vec<WaitHandle> { self.handle.iter().cloned().collect() }
    fn default_wait(&self) -> f64 { 0.25 }
}

/* Records how many operations are running at once. */
#[derive(Clone)]
pub(crate) struct RunningCounter(Arc<Mutex<(usize,usize)>>);

impl RunningCounter {
    pub(crate) fn new() -> RunningCounter { RunningCounter(Arc::new(Mutex::new((0,0)))) }
    pub(crate) fn running(&self) -> usize { lock!(self.0).0 }
    pub(crate) fn max_running(&self) -> usize { lock!(self.0).1 }

    fn enter(&self) {
        let mut counts = lock!(self.0);
        counts.0 += 1;
        counts.1 = counts.1.max(counts.0);
    }

    fn leave(&self) { lock!(self.0).0 -= 1; }
}

pub(crate) struct CountedOperation {
    counter: RunningCounter,
    polls_left: usize,
    value: u32
}

impl CountedOperation {
    pub(crate) fn new(counter: &RunningCounter, polls_left: usize, value: u32) -> CountedOperation {
        CountedOperation { counter: counter.clone(), polls_left, value }
    }
}

impl Operation for CountedOperation {
    type Output = u32;

    fn start(&mut self) -> Result<(),Error> {
        self.counter.enter();
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<u32>,Error> {
        if self.polls_left > 0 {
            self.polls_left -= 1;
            return Ok(None);
        }
        self.counter.leave();
        Ok(Some(self.value))
    }
}
