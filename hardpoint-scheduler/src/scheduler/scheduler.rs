use std::collections::VecDeque;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use hashbrown::{ HashMap, HashSet };
use hardpoint_toolkit::{ Error, hp_unwrap, log_extra };
use crate::future::future::Resolvable;
use crate::integration::integration::Integration;
use crate::integration::system::SystemIntegration;
use crate::scheduler::config::SchedulerConfig;

/* The Scheduler runs a set of keyed futures and hands them back in the order
 * they complete.
 *
 * Every live key is in exactly one of three places:
 *   hold -- waiting for prerequisite keys to be handed back;
 *   wait -- eligible, but over the concurrency limit;
 *   work -- started and being polled, in the order they were started.
 *
 * A future is released by the scheduler when it is handed back. Futures can
 * be added at any time, including between two advances.
 */

pub enum Step<K,F> {
    Resolved(K,F),
    Tick
}

impl<K,F> Step<K,F> {
    pub fn resolved(self) -> Option<(K,F)> {
        match self {
            Step::Resolved(key,future) => Some((key,future)),
            Step::Tick => None
        }
    }
}

/* Polling with nothing to wait on sleeps this long between passes. */
const IDLE_SLEEP : f64 = 0.001;
const MAX_WAIT : f64 = 1.;

pub struct Scheduler<K,F> where K: Clone+Eq+Hash+Debug, F: Resolvable {
    futures: HashMap<K,F>,
    prerequisites: HashMap<K,Vec<K>>,
    yielded: HashSet<K>,
    hold: Vec<K>,
    wait: VecDeque<K>,
    work: Vec<K>,
    config: SchedulerConfig,
    integration: Arc<dyn Integration>,
    failed: Option<Error>
}

impl<K,F> Scheduler<K,F> where K: Clone+Eq+Hash+Debug, F: Resolvable {
    pub fn new() -> Scheduler<K,F> {
        Scheduler::with_config(&SchedulerConfig::new())
    }

    pub fn with_config(config: &SchedulerConfig) -> Scheduler<K,F> {
        Scheduler::with_integration(config,Arc::new(SystemIntegration::new()))
    }

    pub fn with_integration(config: &SchedulerConfig, integration: Arc<dyn Integration>) -> Scheduler<K,F> {
        Scheduler {
            futures: HashMap::new(),
            prerequisites: HashMap::new(),
            yielded: HashSet::new(),
            hold: vec![],
            wait: VecDeque::new(),
            work: vec![],
            config: config.clone(),
            integration,
            failed: None
        }
    }

    pub fn from_futures<I>(futures: I) -> Result<Scheduler<K,F>,Error> where I: IntoIterator<Item=(K,F)> {
        let mut out = Scheduler::new();
        for (key,future) in futures {
            out.add_future(key,future)?;
        }
        Ok(out)
    }

    pub fn set_concurrency_limit(&mut self, limit: Option<usize>) { self.config.set_limit(limit); }
    pub fn set_poll_interval(&mut self, interval: Option<f64>) { self.config.set_poll_interval(interval); }
    pub fn config(&self) -> &SchedulerConfig { &self.config }

    pub fn add_future(&mut self, key: K, future: F) -> Result<(),Error> {
        self.add_future_after(key,future,&[])
    }

    /* The future won't start until every key in `after` has been handed
     * back by this scheduler. A stalled scheduler accepts nothing more.
     */
    pub fn add_future_after(&mut self, key: K, future: F, after: &[K]) -> Result<(),Error> {
        if let Some(e) = &self.failed { return Err(e.clone()); }
        if self.futures.contains_key(&key) {
            return Err(Error::config(&format!("scheduler already has a future with key {:?}; keys must be unique",key)));
        }
        self.futures.insert(key.clone(),future);
        let missing = after.iter().filter(|k| !self.yielded.contains(*k)).cloned().collect::<Vec<_>>();
        if missing.is_empty() {
            self.wait.push_back(key);
        } else {
            self.prerequisites.insert(key.clone(),missing);
            self.hold.push(key);
        }
        Ok(())
    }

    pub fn len(&self) -> usize { self.futures.len() }
    pub fn is_empty(&self) -> bool { self.futures.is_empty() }
    pub fn working_len(&self) -> usize { self.work.len() }
    pub fn waiting_len(&self) -> usize { self.wait.len() }
    pub fn held_len(&self) -> usize { self.hold.len() }

    fn prerequisites_done(&self, key: &K) -> bool {
        match self.prerequisites.get(key) {
            Some(after) => after.iter().all(|k| self.yielded.contains(k)),
            None => true
        }
    }

    fn promote(&mut self) {
        let hold = std::mem::take(&mut self.hold);
        for key in hold {
            if self.prerequisites_done(&key) {
                self.prerequisites.remove(&key);
                self.wait.push_back(key);
            } else {
                self.hold.push(key);
            }
        }
        let room = match self.config.get_limit() {
            Some(limit) => limit.saturating_sub(self.work.len()),
            None => self.wait.len()
        };
        for _ in 0..room {
            let key = match self.wait.pop_front() {
                Some(key) => key,
                None => break
            };
            if let Some(future) = self.futures.get(&key) {
                if !future.has_started() {
                    log_extra!("starting future {:?}",key);
                    future.start_quietly();
                }
            }
            self.work.push(key);
        }
    }

    fn check_stall(&mut self) -> Result<(),Error> {
        if !self.hold.is_empty() && self.wait.is_empty() && self.work.is_empty() {
            let message = format!("scheduler is stalled: {} future(s) are held waiting for others, but nothing is waiting or working (held: {:?})",self.hold.len(),self.hold);
            log_extra!("{}",message);
            let error = Error::stall(&message);
            self.failed = Some(error.clone());
            return Err(error);
        }
        Ok(())
    }

    fn take_ready(&mut self) -> Result<Option<(K,F)>,Error> {
        let futures = &self.futures;
        let index = self.work.iter().position(|key| {
            futures.get(key).map(|f| f.can_resolve()).unwrap_or(true)
        });
        if let Some(index) = index {
            let key = self.work.remove(index);
            let future = hp_unwrap!(self.futures.remove(&key))?;
            self.yielded.insert(key.clone());
            self.promote();
            return Ok(Some((key,future)));
        }
        Ok(None)
    }

    fn block(&self, timeout: f64) {
        let mut read = vec![];
        let mut write = vec![];
        let mut timeout = timeout;
        for key in &self.work {
            if let Some(future) = self.futures.get(key) {
                read.extend(future.read_handles());
                write.extend(future.write_handles());
                timeout = timeout.min(future.default_wait());
            }
        }
        if read.is_empty() && write.is_empty() {
            self.integration.sleep(timeout.min(IDLE_SLEEP));
        } else {
            self.integration.wait_for_handles(&read,&write,timeout);
        }
    }

    /* Ok(None) means there is nothing left to run, or that the scheduler
     * has already reported a stall. With a poll interval set, Step::Tick is
     * returned when the interval passes without a completion.
     */
    pub fn advance(&mut self) -> Result<Option<Step<K,F>>,Error> {
        if self.failed.is_some() { return Ok(None); }
        self.promote();
        self.check_stall()?;
        if self.work.is_empty() { return Ok(None); }
        let start = self.integration.current_time();
        loop {
            for key in &self.work {
                if let Some(future) = self.futures.get(key) {
                    future.update();
                }
            }
            if let Some((key,future)) = self.take_ready()? {
                return Ok(Some(Step::Resolved(key,future)));
            }
            let mut timeout = MAX_WAIT;
            if let Some(interval) = self.config.get_poll_interval() {
                let elapsed = self.integration.current_time()-start;
                if elapsed >= interval {
                    return Ok(Some(Step::Tick));
                }
                timeout = timeout.min(interval-elapsed);
            }
            self.block(timeout);
        }
    }

    pub fn resolve_all(&mut self) -> Result<(),Error> {
        while self.advance()?.is_some() {}
        Ok(())
    }
}

impl<K,F> Iterator for Scheduler<K,F> where K: Clone+Eq+Hash+Debug, F: Resolvable {
    type Item = Result<Step<K,F>,Error>;

    fn next(&mut self) -> Option<Self::Item> { self.advance().transpose() }
}
