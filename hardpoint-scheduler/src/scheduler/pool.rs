use std::sync::Arc;
use hashbrown::HashMap;
use hardpoint_toolkit::Error;
use crate::future::future::Resolvable;
use crate::integration::integration::Integration;
use crate::integration::system::SystemIntegration;
use crate::scheduler::config::SchedulerConfig;
use crate::scheduler::scheduler::{ Scheduler, Step };

/* A FuturePool accepts futures indefinitely. A scheduler is built from the
 * template config when the first future arrives and thrown away once it has
 * handed back everything, so the next future starts a fresh one.
 */
pub struct FuturePool<F> where F: Resolvable + Clone {
    template: SchedulerConfig,
    integration: Arc<dyn Integration>,
    scheduler: Option<Scheduler<String,F>>,
    futures: HashMap<String,F>
}

impl<F> FuturePool<F> where F: Resolvable + Clone {
    pub fn new() -> FuturePool<F> { FuturePool::with_config(&SchedulerConfig::new()) }

    pub fn with_config(template: &SchedulerConfig) -> FuturePool<F> {
        FuturePool {
            template: template.clone(),
            integration: Arc::new(SystemIntegration::new()),
            scheduler: None,
            futures: HashMap::new()
        }
    }

    pub fn set_integration(&mut self, integration: Arc<dyn Integration>) { self.integration = integration; }

    /* Changes apply from the next scheduler the pool builds */
    pub fn config_mut(&mut self) -> &mut SchedulerConfig { &mut self.template }

    pub fn add_future(&mut self, future: F) -> Result<(),Error> {
        let key = future.key();
        let template = &self.template;
        let integration = &self.integration;
        let scheduler = self.scheduler.get_or_insert_with(|| {
            Scheduler::with_integration(template,integration.clone())
        });
        scheduler.add_future(key.clone(),future.clone())?;
        self.futures.insert(key,future);
        Ok(())
    }

    pub fn has_futures(&self) -> bool { !self.futures.is_empty() }
    pub fn has_future(&self, key: &str) -> bool { self.futures.contains_key(key) }
    pub fn get_future(&self, key: &str) -> Option<&F> { self.futures.get(key) }
    pub fn get_futures(&self) -> Vec<F> { self.futures.values().cloned().collect() }

    /* None when there is nothing left to run. Step::Tick when the template's
     * poll interval passes with nothing completing.
     */
    pub fn resolve(&mut self) -> Result<Option<Step<String,F>>,Error> {
        let scheduler = match self.scheduler.as_mut() {
            Some(scheduler) => scheduler,
            None => { return Ok(None); }
        };
        match scheduler.advance() {
            Ok(Some(Step::Resolved(key,future))) => {
                self.futures.remove(&key);
                Ok(Some(Step::Resolved(key,future)))
            },
            Ok(Some(Step::Tick)) => Ok(Some(Step::Tick)),
            Ok(None) => {
                self.scheduler = None;
                Ok(None)
            },
            Err(e) => {
                self.scheduler = None;
                self.futures.clear();
                Err(e)
            }
        }
    }
}

impl<F> Default for FuturePool<F> where F: Resolvable + Clone {
    fn default() -> FuturePool<F> { FuturePool::new() }
}

#[cfg(test)]
mod test {
    use crate::future::future::Future;
    use crate::integration::testintegration::TestIntegration;
    use crate::scheduler::testoperation::ClockOperation;
    use super::*;

    #[test]
    pub fn test_empty_pool() {
        let mut pool : FuturePool<Future<u32>> = FuturePool::new();
        assert!(!pool.has_futures());
        assert!(pool.resolve().ok().unwrap().is_none());
    }

    #[test]
    pub fn test_sentinel_after_drain() {
        let mut pool = FuturePool::new();
        let future = Future::immediate(4);
        let key = future.key();
        pool.add_future(future).ok().unwrap();
        assert!(pool.has_future(&key));
        assert!(pool.get_future(&key).is_some());
        let (got,future) = pool.resolve().ok().unwrap().and_then(|s| s.resolved()).unwrap();
        assert_eq!(key,got);
        assert_eq!(4,future.resolve().ok().unwrap());
        assert!(!pool.has_futures());
        assert!(pool.resolve().ok().unwrap().is_none());
        assert!(pool.resolve().ok().unwrap().is_none());
        pool.add_future(Future::immediate(5)).ok().unwrap();
        assert_eq!(5,pool.resolve().ok().unwrap().and_then(|s| s.resolved()).unwrap().1.resolve().ok().unwrap());
    }

    #[test]
    pub fn test_pool_ticks() {
        let integration = TestIntegration::new();
        let mut pool = FuturePool::with_config(&SchedulerConfig::new().with_poll_interval(Some(0.05)));
        pool.set_integration(Arc::new(integration.clone()));
        let slow = Future::new(ClockOperation::new(&integration,0.2,9));
        pool.add_future(slow.clone()).ok().unwrap();
        assert_eq!(1,pool.get_futures().len());
        let mut ticks = 0;
        let value = loop {
            match pool.resolve().ok().unwrap() {
                Some(Step::Resolved(_,future)) => { break future.resolve().ok().unwrap(); },
                Some(Step::Tick) => {
                    assert!(pool.has_futures());
                    ticks += 1;
                },
                None => { assert!(false); }
            }
        };
        assert_eq!(9,value);
        assert!(ticks >= 3);
        assert!(pool.resolve().ok().unwrap().is_none());
        assert!(slow.has_result());
    }

    #[test]
    pub fn test_pool_template() {
        let mut pool : FuturePool<Future<u32>> = FuturePool::new();
        pool.config_mut().set_limit(Some(3));
        pool.add_future(Future::immediate(1)).ok().unwrap();
        assert_eq!(Some(3),pool.scheduler.as_ref().unwrap().config().get_limit());
    }

    #[test]
    pub fn test_duplicate_future() {
        let mut pool = FuturePool::new();
        let future = Future::immediate(1);
        pool.add_future(future.clone()).ok().unwrap();
        assert!(pool.add_future(future).is_err());
    }
}
