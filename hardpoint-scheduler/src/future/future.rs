use std::sync::{ Arc, Mutex };
use hardpoint_toolkit::{ Error, hp_unwrap, identitynumber, lock };
use crate::future::operation::Operation;
use crate::integration::integration::WaitHandle;
use crate::scheduler::scheduler::Scheduler;

/* A Future is a handle on one pending external operation. Clones share the
 * same operation and outcome. The outcome is recorded exactly once, the first
 * time the operation reports completion, and never changes afterwards.
 */

identitynumber!(FUTURE_KEY);

struct FutureState<T> {
    operation: Box<dyn Operation<Output=T>>,
    key: Option<String>,
    started: bool,
    raise_on_start: bool,
    outcome: Option<Result<T,Error>>
}

impl<T> FutureState<T> {
    fn start(&mut self) -> Result<(),Error> {
        self.started = true;
        if self.outcome.is_some() { return Ok(()); }
        if let Err(e) = self.operation.start() {
            self.outcome = Some(Err(e.clone()));
            if self.raise_on_start { return Err(e); }
        }
        Ok(())
    }
}

pub struct Future<T>(Arc<Mutex<FutureState<T>>>);

// Rust bug means dan't derive Clone on polymorphic types
impl<T> Clone for Future<T> {
    fn clone(&self) -> Self { Future(self.0.clone()) }
}

impl<T: 'static> Future<T> {
    pub fn new<O>(operation: O) -> Future<T> where O: Operation<Output=T> + 'static {
        Future::from_parts(Box::new(operation),None)
    }

    pub(crate) fn from_parts(operation: Box<dyn Operation<Output=T>>, outcome: Option<Result<T,Error>>) -> Future<T> {
        Future(Arc::new(Mutex::new(FutureState {
            operation,
            key: None,
            started: false,
            raise_on_start: true,
            outcome
        })))
    }

    pub fn key(&self) -> String {
        lock!(self.0).key.get_or_insert_with(|| format!("Future/{}",FUTURE_KEY.next())).clone()
    }

    pub fn set_key(&self, key: &str) -> Result<(),Error> {
        let mut state = lock!(self.0);
        if let Some(old) = &state.key {
            return Err(Error::config(&format!("future already has key \"{}\"; a key can only be set once",old)));
        }
        state.key = Some(key.to_string());
        Ok(())
    }

    pub fn set_raise_error_on_start(&self, raise: bool) { lock!(self.0).raise_on_start = raise; }

    pub fn start(&self) -> Result<(),Error> {
        let mut state = lock!(self.0);
        if state.started {
            return Err(Error::config("future has already started; futures can not start more than once"));
        }
        state.start()
    }

    pub fn has_started(&self) -> bool { lock!(self.0).started }

    /* True for clones of one future, false for different futures with the same key */
    pub fn same_as(&self, other: &Future<T>) -> bool { Arc::ptr_eq(&self.0,&other.0) }

    /* Poll the operation once, starting it first if nobody has. A start
     * error here is stored rather than raised.
     */
    pub fn update(&self) {
        let mut state = lock!(self.0);
        if state.outcome.is_some() { return; }
        if !state.started {
            let _ = state.start();
            if state.outcome.is_some() { return; }
        }
        match state.operation.poll() {
            Ok(Some(value)) => { state.outcome = Some(Ok(value)); },
            Ok(None) => {},
            Err(e) => { state.outcome = Some(Err(e)); }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.update();
        self.can_resolve()
    }

    pub fn can_resolve(&self) -> bool { lock!(self.0).outcome.is_some() }
    pub fn has_result(&self) -> bool { matches!(lock!(self.0).outcome,Some(Ok(_))) }
    pub fn has_error(&self) -> bool { matches!(lock!(self.0).outcome,Some(Err(_))) }

    pub fn error(&self) -> Option<Error> {
        match &lock!(self.0).outcome {
            Some(Err(e)) => Some(e.clone()),
            _ => None
        }
    }

    pub fn read_handles(&self) -> Vec<WaitHandle> {
        let state = lock!(self.0);
        if state.outcome.is_some() { vec![] } else { state.operation.read_handles() }
    }

    pub fn write_handles(&self) -> Vec<WaitHandle> {
        let state = lock!(self.0);
        if state.outcome.is_some() { vec![] } else { state.operation.write_handles() }
    }

    pub fn default_wait(&self) -> f64 { lock!(self.0).operation.default_wait() }
}

impl<T: Clone + 'static> Future<T> {
    /* The result, if there is one, without waiting */
    pub fn result(&self) -> Option<T> {
        match &lock!(self.0).outcome {
            Some(Ok(value)) => Some(value.clone()),
            _ => None
        }
    }

    /* Block until the operation completes. Every call returns the same
     * value, or raises the same error.
     */
    pub fn resolve(&self) -> Result<T,Error> {
        if !self.can_resolve() {
            let mut scheduler = Scheduler::new();
            scheduler.add_future(self.key(),self.clone())?;
            scheduler.resolve_all()?;
        }
        let state = lock!(self.0);
        match hp_unwrap!(state.outcome.as_ref())? {
            Ok(value) => Ok(value.clone()),
            Err(e) => Err(e.clone())
        }
    }
}

/* What the scheduler needs from a future, independent of its result type. */
pub trait Resolvable {
    fn key(&self) -> String;
    fn identity(&self) -> usize;
    fn has_started(&self) -> bool;
    fn start_quietly(&self);
    fn update(&self);
    fn can_resolve(&self) -> bool;
    fn has_error(&self) -> bool;
    fn read_handles(&self) -> Vec<WaitHandle>;
    fn write_handles(&self) -> Vec<WaitHandle>;
    fn default_wait(&self) -> f64;
}

impl<T: 'static> Resolvable for Future<T> {
    fn key(&self) -> String { Future::key(self) }
    fn identity(&self) -> usize { Arc::as_ptr(&self.0) as *const () as usize }
    fn has_started(&self) -> bool { Future::has_started(self) }

    fn start_quietly(&self) {
        let mut state = lock!(self.0);
        if !state.started {
            state.raise_on_start = false;
            let _ = state.start();
        }
    }

    fn update(&self) { Future::update(self) }
    fn can_resolve(&self) -> bool { Future::can_resolve(self) }
    fn has_error(&self) -> bool { Future::has_error(self) }
    fn read_handles(&self) -> Vec<WaitHandle> { Future::read_handles(self) }
    fn write_handles(&self) -> Vec<WaitHandle> { Future::write_handles(self) }
    fn default_wait(&self) -> f64 { Future::default_wait(self) }
}

impl<R: Resolvable + ?Sized> Resolvable for Arc<R> {
    fn key(&self) -> String { self.as_ref().key() }
    fn identity(&self) -> usize { self.as_ref().identity() }
    fn has_started(&self) -> bool { self.as_ref().has_started() }
    fn start_quietly(&self) { self.as_ref().start_quietly() }
    fn update(&self) { self.as_ref().update() }
    fn can_resolve(&self) -> bool { self.as_ref().can_resolve() }
    fn has_error(&self) -> bool { self.as_ref().has_error() }
    fn read_handles(&self) -> Vec<WaitHandle> { self.as_ref().read_handles() }
    fn write_handles(&self) -> Vec<WaitHandle> { self.as_ref().write_handles() }
    fn default_wait(&self) -> f64 { self.as_ref().default_wait() }
}

#[cfg(test)]
mod test {
    use std::sync::{ Arc, Mutex };
    use hardpoint_toolkit::ErrorType;
    use crate::scheduler::testoperation::{ CountdownOperation, FailingOperation };
    use super::*;

    #[test]
    pub fn test_resolve_is_idempotent() {
        let polls = Arc::new(Mutex::new(0));
        let future = Future::new(CountdownOperation::new(2,7,&polls));
        assert!(!future.has_started());
        assert_eq!(7,future.resolve().ok().unwrap());
        assert_eq!(3,*lock!(polls));
        assert_eq!(7,future.resolve().ok().unwrap());
        assert!(future.is_ready());
        assert_eq!(3,*lock!(polls));
        assert!(future.has_result());
        assert!(!future.has_error());
        assert_eq!(Some(7),future.result());
    }

    #[test]
    pub fn test_error_is_reraised() {
        let future : Future<u32> = Future::new(FailingOperation::new("boom",false));
        for _ in 0..3 {
            let e = future.resolve().err().unwrap();
            assert_eq!(ErrorType::OperationError,e.error_type);
            assert_eq!("boom",e.message);
        }
        assert!(future.has_error());
        assert!(future.can_resolve());
        assert_eq!(None,future.result());
    }

    #[test]
    pub fn test_start_only_once() {
        let polls = Arc::new(Mutex::new(0));
        let future = Future::new(CountdownOperation::new(0,1,&polls));
        assert!(future.start().is_ok());
        assert!(future.has_started());
        assert_eq!(ErrorType::ConfigError,future.start().err().unwrap().error_type);
    }

    #[test]
    pub fn test_start_error() {
        let future : Future<u32> = Future::new(FailingOperation::new("no start",true));
        assert_eq!("no start",future.start().err().unwrap().message);
        assert_eq!("no start",future.resolve().err().unwrap().message);
        let future : Future<u32> = Future::new(FailingOperation::new("quiet start",true));
        future.set_raise_error_on_start(false);
        assert!(future.start().is_ok());
        assert!(future.has_error());
        assert_eq!("quiet start",future.resolve().err().unwrap().message);
    }

    #[test]
    pub fn test_keys() {
        let polls = Arc::new(Mutex::new(0));
        let a = Future::new(CountdownOperation::new(0,1,&polls));
        let b = Future::new(CountdownOperation::new(0,1,&polls));
        assert!(a.key().starts_with("Future/"));
        assert_ne!(a.key(),b.key());
        assert_eq!(a.key(),a.clone().key());
        assert!(a.set_key("other").is_err());
        let c = Future::new(CountdownOperation::new(0,1,&polls));
        assert!(c.set_key("mine").is_ok());
        assert_eq!("mine",c.key());
        assert!(c.set_key("again").is_err());
        let d = Future::new(CountdownOperation::new(0,1,&polls));
        d.set_key("mine").ok().unwrap();
        assert!(!c.same_as(&d));
        assert_ne!(Resolvable::identity(&c),Resolvable::identity(&d));
        assert!(c.same_as(&c.clone()));
        let shared : Arc<dyn Resolvable> = Arc::new(c.clone());
        assert_eq!(Resolvable::identity(&c),shared.identity());
    }

    #[test]
    pub fn test_update_starts() {
        let polls = Arc::new(Mutex::new(0));
        let future = Future::new(CountdownOperation::new(1,1,&polls));
        assert!(!future.is_ready());
        assert!(future.has_started());
        assert!(future.is_ready());
        assert_eq!(2,*lock!(polls));
    }
}
