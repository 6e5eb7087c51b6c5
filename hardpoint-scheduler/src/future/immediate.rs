use std::marker::PhantomData;
use hardpoint_toolkit::Error;
use crate::future::future::Future;
use crate::future::operation::Operation;

/* Stands in for the operation of a future which was complete on creation.
 * It is never polled.
 */
struct Settled<T>(PhantomData<T>);

impl<T> Operation for Settled<T> {
    type Output = T;

    fn poll(&mut self) -> Result<Option<T>,Error> { Ok(None) }
    fn default_wait(&self) -> f64 { 0. }
}

impl<T: 'static> Future<T> {
    pub fn immediate(value: T) -> Future<T> {
        Future::from_parts(Box::new(Settled(PhantomData)),Some(Ok(value)))
    }

    pub fn failed(error: Error) -> Future<T> {
        Future::from_parts(Box::new(Settled(PhantomData)),Some(Err(error)))
    }
}

#[cfg(test)]
mod test {
    use crate::scheduler::scheduler::{ Scheduler, Step };
    use super::*;

    #[test]
    pub fn test_immediate() {
        let future = Future::immediate("done".to_string());
        assert!(future.can_resolve());
        assert!(!future.has_started());
        assert_eq!("done",future.resolve().ok().unwrap());
        assert!(future.start().is_ok());
    }

    #[test]
    pub fn test_failed() {
        let future : Future<u8> = Future::failed(Error::operr("nope"));
        assert!(future.has_error());
        assert_eq!("nope",future.resolve().err().unwrap().message);
    }

    #[test]
    pub fn test_immediate_in_scheduler() {
        let mut scheduler = Scheduler::new();
        scheduler.add_future("a".to_string(),Future::immediate(1)).ok().unwrap();
        match scheduler.advance().ok().unwrap() {
            Some(Step::Resolved(key,future)) => {
                assert_eq!("a",key);
                assert_eq!(1,future.resolve().ok().unwrap());
            },
            _ => { assert!(false); }
        }
        assert!(scheduler.advance().ok().unwrap().is_none());
    }
}
