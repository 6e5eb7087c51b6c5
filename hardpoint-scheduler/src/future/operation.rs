use hardpoint_toolkit::Error;
use crate::integration::integration::WaitHandle;

/* An Operation is the producer side of a Future: the actual external work.
 * poll() must never block. Returning Ok(Some(..)) or Err(..) completes the
 * future and poll() is not called again.
 */
pub trait Operation {
    type Output;

    fn start(&mut self) -> Result<(),Error> { Ok(()) }
    fn poll(&mut self) -> Result<Option<Self::Output>,Error>;

    fn read_handles(&self) -> Vec<WaitHandle> { vec![] }
    fn write_handles(&self) -> Vec<WaitHandle> { vec![] }

    /* Longest the scheduler should block before polling again, in seconds. */
    fn default_wait(&self) -> f64 { 1. }
}
