use hardpoint_toolkit::{ Error, hp_unwrap };
use crate::future::future::Future;
use crate::future::operation::Operation;
use crate::integration::integration::WaitHandle;

/* A proxy future completes when the future it wraps does, passing the
 * outcome through a callback first. Waiting on the proxy waits on the
 * wrapped future's handles.
 */
struct ProxyOperation<T,U> {
    proxied: Future<T>,
    callback: Option<Box<dyn FnOnce(Result<T,Error>) -> Result<U,Error>>>
}

impl<T: Clone + 'static,U: 'static> Operation for ProxyOperation<T,U> {
    type Output = U;

    fn start(&mut self) -> Result<(),Error> {
        if !self.proxied.has_started() {
            self.proxied.start()?;
        }
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<U>,Error> {
        if !self.proxied.is_ready() { return Ok(None); }
        let callback = hp_unwrap!(self.callback.take())?;
        callback(self.proxied.resolve()).map(Some)
    }

    fn read_handles(&self) -> Vec<WaitHandle> { self.proxied.read_handles() }
    fn write_handles(&self) -> Vec<WaitHandle> { self.proxied.write_handles() }
    fn default_wait(&self) -> f64 { self.proxied.default_wait() }
}

impl<T: Clone + 'static> Future<T> {
    /* The callback sees errors too, and may recover from them. */
    pub fn then<U,F>(&self, callback: F) -> Future<U> where U: 'static, F: FnOnce(Result<T,Error>) -> Result<U,Error> + 'static {
        Future::new(ProxyOperation {
            proxied: self.clone(),
            callback: Some(Box::new(callback))
        })
    }

    pub fn map<U,F>(&self, callback: F) -> Future<U> where U: 'static, F: FnOnce(T) -> Result<U,Error> + 'static {
        self.then(move |outcome| outcome.and_then(callback))
    }
}
