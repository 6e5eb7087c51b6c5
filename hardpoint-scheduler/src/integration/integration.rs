/* A wait handle is something the OS can tell us is ready to read or write.
 * On unix that is a raw file descriptor.
 */
pub type WaitHandle = i32;

/* Integration is how the scheduler learns the time and blocks when nothing
 * is ready. Times are in seconds from an arbitrary epoch.
 */
pub trait Integration {
    fn current_time(&self) -> f64;
    fn sleep(&self, seconds: f64);

    /* Block until a handle is ready or the timeout passes, whichever is
     * sooner. Spurious early returns are fine.
     */
    fn wait_for_handles(&self, read: &[WaitHandle], write: &[WaitHandle], timeout: f64) {
        let _ = (read,write);
        self.sleep(timeout);
    }
}
