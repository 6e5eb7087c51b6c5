use std::sync::{ Arc, Mutex };
use hardpoint_toolkit::lock;
use crate::integration::integration::{ Integration, WaitHandle };

/* TestIntegration is the integration used in unit tests. Time only moves
 * when someone sleeps, and every sleep is recorded.
 */

#[derive(Clone)]
pub struct TestIntegration {
    timer: Arc<Mutex<f64>>,
    sleeps: Arc<Mutex<Vec<f64>>>,
    waits: Arc<Mutex<Vec<Vec<WaitHandle>>>>
}

impl TestIntegration {
    pub(crate) fn new() -> TestIntegration {
        TestIntegration {
            timer: Arc::new(Mutex::new(0.)),
            sleeps: Arc::new(Mutex::new(vec![])),
            waits: Arc::new(Mutex::new(vec![]))
        }
    }

    pub(crate) fn get_sleeps(&self) -> Vec<f64> { lock!(self.sleeps).clone() }
    pub(crate) fn get_waits(&self) -> Vec<Vec<WaitHandle>> { lock!(self.waits).clone() }
}

impl Integration for TestIntegration {
    fn current_time(&self) -> f64 { *lock!(self.timer) }

    fn sleep(&self, seconds: f64) {
        lock!(self.sleeps).push(seconds);
        *lock!(self.timer) += seconds;
    }

    fn wait_for_handles(&self, read: &[WaitHandle], write: &[WaitHandle], timeout: f64) {
        let mut handles = read.to_vec();
        handles.extend_from_slice(write);
        lock!(self.waits).push(handles);
        self.sleep(timeout);
    }
}
