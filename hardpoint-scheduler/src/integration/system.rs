use std::time::{ Duration, Instant };
use crate::integration::integration::{ Integration, WaitHandle };

#[derive(Clone)]
pub struct SystemIntegration {
    epoch: Instant
}

impl SystemIntegration {
    pub fn new() -> SystemIntegration {
        SystemIntegration { epoch: Instant::now() }
    }
}

impl Default for SystemIntegration {
    fn default() -> SystemIntegration { SystemIntegration::new() }
}

impl Integration for SystemIntegration {
    fn current_time(&self) -> f64 { self.epoch.elapsed().as_secs_f64() }

    fn sleep(&self, seconds: f64) {
        if seconds > 0. {
            std::thread::sleep(Duration::from_secs_f64(seconds));
        }
    }

    #[cfg(unix)]
    fn wait_for_handles(&self, read: &[WaitHandle], write: &[WaitHandle], timeout: f64) {
        let mut fds = vec![];
        for fd in read {
            fds.push(libc::pollfd { fd: *fd, events: libc::POLLIN, revents: 0 });
        }
        for fd in write {
            fds.push(libc::pollfd { fd: *fd, events: libc::POLLOUT, revents: 0 });
        }
        if fds.is_empty() {
            self.sleep(timeout);
            return;
        }
        let millis = (timeout.max(0.)*1000.).ceil().min(i32::MAX as f64) as libc::c_int;
        /* EINTR and friends just mean we poll the futures early */
        unsafe { libc::poll(fds.as_mut_ptr(),fds.len() as libc::nfds_t,millis); }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn test_clock_moves() {
        let integration = SystemIntegration::new();
        let a = integration.current_time();
        integration.sleep(0.002);
        assert!(integration.current_time()>a);
    }

    #[cfg(unix)]
    #[test]
    pub fn test_wait_times_out() {
        let integration = SystemIntegration::new();
        let mut fds = [0 as libc::c_int;2];
        assert_eq!(0,unsafe { libc::pipe(fds.as_mut_ptr()) });
        let start = integration.current_time();
        integration.wait_for_handles(&[fds[0]],&[],0.01);
        assert!(integration.current_time()-start >= 0.005);
        unsafe { libc::close(fds[0]); libc::close(fds[1]); }
    }
}
