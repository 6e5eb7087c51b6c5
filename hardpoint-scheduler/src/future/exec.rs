use std::ffi::OsStr;
use std::io::{ ErrorKind, Read, Write };
use std::os::unix::io::{ AsRawFd, RawFd };
use std::path::Path;
use std::process::{ Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio };
use std::time::Instant;
use hardpoint_toolkit::{ Error, hp_unwrap, log_extra };
use crate::future::future::Future;
use crate::future::operation::Operation;
use crate::integration::integration::WaitHandle;

/* ExecFuture runs a subprocess. Its pipes are read without blocking every
 * time the future is polled and the scheduler waits on them, so many
 * commands can run at once from one thread.
 */

#[derive(Clone,Debug)]
pub struct ExecOutput {
    pub status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>
}

impl ExecOutput {
    pub fn stdout_str(&self) -> String { String::from_utf8_lossy(&self.stdout).to_string() }
    pub fn stderr_str(&self) -> String { String::from_utf8_lossy(&self.stderr).to_string() }

    /* A non-zero exit status is an error */
    pub fn check(&self) -> Result<&ExecOutput,Error> {
        if self.status != 0 {
            return Err(Error::operr(&format!("command failed with error #{}\nstdout:\n{}\nstderr:\n{}",
                self.status,self.stdout_str(),self.stderr_str())));
        }
        Ok(self)
    }

    pub fn stdout_json(&self) -> Result<serde_json::Value,Error> {
        self.check()?;
        if self.stdout.iter().all(|c| c.is_ascii_whitespace()) {
            return Err(Error::operr("command produced no output, expected JSON"));
        }
        Ok(serde_json::from_slice(&self.stdout)?)
    }
}

pub struct ExecFuture {
    command: Command,
    display: String,
    timeout: Option<f64>,
    input: Vec<u8>
}

impl ExecFuture {
    pub fn new<S: AsRef<OsStr>>(program: S) -> ExecFuture {
        let display = program.as_ref().to_string_lossy().to_string();
        ExecFuture {
            command: Command::new(program),
            display,
            timeout: None,
            input: vec![]
        }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> ExecFuture {
        self.display.push(' ');
        self.display.push_str(&arg.as_ref().to_string_lossy());
        self.command.arg(arg);
        self
    }

    pub fn args<I,S>(mut self, args: I) -> ExecFuture where I: IntoIterator<Item=S>, S: AsRef<OsStr> {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    pub fn current_dir<P: AsRef<Path>>(mut self, dir: P) -> ExecFuture {
        self.command.current_dir(dir);
        self
    }

    pub fn env<K: AsRef<OsStr>,V: AsRef<OsStr>>(mut self, key: K, value: V) -> ExecFuture {
        self.command.env(key,value);
        self
    }

    /* The command is killed and the future fails if it runs longer than this. */
    pub fn timeout(mut self, seconds: f64) -> ExecFuture {
        self.timeout = Some(seconds);
        self
    }

    pub fn stdin(mut self, input: &[u8]) -> ExecFuture {
        self.input = input.to_vec();
        self
    }

    pub fn future(self) -> Future<ExecOutput> {
        Future::new(ExecOperation {
            command: self.command,
            display: self.display,
            timeout: self.timeout,
            input: self.input,
            written: 0,
            child: None,
            stdin: None,
            stdout: None,
            stderr: None,
            out: vec![],
            err: vec![],
            started_at: None
        })
    }
}

fn set_nonblocking(fd: RawFd) -> Result<(),Error> {
    let flags = unsafe { libc::fcntl(fd,libc::F_GETFL) };
    if flags < 0 || unsafe { libc::fcntl(fd,libc::F_SETFL,flags|libc::O_NONBLOCK) } < 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

/* Read whatever is available. The pipe is dropped at end of file. */
fn drain<R: Read>(pipe: &mut Option<R>, into: &mut Vec<u8>) -> Result<(),Error> {
    let mut buffer = [0_u8;8192];
    while let Some(reader) = pipe.as_mut() {
        match reader.read(&mut buffer) {
            Ok(0) => { *pipe = None; },
            Ok(n) => { into.extend_from_slice(&buffer[..n]); },
            Err(e) if e.kind() == ErrorKind::WouldBlock => { return Ok(()); },
            Err(e) if e.kind() == ErrorKind::Interrupted => {},
            Err(e) => { return Err(e.into()); }
        }
    }
    Ok(())
}

struct ExecOperation {
    command: Command,
    display: String,
    timeout: Option<f64>,
    input: Vec<u8>,
    written: usize,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    out: Vec<u8>,
    err: Vec<u8>,
    started_at: Option<Instant>
}

impl ExecOperation {
    fn spawn(&mut self) -> Result<(),Error> {
        if self.child.is_some() { return Ok(()); }
        self.command.stdout(Stdio::piped()).stderr(Stdio::piped());
        self.command.stdin(if self.input.is_empty() { Stdio::null() } else { Stdio::piped() });
        let mut child = self.command.spawn().map_err(|e| {
            Error::operr(&format!("failed to run '{}': {}",self.display,e))
        })?;
        self.stdin = child.stdin.take();
        self.stdout = child.stdout.take();
        self.stderr = child.stderr.take();
        self.child = Some(child);
        self.started_at = Some(Instant::now());
        for fd in self.read_handles().iter().chain(self.write_handles().iter()) {
            set_nonblocking(*fd)?;
        }
        log_extra!("started '{}'",self.display);
        Ok(())
    }

    fn feed(&mut self) -> Result<(),Error> {
        if let Some(stdin) = self.stdin.as_mut() {
            while self.written < self.input.len() {
                match stdin.write(&self.input[self.written..]) {
                    Ok(n) => { self.written += n; },
                    Err(e) if e.kind() == ErrorKind::WouldBlock => { return Ok(()); },
                    Err(e) if e.kind() == ErrorKind::Interrupted => {},
                    Err(e) if e.kind() == ErrorKind::BrokenPipe => { break; },
                    Err(e) => { return Err(e.into()); }
                }
            }
            self.stdin = None;
        }
        Ok(())
    }

    fn remaining(&self) -> Option<f64> {
        match (self.timeout,self.started_at) {
            (Some(timeout),Some(start)) => Some(timeout-start.elapsed().as_secs_f64()),
            (Some(timeout),None) => Some(timeout),
            _ => None
        }
    }

    fn kill(&mut self) {
        self.stdin = None;
        self.stdout = None;
        self.stderr = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Operation for ExecOperation {
    type Output = ExecOutput;

    fn start(&mut self) -> Result<(),Error> { self.spawn() }

    fn poll(&mut self) -> Result<Option<ExecOutput>,Error> {
        self.spawn()?;
        self.feed()?;
        drain(&mut self.stdout,&mut self.out)?;
        drain(&mut self.stderr,&mut self.err)?;
        let status = hp_unwrap!(self.child.as_mut())?.try_wait()?;
        if let Some(status) = status {
            drain(&mut self.stdout,&mut self.out)?;
            drain(&mut self.stderr,&mut self.err)?;
            self.stdin = None;
            self.stdout = None;
            self.stderr = None;
            self.child = None;
            log_extra!("'{}' exited with {}",self.display,status);
            return Ok(Some(ExecOutput {
                status: status.code().unwrap_or(-1),
                stdout: std::mem::take(&mut self.out),
                stderr: std::mem::take(&mut self.err)
            }));
        }
        if let Some(remaining) = self.remaining() {
            if remaining <= 0. {
                self.kill();
                return Err(Error::operr(&format!("command '{}' killed by timeout after running for more than {} seconds",
                    self.display,self.timeout.unwrap_or(0.))));
            }
        }
        Ok(None)
    }

    fn read_handles(&self) -> Vec<WaitHandle> {
        let mut out = vec![];
        if let Some(pipe) = &self.stdout { out.push(pipe.as_raw_fd()); }
        if let Some(pipe) = &self.stderr { out.push(pipe.as_raw_fd()); }
        out
    }

    fn write_handles(&self) -> Vec<WaitHandle> {
        self.stdin.iter().map(|pipe| pipe.as_raw_fd()).collect()
    }

    fn default_wait(&self) -> f64 {
        match self.remaining() {
            Some(remaining) => remaining.max(0.).min(1.),
            None => 1.
        }
    }
}

impl Drop for ExecOperation {
    fn drop(&mut self) { self.kill(); }
}

#[cfg(test)]
mod test {
    use hardpoint_toolkit::ErrorType;
    use crate::scheduler::scheduler::Scheduler;
    use super::*;

    #[test]
    pub fn test_echo() {
        let output = ExecFuture::new("sh").args(&["-c","echo hello; echo oops >&2"]).future().resolve().ok().unwrap();
        assert_eq!(0,output.status);
        assert_eq!("hello\n",output.stdout_str());
        assert_eq!("oops\n",output.stderr_str());
        assert!(output.check().is_ok());
    }

    #[test]
    pub fn test_exit_status() {
        let output = ExecFuture::new("sh").arg("-c").arg("exit 3").future().resolve().ok().unwrap();
        assert_eq!(3,output.status);
        assert_eq!(ErrorType::OperationError,output.check().err().unwrap().error_type);
    }

    #[test]
    pub fn test_stdin() {
        let output = ExecFuture::new("cat").stdin(b"piped through").future().resolve().ok().unwrap();
        assert_eq!("piped through",output.stdout_str());
    }

    #[test]
    pub fn test_json() {
        let output = ExecFuture::new("sh").args(&["-c","echo '{\"a\": [1,2]}'"]).future().resolve().ok().unwrap();
        let json = output.stdout_json().ok().unwrap();
        assert_eq!(2,json["a"][1]);
        let output = ExecFuture::new("sh").args(&["-c","echo nope"]).future().resolve().ok().unwrap();
        assert!(output.stdout_json().is_err());
    }

    #[test]
    pub fn test_timeout() {
        let future = ExecFuture::new("sleep").arg("5").timeout(0.2).future();
        let start = Instant::now();
        let e = future.resolve().err().unwrap();
        assert!(e.message.contains("timeout"));
        assert!(start.elapsed().as_secs_f64() < 4.);
        assert!(future.resolve().is_err());
    }

    #[test]
    pub fn test_missing_program() {
        let future = ExecFuture::new("/nonexistent/program/for/test").future();
        assert!(future.resolve().is_err());
    }

    #[test]
    pub fn test_run_together() {
        let mut scheduler = Scheduler::new();
        for i in 0..4 {
            let future = ExecFuture::new("sh").arg("-c").arg(format!("sleep 0.{}; echo {}",4-i,i)).future();
            scheduler.add_future(i,future).ok().unwrap();
        }
        let start = Instant::now();
        let mut order = vec![];
        for step in &mut scheduler {
            if let Some((key,future)) = step.ok().unwrap().resolved() {
                assert_eq!(format!("{}\n",key),future.resolve().ok().unwrap().stdout_str());
                order.push(key);
            }
        }
        assert_eq!(vec![3,2,1,0],order);
        assert!(start.elapsed().as_secs_f64() < 1.);
    }
}
