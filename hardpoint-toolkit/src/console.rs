use std::sync::{ Arc, Mutex };
use lazy_static::lazy_static;
use crate::lock;

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Severity {
    Notice,
    Warning,
    Error
}

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Verbosity {
    Noisy,
    Normal,
    Quiet
}

impl Verbosity {
    pub fn from_string(str: &str) -> Option<Verbosity> {
        match str {
            "quiet" => Some(Verbosity::Quiet),
            "noisy" => Some(Verbosity::Noisy),
            "normal" => Some(Verbosity::Normal),
            _ => None
        }
    }

    fn level(&self) -> usize {
        match self {
            Verbosity::Quiet => 0,
            Verbosity::Normal => 1,
            Verbosity::Noisy => 2
        }
    }
}

type Printer = Box<dyn FnMut(&Severity,&str) + 'static + Send>;

lazy_static! {
    static ref VERBOSITY : Arc<Mutex<Verbosity>> = Arc::new(Mutex::new(Verbosity::Normal));
    static ref PRINTER : Arc<Mutex<Option<Printer>>> = Arc::new(Mutex::new(None));
}

pub fn set_verbosity(verbosity: &Option<Verbosity>) {
    if let Some(verbosity) = verbosity {
        *lock!(VERBOSITY) = *verbosity;
    }
}

pub fn verbosity() -> Verbosity { *lock!(VERBOSITY) }

/* Nothing is printed until a printer is installed. */
pub fn set_printer<F>(cb: F) where F: FnMut(&Severity,&str) + 'static + Send {
    *lock!(PRINTER) = Some(Box::new(cb));
}

pub fn print_to_stderr() {
    set_printer(|severity,message| {
        match severity {
            Severity::Notice => eprintln!("{}",message),
            Severity::Warning => eprintln!("warning: {}",message),
            Severity::Error => eprintln!("error: {}",message)
        }
    });
}

/* Don't call directly, use macros */
pub fn print(verbosity: &Verbosity, severity: &Severity, message: &str) {
    if verbosity.level() > lock!(VERBOSITY).level() { return; }
    if let Some(printer) = lock!(PRINTER).as_mut() {
        printer(severity,message);
    }
}

#[macro_export]
macro_rules! do_log {
    ($verb:tt,$sev:tt,$($arg:tt)*) => {
        $crate::console::print(&$crate::console::Verbosity::$verb,&$crate::console::Severity::$sev,&std::format!($($arg)*))
    }
}

#[macro_export]
macro_rules! debug_do_log {
    ($verb:tt,$sev:tt,$($arg:tt)*) => {
        #[cfg(debug_assertions)]
        $crate::console::print(&$crate::console::Verbosity::$verb,&$crate::console::Severity::$sev,&std::format!($($arg)*))
    }
}

#[macro_export]
macro_rules! log { ($($arg:tt)*) => { $crate::do_log!(Normal,Notice,$($arg)*); } }
#[macro_export]
macro_rules! log_important { ($($arg:tt)*) => { $crate::do_log!(Quiet,Notice,$($arg)*); } }
#[macro_export]
macro_rules! log_extra { ($($arg:tt)*) => { $crate::do_log!(Noisy,Notice,$($arg)*); } }
#[macro_export]
macro_rules! warn { ($($arg:tt)*) => { $crate::do_log!(Normal,Warning,$($arg)*); } }
#[macro_export]
macro_rules! warn_extra { ($($arg:tt)*) => { $crate::do_log!(Noisy,Warning,$($arg)*); } }
#[macro_export]
macro_rules! error { ($($arg:tt)*) => { $crate::do_log!(Normal,Error,$($arg)*); } }

#[macro_export]
macro_rules! debug_log { ($($arg:tt)*) => { $crate::debug_do_log!(Normal,Notice,$($arg)*); } }

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn test_verbosity_from_string() {
        assert_eq!(Some(Verbosity::Quiet),Verbosity::from_string("quiet"));
        assert_eq!(Some(Verbosity::Noisy),Verbosity::from_string("noisy"));
        assert_eq!(None,Verbosity::from_string("loud"));
    }

    #[test]
    pub fn test_printer_filters_by_verbosity() {
        let seen = Arc::new(Mutex::new(vec![]));
        let seen2 = seen.clone();
        set_printer(move |severity,message| {
            lock!(seen2).push((*severity,message.to_string()));
        });
        set_verbosity(&Some(Verbosity::Normal));
        log!("hello {}",1);
        log_extra!("too noisy");
        warn!("careful");
        log_important!("always");
        set_verbosity(&Some(Verbosity::Quiet));
        log!("hidden");
        error!("hidden too");
        set_verbosity(&Some(Verbosity::Normal));
        assert_eq!(vec![
            (Severity::Notice,"hello 1".to_string()),
            (Severity::Warning,"careful".to_string()),
            (Severity::Notice,"always".to_string())
        ],*lock!(seen));
    }
}
