use std::fmt;

#[derive(Clone,Debug,PartialEq,Eq)]
pub enum ErrorType {
    OperationError,  // An external operation failed; other operations may succeed
    ConfigError,     // Caller asked for something impossible or inconsistent
    Stall,           // Work remains but nothing can ever make progress
    FatalError       // An internal invariant was broken
}

#[derive(Clone,Debug)]
pub struct Error {
    pub error_type: ErrorType,
    pub message: String
}

macro_rules! error_ctor {
    ($name:ident,$rname:ident,$type:tt) => {
        pub fn $name(text: &str) -> Error {
            crate::error::Error {
                error_type: ErrorType::$type,
                message: text.to_string()
            }
        }

        pub fn $rname<T, E: std::fmt::Debug>(data: Result<T,E>, text: &str) -> Result<T,Error> {
            data.map_err(|e| {
                crate::error::Error::$name(&format!("{}: {:?}",text,e))
            })
        }
    }
}

impl Error {
    error_ctor!(operr,oper_r,OperationError);
    error_ctor!(config,config_r,ConfigError);
    error_ctor!(stall,stall_r,Stall);
    error_ctor!(fatal,fatal_r,FatalError);

    pub fn is_stall(&self) -> bool { self.error_type == ErrorType::Stall }
    pub fn is_fatal(&self) -> bool { self.error_type == ErrorType::FatalError }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.error_type {
            ErrorType::OperationError => "operation failed",
            ErrorType::ConfigError => "bad request",
            ErrorType::Stall => "stalled",
            ErrorType::FatalError => "internal error"
        };
        write!(f,"{}: {}",kind,self.message)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error { Error::operr(&e.to_string()) }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error { Error::operr(&format!("bad JSON: {}",e)) }
}

#[macro_export]
macro_rules! hp_ok {
    ($data:expr) => {
        $data.map_err(|e| {
            $crate::error::Error::fatal(&format!("{:?} ({}:{})",e,file!(),line!()))
        })
    };
}

#[macro_export]
macro_rules! hp_unwrap {
    ($data:expr) => {
        $data.ok_or_else(|| {
            $crate::error::Error::fatal(&format!("unwrap failed ({}:{})",file!(),line!()))
        })
    };
}
