pub mod console;
pub mod error;
pub mod identity;
pub mod refs;

pub use error::{ Error, ErrorType };
pub use identity::IdentityNumber;
