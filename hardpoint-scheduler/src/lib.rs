mod future {
    pub mod future;
    pub mod immediate;
    pub mod operation;
    pub mod proxy;
    #[cfg(unix)]
    pub mod exec;
}

mod integration {
    pub mod integration;
    pub mod system;
    #[cfg(test)]
    pub mod testintegration;
}

mod scheduler {
    pub mod config;
    pub mod pool;
    pub mod scheduler;
    #[cfg(test)]
    pub mod testoperation;
}

pub use crate::future::future::{ Future, Resolvable };
pub use crate::future::operation::Operation;
#[cfg(unix)]
pub use crate::future::exec::{ ExecFuture, ExecOutput };
pub use crate::integration::integration::{ Integration, WaitHandle };
pub use crate::integration::system::SystemIntegration;
pub use crate::scheduler::config::{ SchedulerConfig, SchedulerSetting, SchedulerValue };
pub use crate::scheduler::pool::FuturePool;
pub use crate::scheduler::scheduler::{ Scheduler, Step };
