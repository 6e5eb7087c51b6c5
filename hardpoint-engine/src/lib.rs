mod hardpoint {
    pub mod hardpoint;
    pub mod list;
    pub mod object;
    pub mod value;
}

mod engine {
    pub mod context;
    pub mod engine;
    pub mod link;
    pub mod query;
    pub mod request;
    pub mod task;
    #[cfg(test)]
    pub mod testobjects;
}

pub use crate::hardpoint::hardpoint::{ Hardpoint, HardpointKind, IdentityFn, MergeRule };
pub use crate::hardpoint::list::HardpointList;
pub use crate::hardpoint::object::{ HardpointObject, ObjectMap, object_map };
pub use crate::hardpoint::value::{ HardpointValue, Value, value };
pub use crate::engine::context::{ FutureList, QueryContext };
pub use crate::engine::engine::{ HardpointEngine, DEFAULT_CONCURRENCY_LIMIT };
pub use crate::engine::query::{ HardpointQuery, QueryProcedure, ValueMap, value_map };
pub use crate::engine::request::{ HardpointRequest, RequestList };
