use std::collections::BTreeMap;
use std::future::Future as StdFuture;
use std::pin::Pin;
use hardpoint_toolkit::Error;
use crate::engine::context::QueryContext;
use crate::hardpoint::object::{ HardpointObject, ObjectMap };
use crate::hardpoint::value::HardpointValue;

/* Object key to value, as returned by a query procedure */
pub type ValueMap = BTreeMap<String,HardpointValue>;

pub type QueryProcedure = Pin<Box<dyn StdFuture<Output=Result<ValueMap,Error>>>>;

/* A HardpointQuery knows how to load some hardpoints for some objects.
 *
 * load_hardpoint returns the procedure which does the loading, usually an
 * async block. The procedure may only wait by awaiting the yield_* methods
 * of the context it is given: the engine polls it without a real waker.
 */
pub trait HardpointQuery {
    fn get_hardpoints(&self) -> Vec<String>;
    fn can_load_object(&self, object: &dyn HardpointObject) -> bool;
    fn load_hardpoint(&self, context: QueryContext, objects: ObjectMap, hardpoint: &str) -> QueryProcedure;

    fn describe(&self) -> String { std::any::type_name::<Self>().to_string() }
}

/* The same value for every object */
pub fn value_map(objects: &ObjectMap, value: HardpointValue) -> ValueMap {
    objects.keys().map(|key| (key.clone(),value.clone())).collect()
}
