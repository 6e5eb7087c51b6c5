use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use hardpoint_toolkit::Error;
use crate::hardpoint::list::HardpointList;
use crate::hardpoint::value::HardpointValue;

/* Anything with hardpoints. Implementors hold a HardpointList built from the
 * definitions for their type and hand it out; everything else has a default.
 */
pub trait HardpointObject : Send + Sync {
    fn hardpoint_list(&self) -> &HardpointList;
    fn as_any(&self) -> &dyn Any;

    fn describe(&self) -> String { std::any::type_name::<Self>().to_string() }

    fn has_hardpoint(&self, key: &str) -> bool { self.hardpoint_list().has_hardpoint(key) }

    fn has_attached_hardpoint(&self, key: &str) -> Result<bool,Error> {
        self.hardpoint_list().has_attached_hardpoint(key)
    }

    fn get_hardpoint(&self, key: &str) -> Result<HardpointValue,Error> {
        self.hardpoint_list().get_hardpoint(key).map_err(|e| self.annotate(e))
    }

    fn attach_hardpoint(&self, key: &str, value: HardpointValue) -> Result<(),Error> {
        self.hardpoint_list().attach_hardpoint(key,value).map_err(|e| self.annotate(e))
    }

    fn merge_hardpoint(&self, key: &str, value: HardpointValue) -> Result<(),Error> {
        self.hardpoint_list().merge_hardpoint(key,value).map_err(|e| self.annotate(e))
    }

    fn set_hardpoint_value(&self, key: &str, value: HardpointValue) -> Result<(),Error> {
        self.hardpoint_list().set_hardpoint_value(key,value).map_err(|e| self.annotate(e))
    }

    fn annotate(&self, mut error: Error) -> Error {
        error.message = format!("{} (object of type {})",error.message,self.describe());
        error
    }
}

impl dyn HardpointObject {
    pub fn is<T: Any>(&self) -> bool { self.as_any().is::<T>() }
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> { self.as_any().downcast_ref::<T>() }

    /* Fetch an attached scalar of a known type */
    pub fn get_scalar<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>,Error> {
        self.get_hardpoint(key)?.get::<T>().ok_or_else(|| {
            self.annotate(Error::config(&format!("hardpoint \"{}\" does not hold a {}",key,std::any::type_name::<T>())))
        })
    }

    pub fn get_vector<T: Any + Send + Sync>(&self, key: &str) -> Result<Vec<Arc<T>>,Error> {
        Ok(self.get_hardpoint(key)?.items_of::<T>())
    }
}

/* Objects handed to the engine, keyed by caller-chosen names */
pub type ObjectMap = BTreeMap<String,Arc<dyn HardpointObject>>;

pub fn object_map<I,K>(objects: I) -> ObjectMap where I: IntoIterator<Item=(K,Arc<dyn HardpointObject>)>, K: ToString {
    objects.into_iter().map(|(k,v)| (k.to_string(),v)).collect()
}
