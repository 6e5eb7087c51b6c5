use std::any::Any;
use std::fmt;
use std::sync::Arc;

/* Hardpoint values are whatever the queries produce. Objects know what type
 * to expect for each of their hardpoints and downcast.
 */
pub type Value = Arc<dyn Any + Send + Sync>;

pub fn value<T: Any + Send + Sync>(value: T) -> Value { Arc::new(value) }

#[derive(Clone)]
pub enum HardpointValue {
    Scalar(Value),
    Vector(Vec<Value>)
}

impl HardpointValue {
    pub fn scalar<T: Any + Send + Sync>(value: T) -> HardpointValue { HardpointValue::Scalar(Arc::new(value)) }

    pub fn vector<T: Any + Send + Sync>(items: Vec<T>) -> HardpointValue {
        HardpointValue::Vector(items.into_iter().map(value).collect())
    }

    pub fn empty_vector() -> HardpointValue { HardpointValue::Vector(vec![]) }

    pub fn is_vector(&self) -> bool { matches!(self,HardpointValue::Vector(_)) }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            HardpointValue::Scalar(v) => v.clone().downcast::<T>().ok(),
            HardpointValue::Vector(_) => None
        }
    }

    pub fn items(&self) -> &[Value] {
        match self {
            HardpointValue::Scalar(v) => std::slice::from_ref(v),
            HardpointValue::Vector(v) => v
        }
    }

    /* Items of the wrong type are skipped */
    pub fn items_of<T: Any + Send + Sync>(&self) -> Vec<Arc<T>> {
        self.items().iter().filter_map(|v| v.clone().downcast::<T>().ok()).collect()
    }

    pub fn len(&self) -> usize { self.items().len() }
    pub fn is_empty(&self) -> bool { self.items().is_empty() }
}

impl fmt::Debug for HardpointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardpointValue::Scalar(_) => write!(f,"Scalar(..)"),
            HardpointValue::Vector(v) => write!(f,"Vector({} items)",v.len())
        }
    }
}
