use std::collections::BTreeMap;
use std::sync::Mutex;
use hashbrown::HashMap;
use hardpoint_toolkit::{ Error, identitynumber, lock };
use crate::hardpoint::hardpoint::Hardpoint;
use crate::hardpoint::value::HardpointValue;

identitynumber!(LIST_IDENTITY);

/* A HardpointList is the per-object store behind HardpointObject: the
 * definitions the object declares and the values attached so far. Values
 * live behind a mutex so that shared objects can be filled in by the engine.
 *
 * Every list has its own identity. The engine uses it to recognise an object
 * across requests. Cloning gives a new identity.
 */
pub struct HardpointList {
    identity: u64,
    hardpoints: BTreeMap<String,Hardpoint>,
    values: Mutex<HashMap<String,HardpointValue>>
}

impl HardpointList {
    pub fn new(hardpoints: Vec<Hardpoint>) -> Result<HardpointList,Error> {
        let mut map = BTreeMap::new();
        for (index,hardpoint) in hardpoints.into_iter().enumerate() {
            if hardpoint.key().is_empty() {
                return Err(Error::config(&format!("hardpoint at index {} has no key; every hardpoint needs a non-empty key",index)));
            }
            if map.contains_key(hardpoint.key()) {
                return Err(Error::config(&format!("hardpoint at index {} has key \"{}\", which is already in use; keys must be unique",index,hardpoint.key())));
            }
            map.insert(hardpoint.key().to_string(),hardpoint);
        }
        Ok(HardpointList {
            identity: LIST_IDENTITY.next(),
            hardpoints: map,
            values: Mutex::new(HashMap::new())
        })
    }

    pub fn identity(&self) -> u64 { self.identity }

    pub fn has_hardpoint(&self, key: &str) -> bool { self.hardpoints.contains_key(key) }
    pub fn get_hardpoints(&self) -> impl Iterator<Item=&Hardpoint> { self.hardpoints.values() }

    pub fn get_hardpoint_definition(&self, key: &str) -> Result<&Hardpoint,Error> {
        self.hardpoints.get(key).ok_or_else(|| {
            Error::config(&format!("no hardpoint \"{}\"; hardpoints are: {}",key,self.get_hardpoint_list_for_display()))
        })
    }

    pub fn has_attached_hardpoint(&self, key: &str) -> Result<bool,Error> {
        self.get_hardpoint_definition(key)?;
        Ok(lock!(self.values).contains_key(key))
    }

    pub fn get_hardpoint(&self, key: &str) -> Result<HardpointValue,Error> {
        self.get_hardpoint_definition(key)?;
        lock!(self.values).get(key).cloned().ok_or_else(|| {
            Error::config(&format!("hardpoint \"{}\" has not been attached yet; request it from the engine before reading it",key))
        })
    }

    fn check_kind(&self, key: &str, value: &HardpointValue) -> Result<(),Error> {
        let definition = self.get_hardpoint_definition(key)?;
        if definition.is_vector() != value.is_vector() {
            let want = if definition.is_vector() { "vector" } else { "scalar" };
            return Err(Error::config(&format!("hardpoint \"{}\" is a {} hardpoint but was given a {:?} value",key,want,value)));
        }
        Ok(())
    }

    /* Overwrite, attached or not */
    pub fn set_hardpoint_value(&self, key: &str, value: HardpointValue) -> Result<(),Error> {
        self.check_kind(key,&value)?;
        lock!(self.values).insert(key.to_string(),value);
        Ok(())
    }

    pub fn attach_hardpoint(&self, key: &str, value: HardpointValue) -> Result<(),Error> {
        self.check_kind(key,&value)?;
        let mut values = lock!(self.values);
        if values.contains_key(key) {
            return Err(Error::config(&format!("hardpoint \"{}\" is already attached",key)));
        }
        values.insert(key.to_string(),value);
        Ok(())
    }

    pub fn merge_hardpoint(&self, key: &str, value: HardpointValue) -> Result<(),Error> {
        let definition = self.get_hardpoint_definition(key)?;
        let mut values = lock!(self.values);
        let merged = match values.get(key) {
            Some(old) => definition.merge_values(old,value)?,
            None => definition.merge_values(&HardpointValue::empty_vector(),value)?
        };
        values.insert(key.to_string(),merged);
        Ok(())
    }

    pub fn get_hardpoint_list_for_display(&self) -> String {
        if self.hardpoints.is_empty() { return "<none>".to_string(); }
        self.hardpoints.keys().map(|k| format!("\"{}\"",k)).collect::<Vec<_>>().join(", ")
    }
}

impl Clone for HardpointList {
    fn clone(&self) -> HardpointList {
        HardpointList {
            identity: LIST_IDENTITY.next(),
            hardpoints: self.hardpoints.clone(),
            values: Mutex::new(lock!(self.values).clone())
        }
    }
}
