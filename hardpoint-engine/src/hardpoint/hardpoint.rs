use std::sync::Arc;
use hashbrown::HashSet;
use hardpoint_toolkit::Error;
use crate::hardpoint::value::{ HardpointValue, Value };

pub type IdentityFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/* How new items join an attached vector */
#[derive(Clone)]
pub enum MergeRule {
    Append,
    Deduplicate(IdentityFn)
}

#[derive(Clone)]
pub enum HardpointKind {
    Scalar,
    Vector(MergeRule)
}

/* A Hardpoint is the definition of a named lazily-computed attribute. A
 * scalar can be written once. A vector can be written to many times, new
 * values merging into the old.
 */
#[derive(Clone)]
pub struct Hardpoint {
    key: String,
    kind: HardpointKind
}

impl Hardpoint {
    pub fn scalar(key: &str) -> Hardpoint {
        Hardpoint { key: key.to_string(), kind: HardpointKind::Scalar }
    }

    pub fn vector(key: &str) -> Hardpoint {
        Hardpoint { key: key.to_string(), kind: HardpointKind::Vector(MergeRule::Append) }
    }

    /* Items with an identity already in the vector are dropped on merge. */
    pub fn vector_by<F>(key: &str, identity: F) -> Hardpoint where F: Fn(&Value) -> String + Send + Sync + 'static {
        Hardpoint { key: key.to_string(), kind: HardpointKind::Vector(MergeRule::Deduplicate(Arc::new(identity))) }
    }

    /* Same behaviour as an existing definition, under a new key */
    pub fn from_template(key: &str, template: &Hardpoint) -> Hardpoint {
        Hardpoint { key: key.to_string(), kind: template.kind.clone() }
    }

    pub fn key(&self) -> &str { &self.key }
    pub fn kind(&self) -> &HardpointKind { &self.kind }
    pub fn is_vector(&self) -> bool { matches!(self.kind,HardpointKind::Vector(_)) }

    pub fn merge_values(&self, old: &HardpointValue, new: HardpointValue) -> Result<HardpointValue,Error> {
        let rule = match &self.kind {
            HardpointKind::Vector(rule) => rule,
            HardpointKind::Scalar => {
                return Err(Error::config(&format!("hardpoint \"{}\" is a scalar and values can not be merged into it",self.key)));
            }
        };
        let mut out = old.items().to_vec();
        match rule {
            MergeRule::Append => {
                out.extend(new.items().iter().cloned());
            },
            MergeRule::Deduplicate(identity) => {
                let mut seen = out.iter().map(|v| identity(v)).collect::<HashSet<_>>();
                for item in new.items() {
                    if seen.insert(identity(item)) {
                        out.push(item.clone());
                    }
                }
            }
        }
        Ok(HardpointValue::Vector(out))
    }
}

#[cfg(test)]
mod test {
    use crate::hardpoint::value::value;
    use super::*;

    fn strings(v: &HardpointValue) -> Vec<String> {
        v.items_of::<String>().iter().map(|x| x.to_string()).collect()
    }

    fn by_string(v: &Value) -> String {
        v.downcast_ref::<String>().cloned().unwrap_or_default()
    }

    #[test]
    pub fn test_append() {
        let hp = Hardpoint::vector("refs");
        let old = HardpointValue::vector(vec!["a".to_string()]);
        let merged = hp.merge_values(&old,HardpointValue::vector(vec!["a".to_string(),"b".to_string()])).ok().unwrap();
        assert_eq!(vec!["a","a","b"],strings(&merged));
    }

    #[test]
    pub fn test_deduplicate() {
        let hp = Hardpoint::vector_by("refs",by_string);
        let old = HardpointValue::vector(vec!["a".to_string(),"b".to_string()]);
        let new = HardpointValue::Vector(vec![value("b".to_string()),value("c".to_string()),value("c".to_string())]);
        let merged = hp.merge_values(&old,new).ok().unwrap();
        assert_eq!(vec!["a","b","c"],strings(&merged));
    }

    #[test]
    pub fn test_scalar_does_not_merge() {
        let hp = Hardpoint::scalar("name");
        assert!(!hp.is_vector());
        assert!(hp.merge_values(&HardpointValue::scalar(1),HardpointValue::scalar(2)).is_err());
    }

    #[test]
    pub fn test_template() {
        let hp = Hardpoint::from_template("more-refs",&Hardpoint::vector_by("refs",by_string));
        assert_eq!("more-refs",hp.key());
        let merged = hp.merge_values(&HardpointValue::empty_vector(),HardpointValue::vector(vec!["x".to_string(),"x".to_string()])).ok().unwrap();
        assert_eq!(1,merged.len());
    }
}
