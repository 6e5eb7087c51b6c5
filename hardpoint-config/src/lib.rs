use hashbrown::HashMap;
use std::hash::Hash;
use std::fmt::{ self, Debug };

#[derive(Clone,Debug,PartialEq,Eq,Hash)]
pub enum ConfigError {
    UnknownConfigKey(String),
    UninitialisedKey(String),
    BadConfigValue(String,String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownConfigKey(key) => write!(f,"unknown setting '{}'",key),
            ConfigError::UninitialisedKey(key) => write!(f,"setting '{}' has no value",key),
            ConfigError::BadConfigValue(key,why) => write!(f,"bad value for '{}': {}",key,why)
        }
    }
}

/* Values parse themselves from text. The default for a key is asked to parse
 * so that one value type can hold differently typed settings.
 */
pub trait ConfigValue : Sized {
    fn parse(&self, value_str: &str) -> Result<Self,String>;
}

pub struct ConfigKeyInfo<'a,K,V> {
    pub key: K,
    pub name: &'a str,
    pub default: &'a V
}

pub struct Config<'a,K,V> where K: PartialEq+Eq+Hash, V: ConfigValue + Clone {
    str_to_key: HashMap<String,K>,
    key_to_str: HashMap<K,String>,
    defaults: HashMap<K,&'a V>,
    values: HashMap<K,V>
}

impl<'a,K: Debug+Clone+PartialEq+Eq+Hash, V: ConfigValue+Clone> Config<'a,K,V> {
    pub fn new(info: &[ConfigKeyInfo<'a,K,V>]) -> Config<'a,K,V> {
        let mut str_to_key = HashMap::new();
        let mut key_to_str = HashMap::new();
        let mut defaults = HashMap::new();
        for info in info.iter() {
            str_to_key.insert(info.name.to_string(),info.key.clone());
            key_to_str.insert(info.key.clone(),info.name.to_string());
            defaults.insert(info.key.clone(),info.default);
        }
        Config {
            str_to_key,
            key_to_str,
            defaults,
            values: HashMap::new()
        }
    }

    pub fn set(&mut self, key_str: &str, value_str: &str) -> Result<(),ConfigError> {
        let key = self.str_to_key.get(key_str).ok_or_else(|| {
            ConfigError::UnknownConfigKey(key_str.to_string())
        })?;
        let default = self.defaults.get(key).ok_or_else(|| {
            ConfigError::UninitialisedKey(key_str.to_string())
        })?;
        let value = default.parse(value_str).map_err(|e| {
            ConfigError::BadConfigValue(key_str.to_string(),e)
        })?;
        self.values.insert(key.clone(),value);
        Ok(())
    }

    pub fn set_all(&mut self, settings: &[(&str,&str)]) -> Result<(),ConfigError> {
        for (key,value) in settings {
            self.set(key,value)?;
        }
        Ok(())
    }

    pub fn name(&self, key: &K) -> Option<&str> { self.key_to_str.get(key).map(|x| x.as_str()) }

    pub fn try_get(&self, key: &K) -> Option<&V> {
        if let Some(v) = self.values.get(key) { return Some(v); }
        if let Some(v) = self.defaults.get(key) { return Some(v); }
        None
    }

    pub fn get(&self, key: &K) -> Result<&V,ConfigError> {
        if let Some(v) = self.try_get(key) { return Ok(v); }
        Err(ConfigError::UninitialisedKey(format!("{:?}",key)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Clone,Debug,PartialEq,Eq,Hash)]
    enum TestKey { Width, Label, Missing }

    #[derive(Clone,Debug,PartialEq)]
    enum TestValue { Number(u32), Text(String) }

    impl ConfigValue for TestValue {
        fn parse(&self, value_str: &str) -> Result<TestValue,String> {
            match self {
                TestValue::Number(_) => value_str.parse().map(TestValue::Number).map_err(|e| format!("{}",e)),
                TestValue::Text(_) => Ok(TestValue::Text(value_str.to_string()))
            }
        }
    }

    static WIDTH : TestValue = TestValue::Number(3);
    static LABEL : TestValue = TestValue::Text(String::new());

    fn config() -> Config<'static,TestKey,TestValue> {
        Config::new(&[
            ConfigKeyInfo { key: TestKey::Width, name: "width", default: &WIDTH },
            ConfigKeyInfo { key: TestKey::Label, name: "label", default: &LABEL },
        ])
    }

    #[test]
    pub fn test_defaults_and_set() {
        let mut config = config();
        assert_eq!(&TestValue::Number(3),config.get(&TestKey::Width).ok().unwrap());
        config.set_all(&[("width","7"),("label","hi")]).ok().unwrap();
        assert_eq!(&TestValue::Number(7),config.get(&TestKey::Width).ok().unwrap());
        assert_eq!(&TestValue::Text("hi".to_string()),config.get(&TestKey::Label).ok().unwrap());
        assert_eq!(Some("width"),config.name(&TestKey::Width));
    }

    #[test]
    pub fn test_errors() {
        let mut config = config();
        assert_eq!(Err(ConfigError::UnknownConfigKey("height".to_string())),config.set("height","1"));
        match config.set("width","wide") {
            Err(ConfigError::BadConfigValue(k,_)) => { assert_eq!("width",k); },
            _ => { assert!(false); }
        }
        assert_eq!(&TestValue::Number(3),config.get(&TestKey::Width).ok().unwrap());
        assert!(config.get(&TestKey::Missing).is_err());
    }
}
