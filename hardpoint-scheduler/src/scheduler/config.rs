use hardpoint_config::{ Config, ConfigError, ConfigKeyInfo, ConfigValue };

#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash)]
pub enum SchedulerSetting {
    ConcurrencyLimit,
    PollInterval
}

#[derive(Clone,Debug,PartialEq)]
pub enum SchedulerValue {
    Count(Option<usize>),
    Seconds(Option<f64>)
}

impl ConfigValue for SchedulerValue {
    fn parse(&self, value_str: &str) -> Result<SchedulerValue,String> {
        let value_str = value_str.trim();
        match self {
            SchedulerValue::Count(_) => {
                if value_str == "none" { return Ok(SchedulerValue::Count(None)); }
                let count = value_str.parse::<usize>().map_err(|e| e.to_string())?;
                Ok(SchedulerValue::Count(Some(count)))
            },
            SchedulerValue::Seconds(_) => {
                if value_str == "none" { return Ok(SchedulerValue::Seconds(None)); }
                let seconds = value_str.parse::<f64>().map_err(|e| e.to_string())?;
                if !seconds.is_finite() || seconds < 0. {
                    return Err(format!("'{}' is not a usable number of seconds",value_str));
                }
                Ok(SchedulerValue::Seconds(Some(seconds)))
            }
        }
    }
}

static NO_LIMIT : SchedulerValue = SchedulerValue::Count(None);
static NO_INTERVAL : SchedulerValue = SchedulerValue::Seconds(None);

/* How a scheduler runs. A limit of zero means no limit. */
#[derive(Clone,Debug,PartialEq)]
pub struct SchedulerConfig {
    limit: Option<usize>,
    poll_interval: Option<f64>
}

impl SchedulerConfig {
    pub fn new() -> SchedulerConfig {
        SchedulerConfig { limit: None, poll_interval: None }
    }

    pub fn from_settings(settings: &[(&str,&str)]) -> Result<SchedulerConfig,ConfigError> {
        let mut config = Config::new(&[
            ConfigKeyInfo { key: SchedulerSetting::ConcurrencyLimit, name: "concurrency-limit", default: &NO_LIMIT },
            ConfigKeyInfo { key: SchedulerSetting::PollInterval, name: "poll-interval", default: &NO_INTERVAL }
        ]);
        config.set_all(settings)?;
        let mut out = SchedulerConfig::new();
        if let SchedulerValue::Count(limit) = config.get(&SchedulerSetting::ConcurrencyLimit)? {
            out.set_limit(*limit);
        }
        if let SchedulerValue::Seconds(interval) = config.get(&SchedulerSetting::PollInterval)? {
            out.set_poll_interval(*interval);
        }
        Ok(out)
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> SchedulerConfig {
        self.set_limit(limit);
        self
    }

    pub fn with_poll_interval(mut self, interval: Option<f64>) -> SchedulerConfig {
        self.set_poll_interval(interval);
        self
    }

    pub fn set_limit(&mut self, limit: Option<usize>) { self.limit = limit.filter(|x| *x > 0); }
    pub fn set_poll_interval(&mut self, interval: Option<f64>) { self.poll_interval = interval.map(|x| x.max(0.)); }

    pub fn get_limit(&self) -> Option<usize> { self.limit }
    pub fn get_poll_interval(&self) -> Option<f64> { self.poll_interval }
}

impl Default for SchedulerConfig {
    fn default() -> SchedulerConfig { SchedulerConfig::new() }
}
