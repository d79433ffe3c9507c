//! Configuration types for the DDK system
//!
//! This module defines the configuration structures consumed by the core.
//! Reading them from disk is the daemon's job; the types deserialize from
//! any serde format, the daemon uses TOML:
//!
//! ```toml
//! [global]
//! check_interval_seconds = 60
//!
//! [[record]]
//! domain_registrar = "aliyun"
//! ip_address_from_cmd = "curl -s https://api.ipify.org"
//! ip_address_on_update_cmd = "notify ${IP_ADDRESS}"
//! [record.api_param]
//! key_id = "..."
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{Error, Result};

/// Poll interval used when the configured one is absent or non-positive
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;

/// Main DDK configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DdkConfig {
    /// Process-wide settings
    #[serde(default)]
    pub global: GlobalConfig,

    /// Records to keep in sync, one worker each
    #[serde(rename = "record", default)]
    pub records: Vec<RecordConfig>,
}

impl DdkConfig {
    /// Validate the configuration as a whole
    ///
    /// Individual records are checked by [`RecordConfig::validate`] when
    /// their worker is built, so one bad record never rejects the file.
    pub fn validate(&self) -> Result<()> {
        if self.records.is_empty() {
            return Err(Error::config("No records configured"));
        }
        Ok(())
    }
}

/// The `[global]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Informational config schema version
    #[serde(default)]
    pub api_version: Option<String>,

    /// Seconds to wait before the post-startup command and the first tick
    #[serde(default)]
    pub post_up_wait: i64,

    /// `;`-separated commands run once after the startup wait
    #[serde(default)]
    pub post_up_cmd: Option<String>,

    /// Poll interval in seconds (non-positive means default)
    #[serde(default)]
    pub check_interval_seconds: i64,
}

impl GlobalConfig {
    /// Effective poll interval
    pub fn check_interval(&self) -> Duration {
        match u64::try_from(self.check_interval_seconds) {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
        }
    }

    /// Startup wait, if one is configured
    pub fn post_up_wait(&self) -> Option<Duration> {
        u64::try_from(self.post_up_wait)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Startup command sequence, if one is configured
    pub fn post_up_cmd(&self) -> Option<&str> {
        non_blank(self.post_up_cmd.as_deref())
    }
}

/// One `[[record]]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Registrar name used to pick the updater (e.g. "aliyun", "cloudflare")
    #[serde(default)]
    pub domain_registrar: String,

    /// Command whose output is the current address
    #[serde(default)]
    pub ip_address_from_cmd: String,

    /// Hook template run after a first-seen change; `${IP_ADDRESS}` is substituted
    #[serde(default)]
    pub ip_address_on_update_cmd: Option<String>,

    /// Provider parameters, passed through to the updater factory
    #[serde(default)]
    pub api_param: ApiParams,
}

impl RecordConfig {
    /// Create a new record configuration
    pub fn new(registrar: impl Into<String>, ip_cmd: impl Into<String>) -> Self {
        Self {
            domain_registrar: registrar.into(),
            ip_address_from_cmd: ip_cmd.into(),
            ip_address_on_update_cmd: None,
            api_param: ApiParams::default(),
        }
    }

    /// Set the on-update hook template
    pub fn with_on_update(mut self, template: impl Into<String>) -> Self {
        self.ip_address_on_update_cmd = Some(template.into());
        self
    }

    /// Add one provider parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.api_param.insert(key, value);
        self
    }

    /// Hook template, ignoring blank values
    pub fn hook_template(&self) -> Option<&str> {
        non_blank(self.ip_address_on_update_cmd.as_deref())
    }

    /// Validate the fields the core itself relies on
    pub fn validate(&self) -> Result<()> {
        if self.domain_registrar.trim().is_empty() {
            return Err(Error::config("domain_registrar cannot be empty"));
        }
        if self.ip_address_from_cmd.trim().is_empty() {
            return Err(Error::config("ip_address_from_cmd cannot be empty"));
        }
        Ok(())
    }
}

/// Free-form provider parameters
///
/// Values keep whatever type the config format gave them; the accessors
/// coerce numeric and boolean strings so `record_ttl = "600"` and
/// `record_ttl = 600` are equivalent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiParams(BTreeMap<String, Value>);

impl ApiParams {
    /// Create an empty parameter map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw access to a parameter
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether a parameter is present
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Required non-blank string
    pub fn required_str(&self, key: &str) -> Result<String> {
        self.optional_str(key)?
            .ok_or_else(|| Error::missing_param(key))
    }

    /// Optional string; blank strings count as absent
    pub fn optional_str(&self, key: &str) -> Result<Option<String>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(Error::invalid_param(
                key,
                format!("expected a string, got {}", type_name(other)),
            )),
        }
    }

    /// Required integer, accepting numeric strings
    pub fn required_i64(&self, key: &str) -> Result<i64> {
        self.optional_i64(key)?
            .ok_or_else(|| Error::missing_param(key))
    }

    /// Optional integer, accepting numeric strings; blank strings count as absent
    pub fn optional_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| {
                Error::invalid_param(key, format!("{} is not an integer", n))
            }),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|e| {
                Error::invalid_param(key, format!("'{}' could not be parsed as an integer: {}", s, e))
            }),
            Some(other) => Err(Error::invalid_param(
                key,
                format!("expected an integer, got {}", type_name(other)),
            )),
        }
    }

    /// Optional positive number of seconds
    pub fn optional_secs(&self, key: &str) -> Result<Option<Duration>> {
        match self.optional_i64(key)? {
            None => Ok(None),
            Some(secs) => match u64::try_from(secs) {
                Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
                _ => Err(Error::invalid_param(key, "must be a positive number of seconds")),
            },
        }
    }

    /// Required boolean, accepting "true"/"false" strings
    pub fn required_bool(&self, key: &str) -> Result<bool> {
        self.optional_bool(key)?
            .ok_or_else(|| Error::missing_param(key))
    }

    /// Optional boolean, accepting "true"/"false" strings
    pub fn optional_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(Error::invalid_param(
                    key,
                    format!("'{}' could not be parsed as a boolean", s),
                )),
            },
            Some(other) => Err(Error::invalid_param(
                key,
                format!("expected a boolean, got {}", type_name(other)),
            )),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ApiParams
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a table",
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}
