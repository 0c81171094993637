//! Engine configuration.
//!
//! [`EngineConfig`] holds the few knobs the engine has. It can be built in
//! code, loaded from layered [`ConfigSource`]s (environment variables,
//! in-memory maps) or, with the `config` feature, deserialized from JSON.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};

/// What happens when a type is bound twice in the same pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum RebindPolicy {
    /// Last registration wins; a warning is logged
    #[default]
    Overwrite,
    /// `build()` fails with `AlreadyBound`
    Reject,
}

impl FromStr for RebindPolicy {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(RebindPolicy::Overwrite),
            "reject" => Ok(RebindPolicy::Reject),
            other => Err(PoolError::Config(format!("unknown rebind policy: {other}"))),
        }
    }
}

/// A raw configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl ConfigValue {
    /// Parses text the way environment values are interpreted: integer,
    /// then float, then boolean, otherwise a string.
    pub fn parse(raw: &str) -> Self {
        if let Ok(i) = raw.parse::<i64>() {
            ConfigValue::Integer(i)
        } else if let Ok(f) = raw.parse::<f64>() {
            ConfigValue::Float(f)
        } else if let Ok(b) = raw.parse::<bool>() {
            ConfigValue::Boolean(b)
        } else {
            ConfigValue::String(raw.to_string())
        }
    }

    pub fn as_str(&self) -> PoolResult<&str> {
        match self {
            ConfigValue::String(s) => Ok(s),
            other => Err(mismatch("a string", other)),
        }
    }

    pub fn as_i64(&self) -> PoolResult<i64> {
        match self {
            ConfigValue::Integer(i) => Ok(*i),
            other => Err(mismatch("an integer", other)),
        }
    }

    pub fn as_usize(&self) -> PoolResult<usize> {
        let i = self.as_i64()?;
        usize::try_from(i).map_err(|_| PoolError::Config(format!("{i} is not a valid size")))
    }

    pub fn as_bool(&self) -> PoolResult<bool> {
        match self {
            ConfigValue::Boolean(b) => Ok(*b),
            other => Err(mismatch("a boolean", other)),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => f.write_str(s),
            ConfigValue::Integer(i) => write!(f, "{i}"),
            ConfigValue::Float(x) => write!(f, "{x}"),
            ConfigValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

fn mismatch(expected: &str, found: &ConfigValue) -> PoolError {
    PoolError::Config(format!("expected {expected}, found {found:?}"))
}

/// A source of configuration values keyed by lowercase names.
pub trait ConfigSource: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Option<ConfigValue>;

    fn keys(&self) -> Vec<String>;
}

/// Environment variables, optionally filtered by a prefix.
///
/// With prefix `APP`, key `rebind` reads `APP_REBIND`.
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn var_name(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.var_name(key)).ok().map(|raw| ConfigValue::parse(&raw))
    }

    fn keys(&self) -> Vec<String> {
        let prefix = self.prefix.as_ref().map(|p| format!("{}_", p.to_uppercase()));
        env::vars()
            .filter_map(|(name, _)| match &prefix {
                Some(prefix) => name.strip_prefix(prefix.as_str()).map(str::to_lowercase),
                None => Some(name.to_lowercase()),
            })
            .collect()
    }
}

/// In-memory source, handy for tests and for values computed at startup.
#[derive(Debug, Default, Clone)]
pub struct MapConfigSource {
    values: HashMap<String, ConfigValue>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.values.insert(key.into().to_lowercase(), value);
        self
    }
}

impl ConfigSource for MapConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(&key.to_lowercase()).cloned()
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Engine settings applied when the application is built.
///
/// # Examples
///
/// ```
/// use ferrous_scope::{ConfigValue, EngineConfig, MapConfigSource, RebindPolicy};
///
/// let overrides = MapConfigSource::new()
///     .set("rebind", ConfigValue::String("reject".into()))
///     .set("recycle_capacity", ConfigValue::Integer(8));
///
/// let config = EngineConfig::load(&[&overrides]).unwrap();
/// assert_eq!(config.rebind, RebindPolicy::Reject);
/// assert_eq!(config.recycle_capacity, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct EngineConfig {
    pub rebind: RebindPolicy,
    /// Maximum idle instances kept per recycled binding, 0 disables recycling
    pub recycle_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rebind: RebindPolicy::Overwrite,
            recycle_capacity: Self::DEFAULT_RECYCLE_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub const ENV_PREFIX: &'static str = "FERROUS_SCOPE";
    pub const DEFAULT_RECYCLE_CAPACITY: usize = 64;

    /// Defaults overridden by `FERROUS_SCOPE_*` environment variables.
    pub fn from_env() -> PoolResult<Self> {
        Self::load(&[&EnvironmentConfigSource::with_prefix(Self::ENV_PREFIX)])
    }

    /// Defaults overridden by `sources`; earlier sources take priority.
    pub fn load(sources: &[&dyn ConfigSource]) -> PoolResult<Self> {
        let lookup = |key: &str| sources.iter().find_map(|source| source.get(key));
        let mut config = Self::default();

        if let Some(value) = lookup("rebind") {
            config.rebind = value.as_str()?.parse()?;
        }
        if let Some(value) = lookup("recycle_capacity") {
            config.recycle_capacity = value.as_usize()?;
        }
        Ok(config)
    }

    /// Parses a JSON object; missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> PoolResult<Self> {
        serde_json::from_str(json).map_err(|err| PoolError::Config(err.to_string()))
    }
}
