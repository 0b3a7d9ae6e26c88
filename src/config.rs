//! Configuration repository consumed by contextual `give_config` bindings.
//!
//! A [`ConfigRepository`] layers [`ConfigSource`]s in priority order and
//! answers dotted-path lookups (`"database.connections.primary"`). Bind it
//! into the container under `Key::of::<ConfigRepository>()` so contextual
//! bindings can read it.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use parking_lot::RwLock;
#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};
use crate::key::Key;

/// A configuration value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(untagged))]
pub enum ConfigValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<ConfigValue>),
    Object(HashMap<String, ConfigValue>),
}

fn mismatch(path: &str, expected: &'static str) -> DiError {
    DiError::TypeMismatch {
        key: Key::named(format!("config:{}", path)),
        expected,
    }
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    /// Follows a dotted path through nested objects.
    pub fn lookup(&self, path: &str) -> Option<&ConfigValue> {
        path.split('.').try_fold(self, |value, segment| match value {
            ConfigValue::Object(map) => map.get(segment),
            ConfigValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Parses an environment-style string into the narrowest value.
    fn parse_scalar(raw: String) -> ConfigValue {
        if let Ok(int_val) = raw.parse::<i64>() {
            ConfigValue::Integer(int_val)
        } else if let Ok(float_val) = raw.parse::<f64>() {
            ConfigValue::Float(float_val)
        } else if let Ok(bool_val) = raw.parse::<bool>() {
            ConfigValue::Boolean(bool_val)
        } else {
            ConfigValue::String(raw)
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Integer(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Boolean(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

/// A source of configuration values.
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Value at a dotted path.
    fn get(&self, path: &str) -> Option<ConfigValue>;

    /// Top-level keys this source knows about.
    fn keys(&self) -> Vec<String>;
}

/// In-memory configuration tree.
#[derive(Debug, Default)]
pub struct MemoryConfigSource {
    root: RwLock<HashMap<String, ConfigValue>>,
}

impl MemoryConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: HashMap<String, ConfigValue>) -> Self {
        Self {
            root: RwLock::new(values),
        }
    }

    /// Sets the value at a dotted path, creating intermediate objects.
    pub fn set(&self, path: &str, value: ConfigValue) {
        let mut root = self.root.write();
        let mut segments: Vec<&str> = path.split('.').collect();
        let last = match segments.pop() {
            Some(last) => last,
            None => return,
        };

        let mut map = &mut *root;
        for segment in segments {
            let entry = map
                .entry(segment.to_string())
                .or_insert_with(|| ConfigValue::Object(HashMap::new()));
            if !matches!(entry, ConfigValue::Object(_)) {
                *entry = ConfigValue::Object(HashMap::new());
            }
            map = match entry {
                ConfigValue::Object(inner) => inner,
                _ => return,
            };
        }
        map.insert(last.to_string(), value);
    }
}

impl ConfigSource for MemoryConfigSource {
    fn get(&self, path: &str) -> Option<ConfigValue> {
        let root = self.root.read();
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let value = root.get(head)?;
        match rest {
            Some(rest) => value.lookup(rest).cloned(),
            None => Some(value.clone()),
        }
    }

    fn keys(&self) -> Vec<String> {
        self.root.read().keys().cloned().collect()
    }
}

/// Environment variable configuration source.
///
/// `database.url` with prefix `app` reads `APP_DATABASE_URL`.
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

    fn variable(&self, path: &str) -> String {
        let name = path.replace('.', "_").to_uppercase();
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), name),
            None => name,
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, path: &str) -> Option<ConfigValue> {
        env::var(self.variable(path)).ok().map(ConfigValue::parse_scalar)
    }

    fn keys(&self) -> Vec<String> {
        env::vars()
            .filter_map(|(key, _)| match &self.prefix {
                Some(prefix) => {
                    let prefix = format!("{}_", prefix.to_uppercase());
                    key.strip_prefix(&prefix).map(str::to_lowercase)
                }
                None => Some(key.to_lowercase()),
            })
            .collect()
    }
}

/// Layered configuration, consulted in the order sources were added.
///
/// # Examples
///
/// ```
/// use ferrous_container::{ConfigRepository, ConfigValue, MemoryConfigSource};
///
/// let defaults = MemoryConfigSource::new();
/// defaults.set("cache.driver", "file".into());
/// defaults.set("cache.ttl", 60i64.into());
///
/// let config = ConfigRepository::new()
///     .with_source(MemoryConfigSource::new())
///     .with_source(defaults);
///
/// assert_eq!(config.get_string("cache.driver").unwrap(), "file");
/// assert_eq!(config.get_i64_or("cache.ttl", 5), 60);
/// assert_eq!(config.get_or("cache.size", ConfigValue::Integer(10)), ConfigValue::Integer(10));
/// ```
#[derive(Debug, Default)]
pub struct ConfigRepository {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source; earlier sources win.
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn add_source(&mut self, source: Box<dyn ConfigSource>) {
        self.sources.push(source);
    }

    /// Parses a JSON object into an in-memory source.
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> DiResult<Self> {
        let values: HashMap<String, ConfigValue> = serde_json::from_str(json)
            .map_err(|e| DiError::custom(format!("invalid JSON configuration: {}", e)))?;
        Ok(Self::new().with_source(MemoryConfigSource::from_map(values)))
    }

    pub fn get(&self, path: &str) -> Option<ConfigValue> {
        self.sources.iter().find_map(|source| source.get(path))
    }

    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn get_or(&self, path: &str, default: ConfigValue) -> ConfigValue {
        self.get(path).unwrap_or(default)
    }

    pub fn get_string(&self, path: &str) -> DiResult<String> {
        match self.get(path) {
            Some(ConfigValue::String(s)) => Ok(s),
            Some(_) => Err(mismatch(path, "string")),
            None => Err(DiError::EntryNotFound(Key::named(format!("config:{}", path)))),
        }
    }

    pub fn get_string_or(&self, path: &str, default: &str) -> String {
        self.get_string(path).unwrap_or_else(|_| default.to_string())
    }

    pub fn get_i64(&self, path: &str) -> DiResult<i64> {
        match self.get(path) {
            Some(value) => value.as_i64().ok_or_else(|| mismatch(path, "integer")),
            None => Err(DiError::EntryNotFound(Key::named(format!("config:{}", path)))),
        }
    }

    pub fn get_i64_or(&self, path: &str, default: i64) -> i64 {
        self.get_i64(path).unwrap_or(default)
    }

    pub fn get_bool(&self, path: &str) -> DiResult<bool> {
        match self.get(path) {
            Some(value) => value.as_bool().ok_or_else(|| mismatch(path, "boolean")),
            None => Err(DiError::EntryNotFound(Key::named(format!("config:{}", path)))),
        }
    }

    pub fn get_bool_or(&self, path: &str, default: bool) -> bool {
        self.get_bool(path).unwrap_or(default)
    }

    /// Duration from a millisecond count.
    pub fn get_duration_ms(&self, path: &str) -> DiResult<Duration> {
        let ms = self.get_i64(path)?;
        if ms < 0 {
            return Err(mismatch(path, "non-negative milliseconds"));
        }
        Ok(Duration::from_millis(ms as u64))
    }

    /// Top-level keys of every source, deduplicated.
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sources.iter().flat_map(|s| s.keys()).collect();
        keys.sort();
        keys.dedup();
        keys
    }
}
