//! Site configuration.

use crate::core::Environment;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

/// Default source root, relative to the working directory.
pub const DEFAULT_SRC: &str = "src";

/// Default output root, relative to the working directory.
pub const DEFAULT_DIST: &str = "dist";

/// Top-level keys that are not stage keys.
const RESERVED_KEYS: [&str; 5] = ["src", "dist", "env", "stageTimeoutSecs", "constructionErrors"];

/// What to do when a stage cannot be constructed from its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructionPolicy {
    /// Log the error, record it in the report and run without the stage (default).
    #[default]
    Skip,
    /// Abort the run with a configuration error.
    Fail,
}

/// The configuration value of one stage key.
#[derive(Debug, Clone, PartialEq)]
pub enum StageValue {
    /// `false`, `null` or absent.
    Disabled,
    /// `true`: kind defaults.
    Defaults,
    /// An options object merged onto kind defaults.
    Options(Map<String, Value>),
    /// Any other scalar; rejected at construction.
    Other(Value),
}

impl StageValue {
    /// Classifies a JSON value.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null | Value::Bool(false) => Self::Disabled,
            Value::Bool(true) => Self::Defaults,
            Value::Object(map) => Self::Options(map.clone()),
            other => Self::Other(other.clone()),
        }
    }

    /// Returns true if the value asks for the stage to run.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Returns true if the value is an activation attempt for an unknown key:
    /// `true` or a non-null object.
    #[must_use]
    pub fn is_activation(&self) -> bool {
        matches!(self, Self::Defaults | Self::Options(_))
    }
}

/// A single build configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Source root.
    pub src: PathBuf,
    /// Output root.
    pub dist: PathBuf,
    /// Build environment.
    pub env: Environment,
    /// Optional per-stage timeout.
    pub stage_timeout: Option<Duration>,
    /// Handling of stage construction errors.
    pub construction_errors: ConstructionPolicy,
    /// Stage keys and their values, in configuration order.
    pub stages: Vec<(String, StageValue)>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            src: PathBuf::from(DEFAULT_SRC),
            dist: PathBuf::from(DEFAULT_DIST),
            env: Environment::default(),
            stage_timeout: None,
            construction_errors: ConstructionPolicy::default(),
            stages: Vec::new(),
        }
    }
}

impl SiteConfig {
    /// Creates a configuration with the given roots and no stages.
    ///
    /// The environment comes from [`Environment::from_process`].
    #[must_use]
    pub fn new(src: impl Into<PathBuf>, dist: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            dist: dist.into(),
            env: Environment::from_process(),
            ..Self::default()
        }
    }

    /// Parses a configuration object.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not an object or a reserved key has the
    /// wrong type.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let map = value
            .as_object()
            .ok_or_else(|| ConfigError::new("configuration must be a JSON object"))?;

        let src = optional_path(map, "src")?.unwrap_or_else(|| PathBuf::from(DEFAULT_SRC));
        let dist = optional_path(map, "dist")?.unwrap_or_else(|| PathBuf::from(DEFAULT_DIST));

        let env = match map.get("env") {
            None | Some(Value::Null) => Environment::from_process(),
            Some(Value::String(name)) => Environment::parse(name),
            Some(other) => {
                return Err(ConfigError::new(format!("`env` must be a string, found {other}")))
            }
        };

        let stage_timeout = match map.get("stageTimeoutSecs") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let secs = value
                    .as_f64()
                    .filter(|s| s.is_finite() && *s > 0.0)
                    .ok_or_else(|| {
                        ConfigError::new(format!(
                            "`stageTimeoutSecs` must be a positive number, found {value}"
                        ))
                    })?;
                Some(Duration::from_secs_f64(secs))
            }
        };

        let construction_errors = match map.get("constructionErrors") {
            None | Some(Value::Null) => ConstructionPolicy::default(),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                ConfigError::new(format!("invalid `constructionErrors`: {e}"))
            })?,
        };

        let stages = map
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), StageValue::from_value(value)))
            .collect();

        Ok(Self {
            src,
            dist,
            env,
            stage_timeout,
            construction_errors,
            stages,
        })
    }

    /// Loads a configuration file holding one object or an array of objects.
    ///
    /// Nested arrays are flattened.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_all(path: &std::path::Path) -> Result<Vec<Self>, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::new(format!("cannot read configuration: {e}")).with_path(path)
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|e| {
            ConfigError::new(format!("invalid configuration JSON: {e}")).with_path(path)
        })?;
        Self::flatten(&value)
    }

    /// Flattens an object or arbitrarily nested arrays of objects into configurations.
    ///
    /// # Errors
    ///
    /// Returns the first element that is not a valid configuration object.
    pub fn flatten(value: &Value) -> Result<Vec<Self>, ConfigError> {
        let mut out = Vec::new();
        flatten_into(value, &mut out)?;
        Ok(out)
    }

    /// Sets the environment.
    #[must_use]
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Sets the per-stage timeout.
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = Some(timeout);
        self
    }

    /// Sets the construction error policy.
    #[must_use]
    pub fn with_construction_errors(mut self, policy: ConstructionPolicy) -> Self {
        self.construction_errors = policy;
        self
    }

    /// Adds or replaces a stage key.
    #[must_use]
    pub fn with_stage(mut self, key: impl Into<String>, value: &Value) -> Self {
        let key = key.into();
        let value = StageValue::from_value(value);
        if let Some(entry) = self.stages.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.stages.push((key, value));
        }
        self
    }
}

fn flatten_into(value: &Value, out: &mut Vec<SiteConfig>) -> Result<(), ConfigError> {
    match value {
        Value::Array(items) => items.iter().try_for_each(|item| flatten_into(item, out)),
        other => {
            out.push(SiteConfig::from_value(other)?);
            Ok(())
        }
    }
}

fn optional_path(map: &Map<String, Value>, key: &str) -> Result<Option<PathBuf>, ConfigError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if !s.is_empty() => Ok(Some(PathBuf::from(s))),
        Some(other) => Err(ConfigError::new(format!(
            "`{key}` must be a non-empty path string, found {other}"
        ))),
    }
}
