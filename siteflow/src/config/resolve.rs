//! Layered option resolution.

use super::StageValue;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Keys a user `path` override shadows in the defaults.
const DERIVED_PATH_KEYS: [&str; 2] = ["srcPath", "distPath"];

/// Merges user overrides onto kind defaults.
///
/// The merge is shallow: every key present in `overrides` replaces the
/// default wholesale. When the overrides set `path` without `srcPath` or
/// `distPath`, the kind's default `srcPath`/`distPath` are dropped so the
/// derived paths follow the user's `path`.
///
/// Non-object inputs are treated as empty objects, so the function is total.
#[must_use]
pub fn resolve_value(defaults: &Value, overrides: &Value) -> Value {
    let mut merged: Map<String, Value> = defaults.as_object().cloned().unwrap_or_default();

    let Some(overrides) = overrides.as_object() else {
        return Value::Object(merged);
    };

    if overrides.contains_key("path") {
        for key in DERIVED_PATH_KEYS {
            if !overrides.contains_key(key) {
                merged.remove(key);
            }
        }
    }

    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }

    Value::Object(merged)
}

/// Resolves a stage configuration value into typed options.
///
/// `true` yields the defaults unchanged; an object is merged onto them with
/// [`resolve_value`]. A disabled value also yields the defaults, since
/// disabled stages are never constructed.
///
/// # Errors
///
/// Returns the deserialization error if the merged object does not fit `T`,
/// or an error naming the value if it is neither boolean nor object.
pub fn resolve<T>(defaults: &T, value: &StageValue) -> Result<T, serde_json::Error>
where
    T: Serialize + DeserializeOwned,
{
    let base = serde_json::to_value(defaults)?;
    let merged = match value {
        StageValue::Disabled | StageValue::Defaults => base,
        StageValue::Options(map) => resolve_value(&base, &Value::Object(map.clone())),
        StageValue::Other(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected `true` or an options object, found {other}"
            )))
        }
    };
    serde_json::from_value(merged)
}
