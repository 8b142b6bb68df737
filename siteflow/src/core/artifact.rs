//! Artifact shapes exchanged through the shared context.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Compiled code published by the stylesheet and script stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleArtifact {
    /// The compiled code.
    pub code: String,
    /// Output path relative to the dist root (empty when no file was written).
    pub filename: String,
}

impl BundleArtifact {
    /// Creates a new bundle artifact.
    #[must_use]
    pub fn new(code: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            filename: filename.into(),
        }
    }
}

/// Localization tables published by the i18n stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleArtifact {
    /// Locale name to parsed table, plus a `default` entry naming the default locale.
    pub store: BTreeMap<String, serde_json::Value>,
    /// The global name the tables are exposed under in scripts.
    pub name: String,
    /// The name markup sees as `i18n.name`.
    pub html_name: String,
}

impl LocaleArtifact {
    /// The `i18n` template variable: the tables with the markup name.
    #[must_use]
    pub fn markup_vars(&self) -> serde_json::Value {
        serde_json::json!({"store": self.store, "name": self.html_name})
    }

    /// Renders the tables as a script declaration.
    #[must_use]
    pub fn to_script_banner(&self) -> String {
        let json = serde_json::to_string(&self.store).unwrap_or_else(|_| "{}".to_string());
        format!("const {} = {json};", self.name)
    }
}

/// Raw vector markup keyed by `svg-<file stem>`.
pub type VectorArtifact = BTreeMap<String, String>;
