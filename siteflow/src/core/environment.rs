//! Build environment policy.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Environment variable consulted when a configuration has no `env`.
pub const ENV_VAR: &str = "SITEFLOW_ENV";

/// How the formatting pass treats compiled output by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStyle {
    /// Human-readable output.
    Readable,
    /// Minified output.
    Minified,
    /// Compiled output left as-is.
    Raw,
}

/// The build environment.
///
/// Every stage consults it read-only. Values other than `development` and
/// `production` keep their name and behave like production for missing
/// inputs, but leave compiled output unformatted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    /// Scaffolds missing inputs and prefers readable output.
    #[default]
    Development,
    /// Fails on missing inputs and minifies output.
    Production,
    /// Any other value.
    Other(String),
}

impl Environment {
    /// Parses an environment name.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "development" => Self::Development,
            "production" => Self::Production,
            other => Self::Other(other.to_string()),
        }
    }

    /// Reads the environment from [`ENV_VAR`], defaulting to development.
    #[must_use]
    pub fn from_process() -> Self {
        std::env::var(ENV_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map_or_else(Self::default, |v| Self::parse(v.trim()))
    }

    /// Returns the environment name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Other(name) => name,
        }
    }

    /// Returns true in development.
    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Returns true in production.
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Returns true if missing inputs should be scaffolded with stubs.
    #[must_use]
    pub fn scaffolds(&self) -> bool {
        self.is_development()
    }

    /// Returns true if code outputs (scripts, stylesheets) are minified.
    #[must_use]
    pub fn minifies(&self) -> bool {
        self.is_production()
    }

    /// Returns the default formatting of compiled markup.
    #[must_use]
    pub fn output_style(&self) -> OutputStyle {
        match self {
            Self::Development => OutputStyle::Readable,
            Self::Production => OutputStyle::Minified,
            Self::Other(_) => OutputStyle::Raw,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Environment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::parse(&name))
    }
}
