//! Error types for the siteflow pipeline.
//!
//! The taxonomy mirrors how a build can go wrong: configuration problems are
//! fatal to a run, construction problems are handled per stage according to
//! [`ConstructionPolicy`](crate::config::ConstructionPolicy), and runtime
//! problems abort the remaining stages of the run that raised them.

use crate::core::StageKind;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The main error type for siteflow operations.
#[derive(Debug, Error)]
pub enum SiteflowError {
    /// The configuration could not be resolved.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A stage failed while running.
    #[error("{0}")]
    Stage(#[from] StageError),

    /// Several independent pipelines failed.
    #[error("{0}")]
    Aggregate(#[from] AggregateError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SiteflowError {
    /// Flattens this error into the list of leaf errors it carries.
    #[must_use]
    pub fn into_errors(self) -> Vec<Self> {
        match self {
            Self::Aggregate(agg) => agg
                .errors
                .into_iter()
                .flat_map(Self::into_errors)
                .collect(),
            other => vec![other],
        }
    }
}

impl From<serde_json::Error> for SiteflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Error raised when a configuration cannot be turned into a runnable pipeline.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ConfigError {
    /// The error message.
    pub message: String,
    /// The offending path, if any.
    pub path: Option<PathBuf>,
    /// Additional context key-value pairs.
    pub context: HashMap<String, String>,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            context: HashMap::new(),
        }
    }

    /// Creates the error reported when a root folder is missing outside development.
    #[must_use]
    pub fn missing_root(role: &str, path: &Path) -> Self {
        Self::new(format!(
            "{role} folder does not exist: \"{}\"",
            path.display()
        ))
        .with_path(path)
        .with_context_entry("role", role)
    }

    /// Sets the offending path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a stage cannot be built from its configuration value.
#[derive(Debug, Clone, Error)]
pub enum StageConstructionError {
    /// The configuration key does not name a known stage.
    #[error("Unknown stage '{key}'")]
    UnknownStage {
        /// The configuration key.
        key: String,
    },

    /// The options did not deserialize into the stage's option type.
    #[error("Invalid options for stage '{kind}': {reason}")]
    InvalidOptions {
        /// The stage kind.
        kind: StageKind,
        /// Why the options were rejected.
        reason: String,
    },
}

impl StageConstructionError {
    /// Creates an unknown stage error.
    #[must_use]
    pub fn unknown(key: impl Into<String>) -> Self {
        Self::UnknownStage { key: key.into() }
    }

    /// Creates an invalid options error.
    #[must_use]
    pub fn invalid(kind: StageKind, reason: impl fmt::Display) -> Self {
        Self::InvalidOptions {
            kind,
            reason: reason.to_string(),
        }
    }
}

/// A failure of a single markup output within a stage run.
#[derive(Debug, Clone, Error)]
#[error("output '{output}': {message}")]
pub struct OutputFailure {
    /// The output name.
    pub output: String,
    /// What went wrong.
    pub message: String,
}

impl OutputFailure {
    /// Creates a new output failure.
    #[must_use]
    pub fn new(output: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            output: output.into(),
            message: message.to_string(),
        }
    }
}

/// Errors raised while a stage runs.
#[derive(Debug, Error)]
pub enum StageError {
    /// A required input is absent and the environment does not scaffold.
    #[error("{kind}: required input is missing: \"{}\"", path.display())]
    MissingInput {
        /// The stage kind.
        kind: StageKind,
        /// The missing path.
        path: PathBuf,
    },

    /// The stage options are not usable at runtime.
    #[error("{kind}: invalid option: {message}")]
    InvalidOptions {
        /// The stage kind.
        kind: StageKind,
        /// The reason.
        message: String,
    },

    /// An external transform failed.
    #[error("{kind}: transform failed: {source}")]
    Transform {
        /// The stage kind.
        kind: StageKind,
        /// The underlying transform error.
        #[source]
        source: TransformError,
    },

    /// Filesystem access failed.
    #[error("{kind}: IO error on \"{}\": {source}", path.display())]
    Io {
        /// The stage kind.
        kind: StageKind,
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The stage published into a namespace that was already populated.
    #[error("{kind}: namespace '{namespace}' was already published in this run")]
    ContextConflict {
        /// The stage kind.
        kind: StageKind,
        /// The namespace.
        namespace: String,
    },

    /// The stage did not finish in time.
    #[error("{kind}: timed out after {seconds}s")]
    Timeout {
        /// The stage kind.
        kind: StageKind,
        /// The configured timeout.
        seconds: f64,
    },

    /// One or more outputs of the stage failed.
    #[error("{kind}: {} output(s) failed: {}", failures.len(), join_failures(failures))]
    Outputs {
        /// The stage kind.
        kind: StageKind,
        /// The individual failures.
        failures: Vec<OutputFailure>,
    },
}

fn join_failures(failures: &[OutputFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl StageError {
    /// Creates a missing input error.
    #[must_use]
    pub fn missing(kind: StageKind, path: impl Into<PathBuf>) -> Self {
        Self::MissingInput {
            kind,
            path: path.into(),
        }
    }

    /// Creates an IO error.
    #[must_use]
    pub fn io(kind: StageKind, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            kind,
            path: path.into(),
            source,
        }
    }

    /// Creates a transform error.
    #[must_use]
    pub fn transform(kind: StageKind, source: TransformError) -> Self {
        Self::Transform { kind, source }
    }

    /// Creates an invalid options error.
    #[must_use]
    pub fn invalid(kind: StageKind, message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            kind,
            message: message.into(),
        }
    }

    /// Returns the stage that raised this error.
    #[must_use]
    pub fn kind(&self) -> StageKind {
        match self {
            Self::MissingInput { kind, .. }
            | Self::InvalidOptions { kind, .. }
            | Self::Transform { kind, .. }
            | Self::Io { kind, .. }
            | Self::ContextConflict { kind, .. }
            | Self::Timeout { kind, .. }
            | Self::Outputs { kind, .. } => *kind,
        }
    }
}

/// Errors raised by the transform ports.
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// The input could not be parsed.
    #[error("parse error in {origin}: {message}")]
    Parse {
        /// File or fragment being parsed.
        origin: String,
        /// Parser message.
        message: String,
    },

    /// A referenced file could not be found.
    #[error("unresolved reference '{reference}' from {origin}")]
    Unresolved {
        /// File containing the reference.
        origin: String,
        /// The reference text.
        reference: String,
    },

    /// The input uses a construct the transform cannot express.
    #[error("unsupported construct in {origin} line {line}: {message}")]
    Unsupported {
        /// File containing the construct.
        origin: String,
        /// 1-based line number.
        line: usize,
        /// What is not supported.
        message: String,
    },

    /// A template problem.
    #[error("template error: {0}")]
    Template(String),

    /// Encoding/decoding of binary assets failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// Reading an input failed.
    #[error("IO error on {path}: {message}")]
    Io {
        /// The path.
        path: String,
        /// The error message.
        message: String,
    },
}

impl TransformError {
    /// Creates a parse error.
    #[must_use]
    pub fn parse(origin: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Parse {
            origin: origin.to_string(),
            message: message.to_string(),
        }
    }

    /// Creates an IO error from a path and a source error.
    #[must_use]
    pub fn io(path: &Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Failures of several independent pipeline runs.
#[derive(Debug, Error)]
pub struct AggregateError {
    /// Every failure, in configuration order.
    pub errors: Vec<SiteflowError>,
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} build(s) failed", self.errors.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            write!(f, "\n  [{}] {err}", i + 1)?;
        }
        Ok(())
    }
}

impl AggregateError {
    /// Creates a new aggregate error.
    #[must_use]
    pub fn new(errors: Vec<SiteflowError>) -> Self {
        Self { errors }
    }

    /// Returns the number of failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if there are no failures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_missing_root() {
        let err = ConfigError::missing_root("Source", Path::new("/nope/src"));

        assert!(err.to_string().contains("/nope/src"));
        assert_eq!(err.path, Some(PathBuf::from("/nope/src")));
        assert_eq!(err.context.get("role"), Some(&"Source".to_string()));
    }

    #[test]
    fn test_stage_error_names_stage_and_path() {
        let err = StageError::missing(StageKind::Script, "/site/src/js/index.js");

        let message = err.to_string();
        assert!(message.starts_with("script"));
        assert!(message.contains("index.js"));
        assert_eq!(err.kind(), StageKind::Script);
    }

    #[test]
    fn test_outputs_error_lists_failures() {
        let err = StageError::Outputs {
            kind: StageKind::Markup,
            failures: vec![
                OutputFailure::new("home", "layout missing"),
                OutputFailure::new("about", "write failed"),
            ],
        };

        let message = err.to_string();
        assert!(message.contains("2 output(s) failed"));
        assert!(message.contains("output 'home': layout missing"));
        assert!(message.contains("output 'about'"));
    }

    #[test]
    fn test_aggregate_flattens() {
        let inner = AggregateError::new(vec![
            SiteflowError::Config(ConfigError::new("a")),
            SiteflowError::Config(ConfigError::new("b")),
        ]);
        let outer = SiteflowError::Aggregate(AggregateError::new(vec![
            SiteflowError::Aggregate(inner),
            SiteflowError::Config(ConfigError::new("c")),
        ]));

        let leaves = outer.into_errors();
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[2].to_string(), "c");
    }

    #[test]
    fn test_construction_error_display() {
        let err = StageConstructionError::unknown("sass");
        assert_eq!(err.to_string(), "Unknown stage 'sass'");

        let err = StageConstructionError::invalid(StageKind::Markup, "expected map");
        assert!(err.to_string().contains("markup"));
    }
}
