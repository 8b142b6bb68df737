//! The outcome of a successful pipeline run.

use crate::core::{Environment, StageKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// A recoverable problem found while planning a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// The configuration key or stage the problem is about.
    pub source: String,
    /// What happened.
    pub message: String,
}

impl Diagnostic {
    /// Creates a new diagnostic.
    #[must_use]
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

/// One executed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    /// The stage kind.
    pub kind: StageKind,
    /// Wall time in milliseconds.
    pub duration_ms: u64,
    /// Warnings the stage recorded.
    pub warnings: Vec<String>,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Run identifier, shared with the emitted events.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Build environment.
    pub env: Environment,
    /// Absolute source root.
    pub src: PathBuf,
    /// Absolute output root.
    pub dist: PathBuf,
    /// Executed stages, in order.
    pub stages: Vec<StageRecord>,
    /// Dropped configuration keys and skipped stages.
    pub diagnostics: Vec<Diagnostic>,
    /// Total wall time in milliseconds.
    pub duration_ms: u64,
}

impl BuildReport {
    /// Returns the kinds of the executed stages, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.kind).collect()
    }

    /// Returns the record of a stage, if it ran.
    #[must_use]
    pub fn stage(&self, kind: StageKind) -> Option<&StageRecord> {
        self.stages.iter().find(|s| s.kind == kind)
    }

    /// Returns every warning, prefixed with its stage.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.stages
            .iter()
            .flat_map(|s| s.warnings.iter().map(move |w| format!("{}: {w}", s.kind)))
            .collect()
    }
}
