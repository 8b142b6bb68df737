//! Build lifecycle events.
//!
//! The pipeline reports its progress as [`BuildEvent`]s to an [`EventSink`].
//! By default events go to `tracing`; tests use a [`CollectingEventSink`].

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use crate::core::StageKind;
use serde_json::{json, Value};
use std::path::PathBuf;
use uuid::Uuid;

/// Something that happened during a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    /// A run resolved its roots and constructed its stages.
    BuildStarted {
        /// Run identifier.
        run_id: Uuid,
        /// Absolute source root.
        src: PathBuf,
        /// Absolute output root.
        dist: PathBuf,
        /// Environment name.
        env: String,
        /// Stages that will run, in order.
        stages: Vec<StageKind>,
    },
    /// A stage began running.
    StageStarted {
        /// Run identifier.
        run_id: Uuid,
        /// The stage.
        stage: StageKind,
    },
    /// A stage finished successfully.
    StageCompleted {
        /// Run identifier.
        run_id: Uuid,
        /// The stage.
        stage: StageKind,
        /// Wall time in milliseconds.
        duration_ms: u64,
        /// Number of warnings the stage recorded.
        warnings: usize,
    },
    /// A stage failed; the run stops here.
    StageFailed {
        /// Run identifier.
        run_id: Uuid,
        /// The stage.
        stage: StageKind,
        /// The error message.
        error: String,
    },
    /// Every stage finished.
    BuildCompleted {
        /// Run identifier.
        run_id: Uuid,
        /// Wall time in milliseconds.
        duration_ms: u64,
        /// Number of stages executed.
        stages: usize,
    },
    /// The run failed.
    BuildFailed {
        /// Run identifier.
        run_id: Uuid,
        /// The error message.
        error: String,
    },
}

impl BuildEvent {
    /// Returns the dotted event name, e.g. `stage.completed`.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::BuildStarted { .. } => "build.started",
            Self::StageStarted { .. } => "stage.started",
            Self::StageCompleted { .. } => "stage.completed",
            Self::StageFailed { .. } => "stage.failed",
            Self::BuildCompleted { .. } => "build.completed",
            Self::BuildFailed { .. } => "build.failed",
        }
    }

    /// Returns the run this event belongs to.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        match self {
            Self::BuildStarted { run_id, .. }
            | Self::StageStarted { run_id, .. }
            | Self::StageCompleted { run_id, .. }
            | Self::StageFailed { run_id, .. }
            | Self::BuildCompleted { run_id, .. }
            | Self::BuildFailed { run_id, .. } => *run_id,
        }
    }

    /// Returns the event payload as JSON.
    #[must_use]
    pub fn data(&self) -> Value {
        match self {
            Self::BuildStarted {
                run_id,
                src,
                dist,
                env,
                stages,
            } => json!({
                "run_id": run_id.to_string(),
                "src": src.display().to_string(),
                "dist": dist.display().to_string(),
                "env": env,
                "stages": stages.iter().map(|s| s.key()).collect::<Vec<_>>(),
            }),
            Self::StageStarted { run_id, stage } => json!({
                "run_id": run_id.to_string(),
                "stage": stage.key(),
            }),
            Self::StageCompleted {
                run_id,
                stage,
                duration_ms,
                warnings,
            } => json!({
                "run_id": run_id.to_string(),
                "stage": stage.key(),
                "duration_ms": duration_ms,
                "warnings": warnings,
            }),
            Self::StageFailed {
                run_id,
                stage,
                error,
            } => json!({
                "run_id": run_id.to_string(),
                "stage": stage.key(),
                "error": error,
            }),
            Self::BuildCompleted {
                run_id,
                duration_ms,
                stages,
            } => json!({
                "run_id": run_id.to_string(),
                "duration_ms": duration_ms,
                "stages": stages,
            }),
            Self::BuildFailed { run_id, error } => json!({
                "run_id": run_id.to_string(),
                "error": error,
            }),
        }
    }
}
