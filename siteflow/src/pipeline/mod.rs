//! Pipeline execution.
//!
//! This module provides:
//! - The [`Pipeline`] orchestrator: root resolution, stage planning,
//!   sequential execution and multi-configuration fan-out
//! - The [`BuildReport`] a successful run returns

mod orchestrator;
mod report;

pub use orchestrator::Pipeline;
pub use report::{BuildReport, Diagnostic, StageRecord};
