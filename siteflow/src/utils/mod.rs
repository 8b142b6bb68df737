//! Path and filesystem helpers shared by the orchestrator and the stages.

pub mod fs;
pub mod paths;

pub use paths::{absolutize, is_contained, join_relative, normalize, relative_slash, to_slash};
