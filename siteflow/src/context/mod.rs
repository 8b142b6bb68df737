//! Context management for pipeline runs.
//!
//! This module provides:
//! - The shared, namespaced artifact map of a run
//! - Frozen snapshots of that map for concurrent readers
//! - The per-stage handle that scopes writes to one namespace

mod shared;
mod stage;

pub use shared::{ContextSnapshot, SharedContext};
pub use stage::StageContext;
