//! Core domain model types for siteflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage kinds and their fixed execution order
//! - The build environment policy
//! - Artifact shapes exchanged through the shared context

mod artifact;
mod environment;
mod kind;

pub use artifact::{BundleArtifact, LocaleArtifact, VectorArtifact};
pub use environment::{Environment, OutputStyle, ENV_VAR};
pub use kind::StageKind;
