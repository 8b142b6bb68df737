//! # Siteflow
//!
//! An ordered asset build pipeline for static websites.
//!
//! A site configuration names a source tree, an output tree, an environment
//! and a set of asset stages. Siteflow turns that configuration into:
//!
//! - **Stages**: one per asset kind (locales, images, fonts, vectors, media,
//!   stylesheets, scripts, markup and filesystem operations)
//! - **A fixed order**: stages always run in [`core::StageKind::ORDER`], so
//!   markup sees the stylesheet and script bundles
//! - **Environment behavior**: development scaffolds missing inputs and keeps
//!   output readable; production fails on missing inputs and minifies
//! - **Events**: every run reports its progress through an [`events::EventSink`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use siteflow::prelude::*;
//! use serde_json::json;
//!
//! let config = SiteConfig::from_value(&json!({
//!     "src": "src",
//!     "dist": "dist",
//!     "env": "production",
//!     "stylesheet": {},
//!     "markup": {"output": {"home": {"path": "home.html"}}},
//! }))?;
//!
//! let report = Pipeline::new().run(&config).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod stages;
pub mod transform;
pub mod utils;

#[cfg(test)]
mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ConstructionPolicy, SiteConfig, StageValue};
    pub use crate::context::{ContextSnapshot, SharedContext, StageContext};
    pub use crate::core::{
        BundleArtifact, Environment, LocaleArtifact, OutputStyle, StageKind, VectorArtifact,
    };
    pub use crate::errors::{
        AggregateError, ConfigError, OutputFailure, SiteflowError, StageConstructionError,
        StageError, TransformError,
    };
    pub use crate::events::{
        BuildEvent, CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::pipeline::{BuildReport, Diagnostic, Pipeline};
    pub use crate::stages::Stage;
    pub use crate::transform::Toolchain;
}
