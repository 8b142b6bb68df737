//! The per-stage view of a pipeline run.

use super::{ContextSnapshot, SharedContext};
use crate::core::{Environment, StageKind};
use crate::errors::{StageError, TransformError};
use crate::transform::Toolchain;
use crate::utils::join_relative;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Everything a running stage may touch.
///
/// Reads of any namespace are allowed; writes are limited to the namespace of
/// the stage the context was created for.
#[derive(Debug)]
pub struct StageContext<'a> {
    kind: StageKind,
    src_root: &'a Path,
    dist_root: &'a Path,
    env: &'a Environment,
    toolchain: &'a Toolchain,
    shared: &'a SharedContext,
    warnings: Vec<String>,
}

impl<'a> StageContext<'a> {
    /// Creates a context for a stage of `kind`.
    #[must_use]
    pub fn new(
        kind: StageKind,
        src_root: &'a Path,
        dist_root: &'a Path,
        env: &'a Environment,
        toolchain: &'a Toolchain,
        shared: &'a SharedContext,
    ) -> Self {
        Self {
            kind,
            src_root,
            dist_root,
            env,
            toolchain,
            shared,
            warnings: Vec::new(),
        }
    }

    /// Returns the kind of the running stage.
    #[must_use]
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// Returns the absolute source root.
    #[must_use]
    pub fn src_root(&self) -> &Path {
        self.src_root
    }

    /// Returns the absolute output root.
    #[must_use]
    pub fn dist_root(&self) -> &Path {
        self.dist_root
    }

    /// Returns the build environment.
    #[must_use]
    pub fn env(&self) -> &Environment {
        self.env
    }

    /// Returns the transform implementations.
    #[must_use]
    pub fn toolchain(&self) -> &Toolchain {
        self.toolchain
    }

    /// Resolves a configured path against the source root.
    #[must_use]
    pub fn src_path(&self, relative: &str) -> PathBuf {
        join_relative(self.src_root, relative)
    }

    /// Resolves a configured path against the output root.
    #[must_use]
    pub fn dist_path(&self, relative: &str) -> PathBuf {
        join_relative(self.dist_root, relative)
    }

    /// Publishes an artifact into this stage's namespace.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::ContextConflict`] if the namespace was already
    /// published in this run.
    pub fn publish<T: Serialize>(&mut self, artifact: &T) -> Result<(), StageError> {
        let value = serde_json::to_value(artifact)
            .map_err(|e| StageError::transform(self.kind, TransformError::Codec(e.to_string())))?;
        let namespace = self.kind.namespace();
        if self.shared.insert_new(namespace, value) {
            tracing::debug!(stage = %self.kind, namespace, "Published artifact");
            Ok(())
        } else {
            Err(StageError::ContextConflict {
                kind: self.kind,
                namespace: namespace.to_string(),
            })
        }
    }

    /// Reads the artifact another stage published, if it has the expected shape.
    #[must_use]
    pub fn artifact<T: DeserializeOwned>(&self, kind: StageKind) -> Option<T> {
        self.shared.get_as(kind.namespace())
    }

    /// Takes a frozen copy of the shared context.
    #[must_use]
    pub fn snapshot(&self) -> ContextSnapshot {
        self.shared.snapshot()
    }

    /// Logs and records a recoverable problem.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(stage = %self.kind, "{message}");
        self.warnings.push(message);
    }

    /// Returns the warnings recorded so far.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub(crate) fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}
