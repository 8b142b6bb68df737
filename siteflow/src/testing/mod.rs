//! Test fixtures for stage and pipeline tests.

use crate::config::StageValue;
use crate::context::{SharedContext, StageContext};
use crate::core::{Environment, StageKind};
use crate::errors::StageError;
use crate::stages::Stage;
use crate::transform::Toolchain;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary site with `src/` and `dist/` roots.
pub struct SiteFixture {
    dir: TempDir,
    /// Absolute source root.
    pub src: PathBuf,
    /// Absolute output root.
    pub dist: PathBuf,
    /// Environment stages run in.
    pub env: Environment,
    /// Transform implementations.
    pub toolchain: Toolchain,
    /// Shared context, persisted across stage runs.
    pub shared: SharedContext,
}

impl SiteFixture {
    /// Creates an empty site for `env`.
    pub fn new(env: Environment) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dist = dir.path().join("dist");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&dist).unwrap();
        Self {
            dir,
            src,
            dist,
            env,
            toolchain: Toolchain::default(),
            shared: SharedContext::new(),
        }
    }

    /// Creates a development site.
    pub fn development() -> Self {
        Self::new(Environment::Development)
    }

    /// Creates a production site.
    pub fn production() -> Self {
        Self::new(Environment::Production)
    }

    /// Replaces the toolchain.
    #[must_use]
    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Returns the temporary directory holding both roots.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a file under the source root.
    pub fn write_src(&self, relative: &str, contents: impl AsRef<[u8]>) {
        let path = self.src.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    /// Writes a file under the output root.
    pub fn write_dist(&self, relative: &str, contents: impl AsRef<[u8]>) {
        let path = self.dist.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    /// Reads a file under the source root.
    pub fn read_src(&self, relative: &str) -> String {
        std::fs::read_to_string(self.src.join(relative)).unwrap()
    }

    /// Reads a file under the output root.
    pub fn read_dist(&self, relative: &str) -> String {
        std::fs::read_to_string(self.dist.join(relative)).unwrap()
    }

    /// Checks if a path exists under the source root.
    pub fn src_exists(&self, relative: &str) -> bool {
        self.src.join(relative).exists()
    }

    /// Checks if a path exists under the output root.
    pub fn dist_exists(&self, relative: &str) -> bool {
        self.dist.join(relative).exists()
    }

    /// Returns true if nothing was written under the output root.
    pub fn dist_is_empty(&self) -> bool {
        std::fs::read_dir(&self.dist).unwrap().next().is_none()
    }

    /// Creates a stage context over this site.
    pub fn ctx(&self, kind: StageKind) -> StageContext<'_> {
        StageContext::new(
            kind,
            &self.src,
            &self.dist,
            &self.env,
            &self.toolchain,
            &self.shared,
        )
    }

    /// Runs a stage, returning its warnings.
    pub async fn run(&self, stage: &dyn Stage) -> Result<Vec<String>, StageError> {
        let mut ctx = self.ctx(stage.kind());
        stage.run(&mut ctx).await?;
        Ok(ctx.into_warnings())
    }

    /// Constructs a stage from a configuration value and runs it.
    pub async fn run_kind(
        &self,
        kind: StageKind,
        value: serde_json::Value,
    ) -> Result<Vec<String>, StageError> {
        let stage = kind.construct(&StageValue::from_value(&value)).unwrap();
        self.run(stage.as_ref()).await
    }
}
