//! SVG optimization and fragment publishing.

use super::scaffold::require_dir;
use super::{PathOptions, Stage};
use crate::context::StageContext;
use crate::core::{StageKind, VectorArtifact};
use crate::errors::{StageError, TransformError};
use crate::utils::fs;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Options for the vector stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorOptions {
    /// Location of the SVG files (default `svg`).
    #[serde(flatten)]
    pub location: PathOptions,
}

impl Default for VectorOptions {
    fn default() -> Self {
        Self {
            location: PathOptions::shared("svg"),
        }
    }
}

/// Optimizes `*.svg` files and publishes their raw markup as `svg-<stem>`.
///
/// The published markup is the unoptimized source, so templates can inline
/// it as a partial.
#[derive(Debug, Clone)]
pub struct VectorStage {
    options: VectorOptions,
}

impl VectorStage {
    /// Creates a new vector stage.
    #[must_use]
    pub fn new(options: VectorOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Stage for VectorStage {
    fn kind(&self) -> StageKind {
        StageKind::Vector
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let kind = self.kind();
        let src_dir = ctx.src_path(self.options.location.src().unwrap_or("svg"));
        let dist_dir = ctx.dist_path(self.options.location.dist().unwrap_or("svg"));
        require_dir(ctx, &src_dir).await?;

        let optimizer = ctx.toolchain().vectors.clone();
        let jobs = fs::list_matching(&src_dir, &["*.svg"]).into_iter().filter_map(|file| {
            let stem = file.file_stem()?.to_str()?.to_string();
            let name = file.file_name()?.to_owned();
            let target = dist_dir.join(name);
            let optimizer = optimizer.clone();
            Some(async move {
                let raw = tokio::fs::read_to_string(&file)
                    .await
                    .map_err(|e| StageError::io(kind, &file, e))?;
                let optimized = optimizer
                    .optimize(&raw)
                    .map_err(|e| StageError::transform(kind, e))?;
                fs::write_file(&target, optimized)
                    .await
                    .map_err(|e| StageError::io(kind, &target, e))?;
                debug!(stage = %kind, file = %file.display(), "Optimized vector");
                Ok::<_, StageError>((format!("svg-{stem}"), raw))
            })
        });

        let mut artifact = VectorArtifact::new();
        for result in join_all(jobs).await {
            let (key, raw) = result?;
            artifact.insert(key, raw);
        }

        info!(stage = %kind, files = artifact.len(), "Optimized vectors");
        ctx.publish(&artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SiteFixture;
    use crate::transform::{MockVectorOptimizer, Toolchain};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_publishes_raw_and_writes_optimized() {
        let site = SiteFixture::production();
        let raw = "<!-- logo -->\n<svg viewBox=\"0 0 1 1\">\n  <path d=\"M0 0\"/>\n</svg>\n";
        site.write_src("svg/logo.svg", raw);

        site.run_kind(StageKind::Vector, json!(true)).await.unwrap();

        let artifact: VectorArtifact = site.shared.get_as("vector").unwrap();
        assert_eq!(artifact["svg-logo"], raw);
        let written = site.read_dist("svg/logo.svg");
        assert!(!written.contains("logo -->"));
        assert!(written.contains("<path d=\"M0 0\"/>"));
    }

    #[tokio::test]
    async fn test_optimizer_error_fails_stage() {
        let mut optimizer = MockVectorOptimizer::new();
        optimizer
            .expect_optimize()
            .returning(|_| Err(TransformError::parse("icon.svg", "broken")));
        let site = SiteFixture::production()
            .with_toolchain(Toolchain::new().with_vectors(Arc::new(optimizer)));
        site.write_src("svg/icon.svg", "<svg/>");

        let err = site.run_kind(StageKind::Vector, json!(true)).await.unwrap_err();
        assert!(matches!(err, StageError::Transform { .. }));
        assert!(!site.shared.contains("vector"));
    }

    #[tokio::test]
    async fn test_empty_folder_publishes_empty_map() {
        let site = SiteFixture::development();
        site.run_kind(StageKind::Vector, json!({"path": "icons"})).await.unwrap();

        assert!(site.src_exists("icons"));
        assert_eq!(site.shared.get("vector"), Some(json!({})));
    }
}
