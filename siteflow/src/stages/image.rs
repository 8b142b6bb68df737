//! Raster image recompression.

use super::scaffold::require_dir;
use super::{PathOptions, Stage};
use crate::context::StageContext;
use crate::core::StageKind;
use crate::errors::{StageError, TransformError};
use crate::transform::RasterFormat;
use crate::utils::fs;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

const PATTERNS: [&str; 6] = ["*.png", "*.jpg", "*.jpeg", "*.PNG", "*.JPG", "*.JPEG"];

/// Options for the image stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOptions {
    /// Location of the images (default `img`).
    #[serde(flatten)]
    pub location: PathOptions,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            location: PathOptions::shared("img"),
        }
    }
}

/// Recompresses PNG and JPEG files into the output tree.
#[derive(Debug, Clone)]
pub struct ImageStage {
    options: ImageOptions,
}

impl ImageStage {
    /// Creates a new image stage.
    #[must_use]
    pub fn new(options: ImageOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Stage for ImageStage {
    fn kind(&self) -> StageKind {
        StageKind::Image
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let kind = self.kind();
        let src_dir = ctx.src_path(self.options.location.src().unwrap_or("img"));
        let dist_dir = ctx.dist_path(self.options.location.dist().unwrap_or("img"));
        require_dir(ctx, &src_dir).await?;

        let files = fs::list_matching(&src_dir, &PATTERNS);
        let optimizer = ctx.toolchain().images.clone();

        let jobs = files.into_iter().filter_map(|file| {
            let format = RasterFormat::from_path(&file)?;
            let name = file.file_name()?.to_owned();
            let target = dist_dir.join(name);
            let optimizer = optimizer.clone();
            Some(async move {
                let bytes = tokio::fs::read(&file)
                    .await
                    .map_err(|e| StageError::io(kind, &file, e))?;
                let original = bytes.len();
                let optimized = tokio::task::spawn_blocking(move || optimizer.optimize(&bytes, format))
                    .await
                    .map_err(|e| StageError::transform(kind, TransformError::Codec(e.to_string())))?
                    .map_err(|e| StageError::transform(kind, e))?;
                fs::write_file(&target, &optimized)
                    .await
                    .map_err(|e| StageError::io(kind, &target, e))?;
                debug!(
                    stage = %kind,
                    file = %file.display(),
                    before = original,
                    after = optimized.len(),
                    "Optimized image"
                );
                Ok::<PathBuf, StageError>(target)
            })
        });

        let results = join_all(jobs).await;
        let count = results.len();
        results.into_iter().collect::<Result<Vec<_>, _>>()?;
        info!(stage = %kind, images = count, "Optimized images");
        Ok(())
    }
}
