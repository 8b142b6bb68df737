//! Video and audio pass-through.

use super::scaffold::require_dir;
use super::{PathOptions, Stage};
use crate::context::StageContext;
use crate::core::StageKind;
use crate::errors::StageError;
use crate::utils::fs;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Options for the video and audio stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaOptions {
    /// Location of the media files.
    #[serde(flatten)]
    pub location: PathOptions,
}

impl MediaOptions {
    /// Returns the defaults for `kind`: a shared path named after it.
    #[must_use]
    pub fn for_kind(kind: StageKind) -> Self {
        Self {
            location: PathOptions::shared(kind.key()),
        }
    }
}

/// Copies a media folder into the output tree unchanged.
#[derive(Debug, Clone)]
pub struct MediaStage {
    kind: StageKind,
    options: MediaOptions,
}

impl MediaStage {
    /// Creates a media stage of `kind` (video or audio).
    #[must_use]
    pub fn new(kind: StageKind, options: MediaOptions) -> Self {
        Self { kind, options }
    }
}

#[async_trait]
impl Stage for MediaStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let kind = self.kind;
        let src_dir = ctx.src_path(self.options.location.src().unwrap_or(kind.key()));
        let dist_dir = ctx.dist_path(self.options.location.dist().unwrap_or(kind.key()));
        require_dir(ctx, &src_dir).await?;

        if fs::is_empty_dir(&src_dir).await {
            return Ok(());
        }

        let copied = fs::copy_recursive(&src_dir, &dist_dir)
            .await
            .map_err(|e| StageError::io(kind, &src_dir, e))?;
        info!(stage = %kind, files = copied, "Copied media");
        Ok(())
    }
}
