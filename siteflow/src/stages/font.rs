//! Web font conversion.

use super::scaffold::require_dir;
use super::{PathOptions, Stage};
use crate::context::StageContext;
use crate::core::StageKind;
use crate::errors::{StageError, TransformError};
use crate::transform::font_face_css;
use crate::utils::fs;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::info;

const PATTERNS: [&str; 4] = ["*.ttf", "*.otf", "*.woff", "*.woff2"];

/// Options for the font stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontOptions {
    /// Location of the fonts (default `font`).
    #[serde(flatten)]
    pub location: PathOptions,
    /// Name of the generated `@font-face` stylesheet, written next to the
    /// fonts. `null` disables it.
    pub stylesheet: Option<String>,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self {
            location: PathOptions::shared("font"),
            stylesheet: Some("fonts.css".to_string()),
        }
    }
}

/// Converts fonts and writes a matching `@font-face` stylesheet.
#[derive(Debug, Clone)]
pub struct FontStage {
    options: FontOptions,
}

impl FontStage {
    /// Creates a new font stage.
    #[must_use]
    pub fn new(options: FontOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Stage for FontStage {
    fn kind(&self) -> StageKind {
        StageKind::Font
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let kind = self.kind();
        let src_dir = ctx.src_path(self.options.location.src().unwrap_or("font"));
        let dist_dir = ctx.dist_path(self.options.location.dist().unwrap_or("font"));
        require_dir(ctx, &src_dir).await?;

        let fonts = fs::list_matching(&src_dir, &PATTERNS);
        if fonts.is_empty() {
            return Ok(());
        }

        let converter = ctx.toolchain().fonts.clone();
        let jobs = fonts.iter().cloned().map(|font| {
            let converter = converter.clone();
            let dist_dir = dist_dir.clone();
            tokio::task::spawn_blocking(move || converter.convert(&font, &dist_dir))
        });

        let mut written = Vec::new();
        for result in join_all(jobs).await {
            let files = result
                .map_err(|e| StageError::transform(kind, TransformError::Codec(e.to_string())))?
                .map_err(|e| StageError::transform(kind, e))?;
            written.extend(files);
        }

        if let Some(name) = &self.options.stylesheet {
            let target = dist_dir.join(name);
            fs::write_file(&target, font_face_css(&written))
                .await
                .map_err(|e| StageError::io(kind, &target, e))?;
        }

        info!(stage = %kind, fonts = fonts.len(), files = written.len(), "Converted fonts");
        Ok(())
    }
}
