//! Stage trait and the built-in stages.
//!
//! There is one stage per [`StageKind`]. Stages are built from their
//! configuration value by [`StageKind::construct`] and run by the pipeline in
//! [`StageKind::ORDER`].

mod files;
mod font;
mod i18n;
mod image;
mod markup;
mod media;
mod registry;
mod scaffold;
mod script;
mod stylesheet;
mod vector;

pub use files::{CopyEntry, CopyOptions, CopyStage, DeleteOptions, DeleteStage, MoveOptions, MoveStage};
pub use font::{FontOptions, FontStage};
pub use i18n::{I18nOptions, I18nStage};
pub use image::{ImageOptions, ImageStage};
pub use markup::{FormatSetting, Layout, MarkupOptions, MarkupStage, PageOptions, BUILTIN_LAYOUT};
pub use media::{MediaOptions, MediaStage};
pub use registry::{plan, PlanNote, StagePlan};
pub use script::{ScriptOptions, ScriptStage};
pub use stylesheet::{StylesheetOptions, StylesheetStage};
pub use vector::{VectorOptions, VectorStage};

use crate::context::StageContext;
use crate::core::StageKind;
use crate::errors::StageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A configured stage.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the kind of asset this stage handles.
    fn kind(&self) -> StageKind;

    /// Runs the stage against the source and output trees.
    ///
    /// # Errors
    ///
    /// Any error aborts the remaining stages of the run.
    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError>;
}

/// The `path` / `srcPath` / `distPath` triple every stage accepts.
///
/// `srcPath` and `distPath` fall back to `path`. Defaults set per kind are
/// dropped by option resolution when the user sets `path` alone, so a user
/// `path` wins over a kind's default `srcPath`/`distPath`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathOptions {
    /// Shared source and output sub-path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Source sub-path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_path: Option<String>,
    /// Output sub-path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist_path: Option<String>,
}

impl PathOptions {
    /// Uses one sub-path for both trees.
    #[must_use]
    pub fn shared(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Uses distinct source and output sub-paths.
    #[must_use]
    pub fn split(src: impl Into<String>, dist: impl Into<String>) -> Self {
        Self {
            path: None,
            src_path: Some(src.into()),
            dist_path: Some(dist.into()),
        }
    }

    /// Returns the source sub-path, if any was configured.
    #[must_use]
    pub fn src(&self) -> Option<&str> {
        self.src_path.as_deref().or(self.path.as_deref())
    }

    /// Returns the output sub-path, if any was configured.
    #[must_use]
    pub fn dist(&self) -> Option<&str> {
        self.dist_path.as_deref().or(self.path.as_deref())
    }

    /// Returns true if no path was configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path.is_none() && self.src_path.is_none() && self.dist_path.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_value, StageValue};
    use serde_json::json;

    #[test]
    fn test_path_fallbacks() {
        let paths = PathOptions::shared("img");
        assert_eq!(paths.src(), Some("img"));
        assert_eq!(paths.dist(), Some("img"));

        let paths = PathOptions::split("less", "css");
        assert_eq!(paths.src(), Some("less"));
        assert_eq!(paths.dist(), Some("css"));

        assert!(PathOptions::default().is_empty());
        assert_eq!(PathOptions::default().src(), None);
    }

    #[test]
    fn test_user_path_beats_kind_split_defaults() {
        let defaults = serde_json::to_value(PathOptions::split("less", "css")).unwrap();
        let merged = resolve_value(&defaults, &json!({"path": "styles"}));
        let paths: PathOptions = serde_json::from_value(merged).unwrap();

        assert_eq!(paths.src(), Some("styles"));
        assert_eq!(paths.dist(), Some("styles"));

        let merged = resolve_value(&defaults, &json!({"path": "styles", "distPath": "out"}));
        let paths: PathOptions = serde_json::from_value(merged).unwrap();
        assert_eq!(paths.src(), Some("styles"));
        assert_eq!(paths.dist(), Some("out"));
    }

    #[test]
    fn test_every_kind_constructs_with_defaults() {
        for kind in StageKind::ORDER {
            let stage = kind.construct(&StageValue::Defaults).unwrap();
            assert_eq!(stage.kind(), kind);
        }
    }
}
