//! Filesystem stages: copy into, move within and delete from the output tree.
//!
//! Targets are confined to the output root; a path that escapes it is an
//! invalid option and nothing is touched.

use super::{PathOptions, Stage};
use crate::context::StageContext;
use crate::core::StageKind;
use crate::errors::StageError;
use crate::utils::{fs, is_contained, normalize};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A `from` / `to` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyEntry {
    /// Source path.
    pub from: String,
    /// Destination path.
    pub to: String,
}

impl CopyEntry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

fn confined(ctx: &StageContext<'_>, relative: &str) -> Result<PathBuf, StageError> {
    let path = ctx.dist_path(relative);
    if is_contained(ctx.dist_root(), &path) {
        Ok(path)
    } else {
        Err(StageError::invalid(
            ctx.kind(),
            format!("\"{relative}\" is outside the output folder"),
        ))
    }
}

/// Options for the copy stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyOptions {
    /// A single pair: `srcPath` (relative to the source root) to `distPath`
    /// (relative to the output root, defaulting to the same path).
    #[serde(flatten)]
    pub location: PathOptions,
    /// Further pairs, copied in order.
    #[serde(default)]
    pub entries: Vec<CopyEntry>,
}

impl CopyOptions {
    /// Returns every pair to copy, the single-pair form first.
    #[must_use]
    pub fn pairs(&self) -> Vec<CopyEntry> {
        let single = self.location.src().map(|from| {
            CopyEntry::new(from, self.location.dist().unwrap_or(from))
        });
        single.into_iter().chain(self.entries.iter().cloned()).collect()
    }
}

/// Copies files or folders from the source tree into the output tree.
#[derive(Debug, Clone)]
pub struct CopyStage {
    options: CopyOptions,
}

impl CopyStage {
    /// Creates a new copy stage.
    #[must_use]
    pub fn new(options: CopyOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Stage for CopyStage {
    fn kind(&self) -> StageKind {
        StageKind::Copy
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let kind = self.kind();
        let pairs = self.options.pairs();
        let targets = pairs
            .iter()
            .map(|entry| confined(ctx, &entry.to))
            .collect::<Result<Vec<_>, _>>()?;

        let mut copied = 0;
        for (entry, to) in pairs.iter().zip(targets) {
            let from = ctx.src_path(&entry.from);
            if fs::is_file(&from).await || fs::is_dir(&from).await {
                copied += fs::copy_recursive(&from, &to)
                    .await
                    .map_err(|e| StageError::io(kind, &from, e))?;
                debug!(stage = %kind, from = %from.display(), to = %to.display(), "Copied");
            } else if ctx.env().scaffolds() {
                fs::ensure_dir(&from)
                    .await
                    .map_err(|e| StageError::io(kind, &from, e))?;
                debug!(stage = %kind, path = %from.display(), "Created source folder");
            } else {
                return Err(StageError::missing(kind, from));
            }
        }

        info!(stage = %kind, entries = pairs.len(), files = copied, "Copied files");
        Ok(())
    }
}

/// Options for the move stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOptions {
    /// Pairs relative to the output root, moved in order.
    #[serde(default)]
    pub entries: Vec<CopyEntry>,
}

/// Renames files or folders inside the output tree.
#[derive(Debug, Clone)]
pub struct MoveStage {
    options: MoveOptions,
}

impl MoveStage {
    /// Creates a new move stage.
    #[must_use]
    pub fn new(options: MoveOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Stage for MoveStage {
    fn kind(&self) -> StageKind {
        StageKind::Move
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let kind = self.kind();
        let moves = self
            .options
            .entries
            .iter()
            .map(|entry| -> Result<_, StageError> {
                Ok((confined(ctx, &entry.from)?, confined(ctx, &entry.to)?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (from, to) in &moves {
            if tokio::fs::metadata(from).await.is_err() {
                return Err(StageError::missing(kind, from));
            }
            if let Some(parent) = to.parent() {
                fs::ensure_dir(parent)
                    .await
                    .map_err(|e| StageError::io(kind, parent, e))?;
            }
            tokio::fs::rename(from, to)
                .await
                .map_err(|e| StageError::io(kind, from, e))?;
            debug!(stage = %kind, from = %from.display(), to = %to.display(), "Moved");
        }

        info!(stage = %kind, entries = moves.len(), "Moved files");
        Ok(())
    }
}

/// Options for the delete stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOptions {
    /// Paths relative to the output root.
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Removes files or folders from the output tree. Missing paths are ignored.
#[derive(Debug, Clone)]
pub struct DeleteStage {
    options: DeleteOptions,
}

impl DeleteStage {
    /// Creates a new delete stage.
    #[must_use]
    pub fn new(options: DeleteOptions) -> Self {
        Self { options }
    }
}

async fn remove(path: &Path) -> std::io::Result<bool> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await.map(|()| true),
        Ok(_) => tokio::fs::remove_file(path).await.map(|()| true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl Stage for DeleteStage {
    fn kind(&self) -> StageKind {
        StageKind::Delete
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let kind = self.kind();
        let root = normalize(ctx.dist_root());
        let mut targets = Vec::with_capacity(self.options.paths.len());
        for relative in &self.options.paths {
            let path = confined(ctx, relative)?;
            if normalize(&path) == root {
                return Err(StageError::invalid(
                    kind,
                    format!("\"{relative}\" is the output folder itself"),
                ));
            }
            targets.push(path);
        }

        let mut removed = 0;
        for path in &targets {
            if remove(path).await.map_err(|e| StageError::io(kind, path, e))? {
                removed += 1;
                debug!(stage = %kind, path = %path.display(), "Deleted");
            }
        }

        info!(stage = %kind, requested = targets.len(), removed, "Deleted files");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SiteFixture;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_copy_pairs() {
        let options: CopyOptions = serde_json::from_value(json!({
            "srcPath": "static",
            "entries": [{"from": "robots.txt", "to": "robots.txt"}],
        }))
        .unwrap();

        assert_eq!(
            options.pairs(),
            vec![
                CopyEntry::new("static", "static"),
                CopyEntry::new("robots.txt", "robots.txt"),
            ]
        );
        assert!(CopyOptions::default().pairs().is_empty());
    }

    #[tokio::test]
    async fn test_copy_files_and_folders() {
        let site = SiteFixture::production();
        site.write_src("static/a.txt", "a");
        site.write_src("static/sub/b.txt", "b");
        site.write_src("robots.txt", "r");

        site.run_kind(
            StageKind::Copy,
            json!({
                "srcPath": "static",
                "distPath": "assets",
                "entries": [{"from": "robots.txt", "to": "meta/robots.txt"}],
            }),
        )
        .await
        .unwrap();

        assert_eq!(site.read_dist("assets/sub/b.txt"), "b");
        assert_eq!(site.read_dist("meta/robots.txt"), "r");
    }

    #[tokio::test]
    async fn test_copy_missing_source() {
        let site = SiteFixture::development();
        site.run_kind(StageKind::Copy, json!({"path": "static"}))
            .await
            .unwrap();
        assert!(site.src_exists("static"));

        let site = SiteFixture::production();
        let err = site
            .run_kind(StageKind::Copy, json!({"path": "static"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::MissingInput { .. }));
    }

    #[tokio::test]
    async fn test_copy_rejects_escaping_target() {
        let site = SiteFixture::production();
        site.write_src("a.txt", "a");

        let err = site
            .run_kind(
                StageKind::Copy,
                json!({"entries": [{"from": "a.txt", "to": "../a.txt"}]}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::InvalidOptions { .. }));
        assert!(!site.root().join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_move_within_output() {
        let site = SiteFixture::development();
        site.write_dist("home.html", "home");

        site.run_kind(
            StageKind::Move,
            json!({"entries": [{"from": "home.html", "to": "home/index.html"}]}),
        )
        .await
        .unwrap();

        assert!(!site.dist_exists("home.html"));
        assert_eq!(site.read_dist("home/index.html"), "home");

        let err = site
            .run_kind(
                StageKind::Move,
                json!({"entries": [{"from": "gone.html", "to": "x.html"}]}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::MissingInput { .. }));
    }

    #[tokio::test]
    async fn test_delete_ignores_missing_paths() {
        let site = SiteFixture::production();
        site.write_dist("css/bundle.css", "x");
        site.write_dist("tmp/a/b.txt", "x");
        site.write_dist("keep.txt", "x");

        site.run_kind(
            StageKind::Delete,
            json!({"paths": ["tmp", "css/bundle.css", "never-there"]}),
        )
        .await
        .unwrap();

        assert!(!site.dist_exists("tmp"));
        assert!(!site.dist_exists("css/bundle.css"));
        assert!(site.dist_exists("css"));
        assert!(site.dist_exists("keep.txt"));
    }

    #[tokio::test]
    async fn test_delete_rejects_root_and_escapes() {
        let site = SiteFixture::production();
        site.write_dist("keep.txt", "x");

        for path in [".", "", "../src", "a/../.."] {
            let err = site
                .run_kind(StageKind::Delete, json!({"paths": ["keep.txt", path]}))
                .await
                .unwrap_err();
            assert!(matches!(err, StageError::InvalidOptions { .. }), "{path}");
        }
        assert!(site.dist_exists("keep.txt"));
    }
}
