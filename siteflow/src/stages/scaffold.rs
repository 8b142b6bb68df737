//! Missing-input handling shared by the stages.
//!
//! In development a missing source directory is created and a missing entry
//! file is written with the kind's stub, never overwriting an existing file.
//! Elsewhere a missing input is a [`StageError::MissingInput`].

use crate::context::StageContext;
use crate::errors::StageError;
use crate::utils::fs;
use std::path::Path;
use tracing::{debug, info};

/// Requires `dir` to be a directory, creating it in development.
pub(crate) async fn require_dir(ctx: &StageContext<'_>, dir: &Path) -> Result<(), StageError> {
    if fs::is_dir(dir).await {
        return Ok(());
    }
    if !ctx.env().scaffolds() {
        return Err(StageError::missing(ctx.kind(), dir));
    }
    fs::ensure_dir(dir)
        .await
        .map_err(|e| StageError::io(ctx.kind(), dir, e))?;
    debug!(stage = %ctx.kind(), path = %dir.display(), "Created source folder");
    Ok(())
}

/// Requires `file` to exist, writing `stub` in development.
pub(crate) async fn require_file(
    ctx: &StageContext<'_>,
    file: &Path,
    stub: &str,
) -> Result<(), StageError> {
    if fs::is_file(file).await {
        return Ok(());
    }
    if ctx.env().scaffolds() {
        let created = fs::write_if_absent(file, stub)
            .await
            .map_err(|e| StageError::io(ctx.kind(), file, e))?;
        if created {
            info!(stage = %ctx.kind(), path = %file.display(), "Scaffolded stub");
        }
        if fs::is_file(file).await {
            return Ok(());
        }
    }
    Err(StageError::missing(ctx.kind(), file))
}

/// Serializes JSON with four-space indentation.
pub(crate) fn pretty_json(value: &serde_json::Value) -> String {
    use serde::Serialize;

    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    if value.serialize(&mut serializer).is_err() {
        return value.to_string();
    }
    String::from_utf8(out).unwrap_or_else(|_| value.to_string())
}
