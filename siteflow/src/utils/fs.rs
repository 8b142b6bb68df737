//! Async filesystem helpers.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Returns true if `path` exists and is a directory.
pub async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}

/// Returns true if `path` exists and is a regular file.
pub async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

/// Creates a directory and its parents if missing.
pub async fn ensure_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path).await
}

/// Writes a file, creating parent directories as needed.
pub async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, contents).await
}

/// Writes `contents` only if nothing exists at `path` yet.
///
/// Returns true if the file was created.
pub async fn write_if_absent(path: &Path, contents: impl AsRef<[u8]>) -> io::Result<bool> {
    if fs::metadata(path).await.is_ok() {
        return Ok(false);
    }
    write_file(path, contents).await?;
    Ok(true)
}

/// Lists regular files directly inside `dir` whose names match any of the
/// glob `patterns` (e.g. `*.svg`), sorted by path.
///
/// A missing directory yields an empty list.
pub fn list_matching(dir: &Path, patterns: &[&str]) -> Vec<PathBuf> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let mut files: Vec<PathBuf> = patterns
        .iter()
        .filter_map(|pattern| glob::glob(&format!("{escaped}/{pattern}")).ok())
        .flat_map(|paths| paths.filter_map(Result::ok))
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    files.dedup();
    files
}

/// Recursively copies a file or directory tree.
///
/// Returns the number of files copied.
pub async fn copy_recursive(from: &Path, to: &Path) -> io::Result<u64> {
    let from = from.to_path_buf();
    let to = to.to_path_buf();
    tokio::task::spawn_blocking(move || copy_recursive_blocking(&from, &to))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}

fn copy_recursive_blocking(from: &Path, to: &Path) -> io::Result<u64> {
    if from.is_file() {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(from, to)?;
        return Ok(1);
    }

    let mut copied = 0;
    for entry in WalkDir::new(from).follow_links(true) {
        let entry = entry.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Returns true if `dir` has no entries (or does not exist).
pub async fn is_empty_dir(dir: &Path) -> bool {
    match fs::read_dir(dir).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(None)),
        Err(_) => true,
    }
}
