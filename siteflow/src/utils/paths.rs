//! Pure path helpers relative to the configured source and output roots.

use std::path::{Component, Path, PathBuf};

/// Lexically normalizes a path, folding `.` and `..` components.
///
/// `..` never climbs above the root or the first component of a relative path.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolves a path against `base` when it is relative, then normalizes it.
#[must_use]
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Joins a configured relative path onto a root.
///
/// Absolute configured paths replace the root, matching `Path::join`.
#[must_use]
pub fn join_relative(root: &Path, relative: &str) -> PathBuf {
    if relative.is_empty() || relative == "." {
        return root.to_path_buf();
    }
    normalize(&root.join(relative))
}

/// Returns true if `path` is `root` or lies beneath it, after normalization.
#[must_use]
pub fn is_contained(root: &Path, path: &Path) -> bool {
    normalize(path).starts_with(normalize(root))
}

/// Renders a path with forward slashes, as used in published filenames.
#[must_use]
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Renders `path` relative to `root` with forward slashes.
///
/// Paths outside `root` are rendered whole.
#[must_use]
pub fn relative_slash(root: &Path, path: &Path) -> String {
    to_slash(path.strip_prefix(root).unwrap_or(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_dots() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn test_absolutize() {
        let base = Path::new("/work");
        assert_eq!(absolutize(Path::new("src"), base), PathBuf::from("/work/src"));
        assert_eq!(absolutize(Path::new("./dist/"), base), PathBuf::from("/work/dist"));
        assert_eq!(absolutize(Path::new("/abs"), base), PathBuf::from("/abs"));
    }

    #[test]
    fn test_join_relative() {
        let root = Path::new("/site/dist");
        assert_eq!(join_relative(root, "css"), PathBuf::from("/site/dist/css"));
        assert_eq!(join_relative(root, "."), PathBuf::from("/site/dist"));
        assert_eq!(join_relative(root, ""), PathBuf::from("/site/dist"));
        assert_eq!(join_relative(root, "a/../b.html"), PathBuf::from("/site/dist/b.html"));
    }

    #[test]
    fn test_is_contained() {
        let root = Path::new("/site/dist");
        assert!(is_contained(root, Path::new("/site/dist/css/x.css")));
        assert!(is_contained(root, Path::new("/site/dist")));
        assert!(!is_contained(root, Path::new("/site/dist/../src")));
        assert!(!is_contained(root, Path::new("/site/distribution")));
    }

    #[test]
    fn test_to_slash() {
        assert_eq!(to_slash(Path::new("css/bundle.css")), "css/bundle.css");
        assert_eq!(to_slash(Path::new("./js/bundle.js")), "js/bundle.js");
        assert_eq!(
            relative_slash(Path::new("/site/dist"), Path::new("/site/dist/css/a.css")),
            "css/a.css"
        );
    }
}
