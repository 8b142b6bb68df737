//! Stylesheet compiler backed by lightningcss.

use super::{CompiledStyle, StyleCompiler, StyleOptions};
use crate::errors::TransformError;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Maximum `@import` nesting.
const MAX_IMPORT_DEPTH: usize = 32;

/// Extensions tried for extension-less imports.
const IMPORT_EXTENSIONS: [&str; 2] = ["less", "css"];

#[allow(clippy::unwrap_used)]
static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*@import\s+(?:url\(\s*)?["']([^"']+)["']\s*\)?[^;\n]*;[ \t]*\r?\n?"#)
        .unwrap()
});

/// Browser versions are encoded as `major << 16 | minor << 8`.
const fn version(major: u32) -> Option<u32> {
    Some(major << 16)
}

/// The default [`StyleCompiler`].
///
/// Local `@import`s are inlined (searched next to the importing file, then in
/// the include paths); the result is parsed, vendor-prefixed for the
/// configured browser targets and printed.
#[derive(Debug, Clone, Copy)]
pub struct LightningStyleCompiler {
    browsers: Browsers,
}

impl Default for LightningStyleCompiler {
    fn default() -> Self {
        Self {
            browsers: Browsers {
                android: version(100),
                chrome: version(100),
                edge: version(100),
                firefox: version(100),
                ios_saf: version(14),
                opera: version(86),
                safari: version(14),
                samsung: version(16),
                ..Browsers::default()
            },
        }
    }
}

impl LightningStyleCompiler {
    /// Creates a compiler with the default browser targets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a compiler with explicit browser targets.
    #[must_use]
    pub fn with_browsers(browsers: Browsers) -> Self {
        Self { browsers }
    }

    fn inline_imports(
        &self,
        file: &Path,
        include_paths: &[PathBuf],
        seen: &mut HashSet<PathBuf>,
        depth: usize,
    ) -> Result<String, TransformError> {
        if depth > MAX_IMPORT_DEPTH {
            return Err(TransformError::parse(
                file.display(),
                "imports nested too deeply",
            ));
        }
        let source = std::fs::read_to_string(file).map_err(|e| TransformError::io(file, &e))?;
        let base = file.parent().unwrap_or_else(|| Path::new("."));

        let mut out = String::with_capacity(source.len());
        let mut last = 0;
        for caps in IMPORT_RE.captures_iter(&source) {
            let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let reference = target.as_str();
            if is_remote(reference) {
                continue;
            }
            out.push_str(&source[last..whole.start()]);
            last = whole.end();

            let resolved = resolve_import(reference, base, include_paths).ok_or_else(|| {
                TransformError::Unresolved {
                    origin: file.display().to_string(),
                    reference: reference.to_string(),
                }
            })?;
            let key = resolved.canonicalize().unwrap_or_else(|_| resolved.clone());
            if seen.insert(key) {
                let nested = self.inline_imports(&resolved, include_paths, seen, depth + 1)?;
                out.push_str(&nested);
                if !nested.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
        out.push_str(&source[last..]);
        Ok(out)
    }
}

impl StyleCompiler for LightningStyleCompiler {
    fn compile(&self, entry: &Path, options: &StyleOptions) -> Result<CompiledStyle, TransformError> {
        let mut seen = HashSet::new();
        seen.insert(entry.canonicalize().unwrap_or_else(|_| entry.to_path_buf()));
        let source = self.inline_imports(entry, &options.include_paths, &mut seen, 0)?;

        let origin = entry.display().to_string();
        let mut sheet = StyleSheet::parse(
            &source,
            ParserOptions {
                filename: origin.clone(),
                error_recovery: true,
                ..ParserOptions::default()
            },
        )
        .map_err(|e| TransformError::parse(&origin, e))?;

        sheet
            .minify(MinifyOptions {
                targets: Targets::from(self.browsers),
                ..MinifyOptions::default()
            })
            .map_err(|e| TransformError::parse(&origin, e))?;

        let printed = sheet
            .to_css(PrinterOptions {
                minify: options.minify,
                targets: Targets::from(self.browsers),
                ..PrinterOptions::default()
            })
            .map_err(|e| TransformError::parse(&origin, e))?;

        Ok(CompiledStyle { css: printed.code })
    }
}

fn is_remote(reference: &str) -> bool {
    reference.starts_with("http:")
        || reference.starts_with("https:")
        || reference.starts_with("//")
        || reference.starts_with("data:")
}

fn resolve_import(reference: &str, base: &Path, include_paths: &[PathBuf]) -> Option<PathBuf> {
    let has_extension = Path::new(reference).extension().is_some();
    std::iter::once(base)
        .chain(include_paths.iter().map(PathBuf::as_path))
        .flat_map(|dir| {
            let direct = dir.join(reference);
            let with_ext: Vec<PathBuf> = if has_extension {
                Vec::new()
            } else {
                IMPORT_EXTENSIONS
                    .iter()
                    .map(|ext| dir.join(format!("{reference}.{ext}")))
                    .collect()
            };
            std::iter::once(direct).chain(with_ext)
        })
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(dir: &Path, entry: &str, minify: bool) -> Result<String, TransformError> {
        LightningStyleCompiler::new()
            .compile(
                &dir.join(entry),
                &StyleOptions {
                    include_paths: vec![dir.join("shared")],
                    minify,
                },
            )
            .map(|c| c.css)
    }

    #[test]
    fn test_minified_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.less"), "body {\n  color: red;\n}\n").unwrap();

        let css = compile(dir.path(), "index.less", true).unwrap();
        assert_eq!(css, "body{color:red}");
    }

    #[test]
    fn test_readable_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.less"), "body{color:red}").unwrap();

        let css = compile(dir.path(), "index.less", false).unwrap();
        assert!(css.contains("body {"));
        assert!(css.contains("color: red"));
    }

    #[test]
    fn test_imports_inlined_from_base_and_include_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("shared")).unwrap();
        std::fs::write(dir.path().join("shared/vars.css"), "h1{padding:0}").unwrap();
        std::fs::write(dir.path().join("local.less"), "p{margin:0}").unwrap();
        std::fs::write(
            dir.path().join("index.less"),
            "@import \"local\";\n@import 'vars.css';\n@import 'vars.css';\nbody{color:red}\n",
        )
        .unwrap();

        let css = compile(dir.path(), "index.less", true).unwrap();
        assert!(css.contains("p{margin:0}"));
        assert_eq!(css.matches("h1{padding:0}").count(), 1);
        assert!(css.contains("body{color:red}"));
    }

    #[test]
    fn test_remote_imports_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("index.less"),
            "@import url(\"https://example.com/a.css\");\nbody{color:red}",
        )
        .unwrap();

        let css = compile(dir.path(), "index.less", true).unwrap();
        assert!(css.contains("example.com/a.css"));
    }

    #[test]
    fn test_unresolved_import_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.less"), "@import 'nope';").unwrap();

        let err = compile(dir.path(), "index.less", true).unwrap_err();
        assert!(matches!(err, TransformError::Unresolved { .. }));
    }
}
