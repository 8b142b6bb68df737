//! A dependency-free ES module concatenator.
//!
//! Static single-line `import` statements are resolved and inlined once, in
//! dependency order; `export` keywords are stripped so the result is a plain
//! script. Dynamic imports and remote specifiers are left untouched.
//!
//! Concatenation keeps every top-level name as written, so only imports that
//! bind the exporter's own names are accepted. Aliased and namespace imports,
//! default imports whose name differs from the exported declaration, and
//! anonymous default exports are rejected with
//! [`TransformError::Unsupported`].

use super::{Bundle, BundleOptions, ScriptBundler};
use crate::errors::TransformError;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

#[allow(clippy::unwrap_used)]
static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+(?:([\w*{}\s,$]+?)\s+from\s+)?["']([^"']+)["']\s*;?\s*$"#).unwrap()
});

#[allow(clippy::unwrap_used)]
static REEXPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*export\s*(?:\{[^}]*\}|\*)\s*(?:from\s+.+)?;?\s*$").unwrap());

#[allow(clippy::unwrap_used)]
static NAMED_DEFAULT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^export\s+default\s+(?:(?:async\s+)?function\s*\*?\s*|class\s+)([A-Za-z_$][\w$]*)")
        .unwrap()
});

#[allow(clippy::unwrap_used)]
static DEFAULT_BINDING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^export\s+default\s+([A-Za-z_$][\w$]*)\s*;?\s*$").unwrap());

#[allow(clippy::unwrap_used)]
static BLOCK_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

const MAX_IMPORT_DEPTH: usize = 64;

fn unsupported(file: &Path, line: usize, message: impl Into<String>) -> TransformError {
    TransformError::Unsupported {
        origin: file.display().to_string(),
        line,
        message: message.into(),
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// The default [`ScriptBundler`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatBundler;

impl ConcatBundler {
    /// Creates a bundler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// State of one bundling pass.
struct Walk<'a> {
    include_paths: &'a [PathBuf],
    seen: HashSet<PathBuf>,
    /// Name of each visited module's default export.
    defaults: HashMap<PathBuf, Option<String>>,
    modules: Vec<String>,
}

impl Walk<'_> {
    fn collect(&mut self, file: &Path, depth: usize) -> Result<(), TransformError> {
        if depth > MAX_IMPORT_DEPTH {
            return Err(TransformError::parse(file.display(), "imports nested too deeply"));
        }
        let source = std::fs::read_to_string(file).map_err(|e| TransformError::io(file, &e))?;
        self.defaults
            .insert(canonical(file), default_export(file, &source)?);
        let base = file.parent().unwrap_or_else(|| Path::new("."));

        let mut body = String::with_capacity(source.len());
        for (index, line) in source.lines().enumerate() {
            let number = index + 1;
            if let Some(caps) = IMPORT_RE.captures(line) {
                let specifier = caps.get(2).map_or("", |m| m.as_str());
                if is_remote(specifier) {
                    body.push_str(line);
                    body.push('\n');
                    continue;
                }
                let binding = match caps.get(1) {
                    Some(clause) => default_binding(clause.as_str())
                        .map_err(|message| unsupported(file, number, message))?,
                    None => None,
                };
                let resolved = resolve_module(specifier, base, self.include_paths).ok_or_else(|| {
                    TransformError::Unresolved {
                        origin: file.display().to_string(),
                        reference: specifier.to_string(),
                    }
                })?;
                let key = canonical(&resolved);
                if self.seen.insert(key.clone()) {
                    self.collect(&resolved, depth + 1)?;
                }
                if let Some(binding) = binding {
                    let exported = self.defaults.get(&key).and_then(Option::as_deref);
                    if exported != Some(binding) {
                        return Err(unsupported(
                            file,
                            number,
                            format!(
                                "default import `{binding}` needs a default export named `{binding}` in {}",
                                resolved.display()
                            ),
                        ));
                    }
                }
                continue;
            }
            if is_static_import(line) {
                return Err(unsupported(file, number, "import statement spanning several lines"));
            }
            if REEXPORT_RE.is_match(line) || DEFAULT_BINDING_RE.is_match(line) {
                continue;
            }
            body.push_str(strip_export(line));
            body.push('\n');
        }
        self.modules.push(body);
        Ok(())
    }
}

impl ScriptBundler for ConcatBundler {
    fn bundle(&self, entry: &Path, options: &BundleOptions) -> Result<Bundle, TransformError> {
        let mut walk = Walk {
            include_paths: &options.include_paths,
            seen: HashSet::from([canonical(entry)]),
            defaults: HashMap::new(),
            modules: Vec::new(),
        };
        walk.collect(entry, 0)?;

        let mut code = String::new();
        for banner in &options.banner {
            code.push_str(banner);
            if !banner.ends_with('\n') {
                code.push('\n');
            }
        }
        for module in &walk.modules {
            code.push_str(module);
        }

        if options.minify {
            code = minify(&code);
        }
        Ok(Bundle { code })
    }
}

/// Finds the name a module's top-level `export default` binds.
fn default_export(file: &Path, source: &str) -> Result<Option<String>, TransformError> {
    for (index, line) in source.lines().enumerate() {
        if !(line.starts_with("export default ") || line.trim_end() == "export default") {
            continue;
        }
        if let Some(caps) = NAMED_DEFAULT_RE.captures(line) {
            if &caps[1] != "extends" {
                return Ok(Some(caps[1].to_string()));
            }
        }
        if let Some(caps) = DEFAULT_BINDING_RE.captures(line) {
            return Ok(Some(caps[1].to_string()));
        }
        return Err(unsupported(
            file,
            index + 1,
            "anonymous default export; name the function or class",
        ));
    }
    Ok(None)
}

/// Returns the default binding of an import clause, rejecting clauses that
/// rename.
fn default_binding(clause: &str) -> Result<Option<&str>, String> {
    if clause.contains('*') {
        return Err(format!("namespace import `{}`", clause.trim()));
    }
    let (head, named) = match clause.split_once('{') {
        Some((head, rest)) => (head, rest.trim_end().trim_end_matches('}')),
        None => (clause, ""),
    };
    if let Some(alias) = named
        .split(',')
        .map(str::trim)
        .find(|name| name.split_whitespace().count() > 1)
    {
        return Err(format!("aliased import `{alias}`"));
    }
    let head = head.trim().trim_end_matches(',').trim();
    Ok((!head.is_empty()).then_some(head))
}

fn is_static_import(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("import ") || trimmed.starts_with("import{")
}

fn is_remote(specifier: &str) -> bool {
    specifier.contains("://") || specifier.starts_with("//")
}

fn strip_export(line: &str) -> &str {
    let trimmed = line.trim_start();
    let indent = &line[..line.len() - trimmed.len()];
    if indent.is_empty() {
        trimmed
            .strip_prefix("export default ")
            .or_else(|| trimmed.strip_prefix("export "))
            .unwrap_or(line)
    } else {
        line
    }
}

fn resolve_module(specifier: &str, base: &Path, include_paths: &[PathBuf]) -> Option<PathBuf> {
    let candidates = |dir: &Path| {
        [
            dir.join(specifier),
            dir.join(format!("{specifier}.js")),
            dir.join(specifier).join("index.js"),
        ]
    };
    if specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/') {
        return candidates(base).into_iter().find(|p| p.is_file());
    }
    include_paths
        .iter()
        .flat_map(|dir| candidates(dir.as_path()))
        .find(|p| p.is_file())
}

/// Drops comments, indentation and blank lines. Line breaks are kept so
/// automatic semicolon insertion still applies.
fn minify(code: &str) -> String {
    let without_blocks = BLOCK_COMMENT_RE.replace_all(code, "");
    without_blocks
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}
