//! Vector graphics cleanup.

use super::VectorOptimizer;
use crate::errors::TransformError;
use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::unwrap_used)]
static STRIP_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?s)<\?xml.*?\?>",
        r"(?is)<!DOCTYPE[^>]*>",
        r"(?s)<!--.*?-->",
        r"(?is)<metadata\b.*?</metadata>",
        r"(?is)<title\b.*?</title>",
        r"(?is)<desc\b.*?</desc>",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

#[allow(clippy::unwrap_used)]
static BETWEEN_TAGS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").unwrap());

/// The default [`VectorOptimizer`].
///
/// Drops the XML prolog, doctype, comments and `metadata`/`title`/`desc`
/// elements, then removes whitespace between tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgCleaner;

impl SvgCleaner {
    /// Creates a cleaner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl VectorOptimizer for SvgCleaner {
    fn optimize(&self, svg: &str) -> Result<String, TransformError> {
        if !svg.contains("<svg") {
            return Err(TransformError::parse("svg", "no <svg> element found"));
        }
        let mut out = svg.to_string();
        for re in STRIP_RES.iter() {
            out = re.replace_all(&out, "").into_owned();
        }
        Ok(BETWEEN_TAGS_RE.replace_all(out.trim(), "><").into_owned())
    }
}
