//! Font handling: the default converter and `@font-face` generation.

use super::FontConverter;
use crate::errors::TransformError;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Font file extensions and their CSS `format()` hint, in preference order.
const FORMATS: [(&str, &str); 4] = [
    ("woff2", "woff2"),
    ("woff", "woff"),
    ("ttf", "truetype"),
    ("otf", "opentype"),
];

fn format_of(path: &Path) -> Option<(usize, &'static str)> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    FORMATS
        .iter()
        .position(|(e, _)| *e == ext)
        .map(|i| (i, FORMATS[i].1))
}

/// The default [`FontConverter`]: copies the font unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontCopier;

impl FontCopier {
    /// Creates a copier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FontConverter for FontCopier {
    fn convert(&self, font: &Path, dist_dir: &Path) -> Result<Vec<PathBuf>, TransformError> {
        let name = font
            .file_name()
            .ok_or_else(|| TransformError::parse(font.display(), "not a file"))?;
        std::fs::create_dir_all(dist_dir).map_err(|e| TransformError::io(dist_dir, &e))?;
        let target = dist_dir.join(name);
        std::fs::copy(font, &target).map_err(|e| TransformError::io(font, &e))?;
        Ok(vec![target])
    }
}

/// Builds a stylesheet with one `@font-face` rule per font family.
///
/// Files are grouped by stem (the stem is the family name) and referenced by
/// file name, so the stylesheet must sit next to them. Files with an unknown
/// extension are ignored.
#[must_use]
pub fn font_face_css(files: &[PathBuf]) -> String {
    let mut families: BTreeMap<String, Vec<(usize, &'static str, String)>> = BTreeMap::new();
    for file in files {
        let (Some((rank, hint)), Some(stem), Some(name)) = (
            format_of(file),
            file.file_stem().and_then(|s| s.to_str()),
            file.file_name().and_then(|s| s.to_str()),
        ) else {
            continue;
        };
        families
            .entry(stem.to_string())
            .or_default()
            .push((rank, hint, name.to_string()));
    }

    let mut css = String::new();
    for (family, mut sources) in families {
        sources.sort();
        sources.dedup();
        let src = sources
            .iter()
            .map(|(_, hint, name)| format!("url('{name}') format('{hint}')"))
            .collect::<Vec<_>>()
            .join(",\n       ");
        let _ = write!(
            css,
            "@font-face {{\n  font-family: '{family}';\n  src: {src};\n  font-display: swap;\n}}\n"
        );
    }
    css
}
