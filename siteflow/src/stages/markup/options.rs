//! Markup stage options.

use crate::stages::PathOptions;
use crate::transform::{BeautifyOptions, Delimiters, MinifyOptions};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A layout setting: a template path, or a flag.
///
/// `true` selects the built-in layout, `false` disables layouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Layout {
    /// `true` or `false`.
    Flag(bool),
    /// Template path relative to the stage source folder.
    Path(String),
}

/// A formatting pass setting: a switch, or options (which enable it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormatSetting<T> {
    /// On with default options, or off.
    Enabled(bool),
    /// On with these options.
    Options(T),
}

impl<T> Default for FormatSetting<T> {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl<T: Clone + Default> FormatSetting<T> {
    /// Returns the options to format with, or `None` if the pass is off.
    #[must_use]
    pub fn options(&self) -> Option<T> {
        match self {
            Self::Enabled(true) => Some(T::default()),
            Self::Enabled(false) => None,
            Self::Options(options) => Some(options.clone()),
        }
    }
}

/// One named output of the markup stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageOptions {
    /// Source (relative to the stage source folder) and output (relative to
    /// the stage output folder) paths. Both default to `<name>.<defaultExtension>`.
    #[serde(flatten)]
    pub location: PathOptions,
    /// Overrides the stage layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    /// Variables for this output only.
    #[serde(default)]
    pub vars: Map<String, Value>,
    /// Partials for this output only, name to path.
    #[serde(default)]
    pub elements: BTreeMap<String, String>,
}

impl PageOptions {
    /// Returns the source path of the output named `name`.
    #[must_use]
    pub fn src(&self, name: &str, extension: &str) -> String {
        self.location
            .src()
            .map_or_else(|| format!("{name}.{extension}"), str::to_string)
    }

    /// Returns the output path of the output named `name`.
    #[must_use]
    pub fn dist(&self, name: &str, extension: &str) -> String {
        self.location
            .dist()
            .map_or_else(|| format!("{name}.{extension}"), str::to_string)
    }
}

/// Options for the markup stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkupOptions {
    /// Source folder (default `html`). Outputs are written under the root of
    /// the output tree unless `distPath` is set explicitly.
    #[serde(flatten)]
    pub location: PathOptions,
    /// Template delimiters.
    pub tags: Delimiters,
    /// Extension of the default source and output file names.
    pub default_extension: String,
    /// Layout applied to every output that does not override it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    /// Variables for every output.
    #[serde(default)]
    pub vars: Map<String, Value>,
    /// Partials for every output, name to path.
    #[serde(default)]
    pub elements: BTreeMap<String, String>,
    /// Pretty-print every output.
    #[serde(default)]
    pub beautify: FormatSetting<BeautifyOptions>,
    /// Minify every output (ignored when `beautify` is on).
    #[serde(default)]
    pub minify: FormatSetting<MinifyOptions>,
    /// The outputs to compile, by name.
    #[serde(default)]
    pub output: BTreeMap<String, PageOptions>,
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self {
            location: PathOptions::shared("html"),
            tags: Delimiters::default(),
            default_extension: "html".to_string(),
            layout: None,
            vars: Map::new(),
            elements: BTreeMap::new(),
            beautify: FormatSetting::default(),
            minify: FormatSetting::default(),
            output: BTreeMap::new(),
        }
    }
}

impl MarkupOptions {
    /// Returns the folder outputs are written under, relative to the output root.
    #[must_use]
    pub fn output_root(&self) -> &str {
        self.location.dist_path.as_deref().unwrap_or(".")
    }
}
