//! Transform ports: the external tools stages delegate to.
//!
//! Stages never implement a transform algorithm themselves. They resolve
//! paths, scaffold inputs, pick an output style and publish artifacts; the
//! actual compilation goes through the traits below. Every trait has a
//! default implementation so a [`Toolchain::default`] builds a site end to
//! end, and each can be swapped independently.

mod css;
mod font;
mod html;
mod js;
mod raster;
mod svg;
mod template;

pub use css::LightningStyleCompiler;
pub use font::{font_face_css, FontCopier};
pub use html::{BasicMarkupFormatter, BeautifyOptions, MinifyOptions};
pub use js::ConcatBundler;
pub use raster::RasterRecompressor;
pub use svg::SvgCleaner;
pub use template::MustacheRenderer;

use crate::errors::TransformError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Open/close delimiters for template tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[String; 2]", into = "[String; 2]")]
pub struct Delimiters {
    /// Opening delimiter.
    pub open: String,
    /// Closing delimiter.
    pub close: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new("{{", "}}")
    }
}

impl Delimiters {
    /// Creates a delimiter pair.
    #[must_use]
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

impl From<[String; 2]> for Delimiters {
    fn from([open, close]: [String; 2]) -> Self {
        Self { open, close }
    }
}

impl From<Delimiters> for [String; 2] {
    fn from(d: Delimiters) -> Self {
        [d.open, d.close]
    }
}

/// Renders logic-less templates.
#[cfg_attr(test, mockall::automock)]
pub trait TemplateRenderer: Send + Sync {
    /// Renders `template` against `vars`, resolving `{{> name}}` from `partials`.
    fn render(
        &self,
        template: &str,
        vars: &serde_json::Value,
        partials: &HashMap<String, String>,
        tags: &Delimiters,
    ) -> Result<String, TransformError>;
}

/// Options for stylesheet compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleOptions {
    /// Directories searched for imports, in order.
    pub include_paths: Vec<PathBuf>,
    /// Emit minified CSS.
    pub minify: bool,
}

/// A compiled stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStyle {
    /// The CSS.
    pub css: String,
}

/// Compiles a stylesheet entry file to CSS.
#[cfg_attr(test, mockall::automock)]
pub trait StyleCompiler: Send + Sync {
    /// Compiles `entry`.
    fn compile(&self, entry: &Path, options: &StyleOptions) -> Result<CompiledStyle, TransformError>;
}

/// Options for script bundling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleOptions {
    /// Directories searched for bare imports, in order.
    pub include_paths: Vec<PathBuf>,
    /// Code placed before the bundle, in order.
    pub banner: Vec<String>,
    /// Down-level the output (bundlers without a transpiler ignore it).
    pub transpile: bool,
    /// Emit minified code.
    pub minify: bool,
}

/// A bundled script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// The code, banner included.
    pub code: String,
}

/// Bundles a script entry file and its imports.
#[cfg_attr(test, mockall::automock)]
pub trait ScriptBundler: Send + Sync {
    /// Bundles `entry`.
    fn bundle(&self, entry: &Path, options: &BundleOptions) -> Result<Bundle, TransformError>;
}

/// Pretty-prints or minifies markup.
#[cfg_attr(test, mockall::automock)]
pub trait MarkupFormatter: Send + Sync {
    /// Returns human-readable markup.
    fn beautify(&self, html: &str, options: &BeautifyOptions) -> String;

    /// Returns minified markup.
    fn minify(&self, html: &str, options: &MinifyOptions) -> String;
}

/// Raster formats the image stage recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    /// PNG.
    Png,
    /// JPEG.
    Jpeg,
}

impl RasterFormat {
    /// Detects the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

/// Recompresses raster images.
#[cfg_attr(test, mockall::automock)]
pub trait ImageOptimizer: Send + Sync {
    /// Returns optimized bytes for an image of `format`.
    fn optimize(&self, bytes: &[u8], format: RasterFormat) -> Result<Vec<u8>, TransformError>;
}

/// Cleans up vector graphics markup.
#[cfg_attr(test, mockall::automock)]
pub trait VectorOptimizer: Send + Sync {
    /// Returns optimized markup.
    fn optimize(&self, svg: &str) -> Result<String, TransformError>;
}

/// Converts a font file into web fonts inside `dist_dir`.
#[cfg_attr(test, mockall::automock)]
pub trait FontConverter: Send + Sync {
    /// Returns the files written.
    fn convert(&self, font: &Path, dist_dir: &Path) -> Result<Vec<PathBuf>, TransformError>;
}

/// The set of transform implementations a pipeline uses.
#[derive(Clone)]
pub struct Toolchain {
    /// Template renderer.
    pub renderer: Arc<dyn TemplateRenderer>,
    /// Stylesheet compiler.
    pub styles: Arc<dyn StyleCompiler>,
    /// Script bundler.
    pub scripts: Arc<dyn ScriptBundler>,
    /// Markup formatter.
    pub markup: Arc<dyn MarkupFormatter>,
    /// Raster image optimizer.
    pub images: Arc<dyn ImageOptimizer>,
    /// Vector graphics optimizer.
    pub vectors: Arc<dyn VectorOptimizer>,
    /// Font converter.
    pub fonts: Arc<dyn FontConverter>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            renderer: Arc::new(MustacheRenderer::new()),
            styles: Arc::new(LightningStyleCompiler::new()),
            scripts: Arc::new(ConcatBundler::new()),
            markup: Arc::new(BasicMarkupFormatter::new()),
            images: Arc::new(RasterRecompressor::new()),
            vectors: Arc::new(SvgCleaner::new()),
            fonts: Arc::new(FontCopier::new()),
        }
    }
}

impl fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Toolchain").finish_non_exhaustive()
    }
}

impl Toolchain {
    /// Creates the default toolchain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the template renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Sets the stylesheet compiler.
    #[must_use]
    pub fn with_styles(mut self, styles: Arc<dyn StyleCompiler>) -> Self {
        self.styles = styles;
        self
    }

    /// Sets the script bundler.
    #[must_use]
    pub fn with_scripts(mut self, scripts: Arc<dyn ScriptBundler>) -> Self {
        self.scripts = scripts;
        self
    }

    /// Sets the markup formatter.
    #[must_use]
    pub fn with_markup(mut self, markup: Arc<dyn MarkupFormatter>) -> Self {
        self.markup = markup;
        self
    }

    /// Sets the raster image optimizer.
    #[must_use]
    pub fn with_images(mut self, images: Arc<dyn ImageOptimizer>) -> Self {
        self.images = images;
        self
    }

    /// Sets the vector optimizer.
    #[must_use]
    pub fn with_vectors(mut self, vectors: Arc<dyn VectorOptimizer>) -> Self {
        self.vectors = vectors;
        self
    }

    /// Sets the font converter.
    #[must_use]
    pub fn with_fonts(mut self, fonts: Arc<dyn FontConverter>) -> Self {
        self.fonts = fonts;
        self
    }
}
