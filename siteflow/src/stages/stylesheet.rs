//! Stylesheet compilation.

use super::scaffold::{require_dir, require_file};
use super::{PathOptions, Stage};
use crate::context::StageContext;
use crate::core::{BundleArtifact, StageKind};
use crate::errors::StageError;
use crate::transform::StyleOptions;
use crate::utils::{fs, relative_slash};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

const STUB: &str = "/* Stub index.less */\n* { background: #009688; }";

/// Options for the stylesheet stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylesheetOptions {
    /// Source (default `less`) and output (default `css`) locations.
    #[serde(flatten)]
    pub location: PathOptions,
    /// Entry file inside the source folder.
    pub entry: String,
    /// Output file name inside the output folder.
    pub filename: String,
    /// Extra import search folders, relative to the source root.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Skip writing the output file.
    #[serde(default)]
    pub no_file: bool,
    /// Publish the compiled code for the markup stage.
    pub expose_html: bool,
}

impl Default for StylesheetOptions {
    fn default() -> Self {
        Self {
            location: PathOptions::split("less", "css"),
            entry: "index.less".to_string(),
            filename: "bundle.css".to_string(),
            paths: Vec::new(),
            no_file: false,
            expose_html: true,
        }
    }
}

/// Compiles the stylesheet entry into a single CSS file.
#[derive(Debug, Clone)]
pub struct StylesheetStage {
    options: StylesheetOptions,
}

impl StylesheetStage {
    /// Creates a new stylesheet stage.
    #[must_use]
    pub fn new(options: StylesheetOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Stage for StylesheetStage {
    fn kind(&self) -> StageKind {
        StageKind::Stylesheet
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let kind = self.kind();
        let options = &self.options;
        let src_dir = ctx.src_path(options.location.src().unwrap_or("less"));
        require_dir(ctx, &src_dir).await?;
        let entry = src_dir.join(&options.entry);
        require_file(ctx, &entry, STUB).await?;

        let mut include_paths = vec![src_dir.clone()];
        include_paths.extend(options.paths.iter().map(|p| ctx.src_path(p)));
        let style_options = StyleOptions {
            include_paths,
            minify: ctx.env().minifies(),
        };

        let compiled = ctx
            .toolchain()
            .styles
            .compile(&entry, &style_options)
            .map_err(|e| StageError::transform(kind, e))?;

        let target = ctx
            .dist_path(options.location.dist().unwrap_or("css"))
            .join(&options.filename);
        let filename = if options.no_file {
            String::new()
        } else {
            fs::write_file(&target, &compiled.css)
                .await
                .map_err(|e| StageError::io(kind, &target, e))?;
            relative_slash(ctx.dist_root(), &target)
        };

        info!(
            stage = %kind,
            entry = %entry.display(),
            bytes = compiled.css.len(),
            minified = style_options.minify,
            "Compiled stylesheet"
        );

        if options.expose_html || options.no_file {
            ctx.publish(&BundleArtifact::new(compiled.css, filename))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransformError;
    use crate::testing::SiteFixture;
    use crate::transform::{CompiledStyle, MockStyleCompiler, Toolchain};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_development_scaffolds_and_compiles() {
        let site = SiteFixture::development();
        site.run_kind(StageKind::Stylesheet, json!(true)).await.unwrap();

        assert_eq!(site.read_src("less/index.less"), STUB);
        let css = site.read_dist("css/bundle.css");
        assert!(css.contains("#009688"));

        let artifact: BundleArtifact = site.shared.get_as("stylesheet").unwrap();
        assert_eq!(artifact.filename, "css/bundle.css");
        assert_eq!(artifact.code, css);
    }

    #[tokio::test]
    async fn test_production_minifies_with_include_paths() {
        let mut compiler = MockStyleCompiler::new();
        compiler
            .expect_compile()
            .withf(|entry, options| {
                entry.ends_with("styles/main.less")
                    && options.minify
                    && options.include_paths.len() == 2
                    && options.include_paths[1].ends_with("vendor")
            })
            .returning(|_, _| {
                Ok(CompiledStyle {
                    css: "a{b:c}".to_string(),
                })
            });
        let site = SiteFixture::production()
            .with_toolchain(Toolchain::new().with_styles(Arc::new(compiler)));
        site.write_src("styles/main.less", "a { b: c; }");

        site.run_kind(
            StageKind::Stylesheet,
            json!({"path": "styles", "entry": "main.less", "paths": ["vendor"]}),
        )
        .await
        .unwrap();

        assert_eq!(site.read_dist("styles/bundle.css"), "a{b:c}");
    }

    #[tokio::test]
    async fn test_no_file_publishes_without_writing() {
        let site = SiteFixture::production();
        site.write_src("less/index.less", "p { margin: 0; }");

        site.run_kind(
            StageKind::Stylesheet,
            json!({"noFile": true, "exposeHtml": false}),
        )
        .await
        .unwrap();

        assert!(site.dist_is_empty());
        let artifact: BundleArtifact = site.shared.get_as("stylesheet").unwrap();
        assert_eq!(artifact.filename, "");
        assert!(artifact.code.contains("margin"));
    }

    #[tokio::test]
    async fn test_expose_html_false_keeps_context_clean() {
        let site = SiteFixture::production();
        site.write_src("less/index.less", "p { margin: 0; }");

        site.run_kind(StageKind::Stylesheet, json!({"exposeHtml": false}))
            .await
            .unwrap();

        assert!(site.dist_exists("css/bundle.css"));
        assert!(!site.shared.contains("stylesheet"));
    }

    #[tokio::test]
    async fn test_production_missing_entry_writes_nothing() {
        let site = SiteFixture::production();
        site.write_src("less/other.less", "");

        let err = site.run_kind(StageKind::Stylesheet, json!({})).await.unwrap_err();
        assert!(matches!(err, StageError::MissingInput { .. }));
        assert!(site.dist_is_empty());
        assert!(!site.src_exists("less/index.less"));
    }

    #[tokio::test]
    async fn test_compile_error_fails_stage() {
        let mut compiler = MockStyleCompiler::new();
        compiler
            .expect_compile()
            .returning(|entry, _| Err(TransformError::parse(entry.display(), "unexpected }")));
        let site = SiteFixture::production()
            .with_toolchain(Toolchain::new().with_styles(Arc::new(compiler)));
        site.write_src("less/index.less", "}");

        let err = site.run_kind(StageKind::Stylesheet, json!(true)).await.unwrap_err();
        assert!(matches!(err, StageError::Transform { .. }));
        assert!(site.dist_is_empty());
    }
}
