//! Markup compilation.
//!
//! Every configured output is compiled concurrently against one frozen
//! snapshot of the shared context, taken when the stage starts. An output
//! ends written, skipped (its source is missing outside development) or
//! failed; failures do not stop sibling outputs, and are reported together
//! once every output has settled.

mod options;
mod page;

pub use options::{FormatSetting, Layout, MarkupOptions, PageOptions};
pub use page::BUILTIN_LAYOUT;

use super::scaffold::require_dir;
use super::Stage;
use crate::context::StageContext;
use crate::core::StageKind;
use crate::errors::StageError;
use async_trait::async_trait;
use futures::future::join_all;
use page::{PageOutcome, PageRenderer};
use tracing::{debug, info};

/// Renders pages through an optional layout and formats the result.
#[derive(Debug, Clone)]
pub struct MarkupStage {
    options: MarkupOptions,
}

impl MarkupStage {
    /// Creates a new markup stage.
    #[must_use]
    pub fn new(options: MarkupOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Stage for MarkupStage {
    fn kind(&self) -> StageKind {
        StageKind::Markup
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let kind = self.kind();
        if self.options.output.is_empty() {
            return Err(StageError::invalid(kind, "\"output\" is empty"));
        }

        let src_dir = ctx.src_path(self.options.location.src().unwrap_or("html"));
        require_dir(ctx, &src_dir).await?;
        let out_dir = ctx.dist_path(self.options.output_root());
        let snapshot = ctx.snapshot();

        let renderer = PageRenderer {
            options: &self.options,
            src_dir: &src_dir,
            out_dir: &out_dir,
            env: ctx.env(),
            toolchain: ctx.toolchain(),
            snapshot: &snapshot,
        };
        let reports = join_all(
            self.options
                .output
                .iter()
                .map(|(name, page)| renderer.render(name, page)),
        )
        .await;

        let (mut written, mut skipped) = (0, 0);
        let mut failures = Vec::new();
        for report in reports {
            for warning in report.warnings {
                ctx.warn(warning);
            }
            match report.outcome {
                PageOutcome::Written(path) => {
                    debug!(stage = %kind, path = %path.display(), "Wrote page");
                    written += 1;
                }
                PageOutcome::Skipped => skipped += 1,
                PageOutcome::Failed(failure) => failures.push(failure),
            }
        }

        info!(
            stage = %kind,
            written,
            skipped,
            failed = failures.len(),
            "Compiled markup"
        );
        if failures.is_empty() {
            Ok(())
        } else {
            Err(StageError::Outputs { kind, failures })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BundleArtifact, Environment, LocaleArtifact};
    use crate::testing::SiteFixture;
    use crate::transform::{MockMarkupFormatter, Toolchain};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn publish_bundles(site: &SiteFixture) {
        site.ctx(StageKind::Stylesheet)
            .publish(&BundleArtifact::new("body{}", "css/bundle.css"))
            .unwrap();
        site.ctx(StageKind::Script)
            .publish(&BundleArtifact::new("run()", "js/bundle.js"))
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_output_is_invalid() {
        let site = SiteFixture::development();
        let err = site.run_kind(StageKind::Markup, json!(true)).await.unwrap_err();
        assert!(matches!(err, StageError::InvalidOptions { .. }));
    }

    #[tokio::test]
    async fn test_raw_environment_renders_vars() {
        let site = SiteFixture::new(Environment::parse("staging"));
        site.write_src("html/home.html", "<p>{{ greeting }} {{ who }} {{ pageName }}</p>");

        site.run_kind(
            StageKind::Markup,
            json!({
                "vars": {"greeting": "hello", "who": "stage"},
                "output": {"home": {"vars": {"who": "page"}}},
            }),
        )
        .await
        .unwrap();

        assert_eq!(site.read_dist("home.html"), "<p>hello page home</p>");
    }

    #[tokio::test]
    async fn test_layout_wraps_content_with_bundle_filenames() {
        let site = SiteFixture::new(Environment::parse("staging"));
        publish_bundles(&site);
        site.write_src("html/layout.html", "<main data-css=\"{{{cssFilename}}}\">{{> content}}</main><script src=\"{{{jsFilename}}}\"></script>");
        site.write_src("html/about.html", "<p>about</p>");

        site.run_kind(
            StageKind::Markup,
            json!({"layout": "layout.html", "output": {"about": {}}}),
        )
        .await
        .unwrap();

        assert_eq!(
            site.read_dist("about.html"),
            "<main data-css=\"css/bundle.css\"><p>about</p></main><script src=\"js/bundle.js\"></script>"
        );
    }

    #[tokio::test]
    async fn test_builtin_layout_and_custom_tags() {
        let site = SiteFixture::new(Environment::parse("staging"));
        publish_bundles(&site);
        site.write_src("html/index.html", "<p><% pageName %></p>");

        site.run_kind(
            StageKind::Markup,
            json!({"layout": true, "tags": ["<%", "%>"], "output": {"index": {}}}),
        )
        .await
        .unwrap();

        let html = site.read_dist("index.html");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>index</title>"));
        assert!(html.contains("<p>index</p>"));
        assert!(html.contains("href='css/bundle.css'"));
        assert!(html.contains("src='js/bundle.js'"));
    }

    #[tokio::test]
    async fn test_locales_use_markup_name() {
        let site = SiteFixture::new(Environment::parse("staging"));
        site.ctx(StageKind::I18n)
            .publish(&LocaleArtifact {
                store: [("en".to_string(), json!({"hello": "hi"}))].into_iter().collect(),
                name: "T".to_string(),
                html_name: "H".to_string(),
            })
            .unwrap();
        site.write_src("html/index.html", "{{i18n.name}}: {{i18n.store.en.hello}}");

        site.run_kind(StageKind::Markup, json!({"output": {"index": {}}}))
            .await
            .unwrap();

        assert_eq!(site.read_dist("index.html"), "H: hi");
    }

    #[tokio::test]
    async fn test_development_scaffolds_page_and_layout() {
        let site = SiteFixture::development();
        site.run_kind(
            StageKind::Markup,
            json!({"output": {"home": {"layout": "base.html"}}}),
        )
        .await
        .unwrap();

        assert_eq!(site.read_src("html/home.html"), "<h1>Stub home</h1>");
        assert_eq!(site.read_src("html/base.html"), BUILTIN_LAYOUT);
        assert!(site.read_dist("home.html").contains("<h1>Stub home</h1>"));

        site.write_src("html/home.html", "<h2>mine</h2>");
        site.run_kind(
            StageKind::Markup,
            json!({"output": {"home": {"layout": false}}}),
        )
        .await
        .unwrap();
        assert_eq!(site.read_src("html/home.html"), "<h2>mine</h2>");
        assert_eq!(site.read_dist("home.html"), "<h2>mine</h2>\n");
    }

    #[tokio::test]
    async fn test_missing_source_is_skipped_outside_development() {
        let site = SiteFixture::production();
        site.write_src("html/a.html", "<p>a</p>");

        let warnings = site
            .run_kind(StageKind::Markup, json!({"output": {"a": {}, "b": {}}}))
            .await
            .unwrap();

        assert_eq!(site.read_dist("a.html"), "<p>a</p>");
        assert!(!site.dist_exists("b.html"));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("'b'"));
    }

    #[tokio::test]
    async fn test_failures_are_collected_after_siblings_finish() {
        let site = SiteFixture::production();
        site.write_src("html/ok.html", "<p>ok</p>");
        site.write_src("html/bad.html", "{{#open}}never closed");
        site.write_src("html/nolayout.html", "<p>x</p>");

        let err = site
            .run_kind(
                StageKind::Markup,
                json!({"output": {
                    "ok": {},
                    "bad": {},
                    "nolayout": {"layout": "missing.html"},
                }}),
            )
            .await
            .unwrap_err();

        assert!(site.dist_exists("ok.html"));
        let StageError::Outputs { failures, .. } = err else {
            panic!("expected output failures");
        };
        let mut names: Vec<_> = failures.iter().map(|f| f.output.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["bad", "nolayout"]);
    }

    #[tokio::test]
    async fn test_partials_and_svg_fragments() {
        let site = SiteFixture::new(Environment::parse("staging"));
        site.ctx(StageKind::Vector)
            .publish(&json!({"svg-logo": "<svg id=\"logo\"/>"}))
            .unwrap();
        site.write_src("html/parts/nav.html", "<nav>{{ pageName }}</nav>");
        site.write_src("html/home.html", "{{> nav}}{{> footer}}{{> svg-logo}}");

        let warnings = site
            .run_kind(
                StageKind::Markup,
                json!({
                    "elements": {"nav": "parts/nav.html"},
                    "output": {"home": {"elements": {"footer": "parts/footer.html"}}},
                }),
            )
            .await
            .unwrap();

        assert_eq!(site.read_dist("home.html"), "<nav>home</nav><svg id=\"logo\"/>");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("footer"));
    }

    #[tokio::test]
    async fn test_formatting_precedence() {
        let mut formatter = MockMarkupFormatter::new();
        formatter
            .expect_beautify()
            .returning(|html, _| format!("B:{html}"));
        formatter
            .expect_minify()
            .returning(|html, _| format!("M:{html}"));
        let formatter = Arc::new(formatter);

        let cases = [
            (Environment::Production, json!({"beautify": true, "minify": true}), "B:x"),
            (Environment::Development, json!({"minify": {"removeComments": false}}), "M:x"),
            (Environment::Development, json!({}), "B:x"),
            (Environment::Production, json!({}), "M:x"),
            (Environment::parse("test"), json!({}), "x"),
        ];
        for (env, mut options, expected) in cases {
            let site = SiteFixture::new(env)
                .with_toolchain(Toolchain::new().with_markup(formatter.clone()));
            site.write_src("html/p.html", "x");
            options["output"] = json!({"p": {}});

            site.run_kind(StageKind::Markup, options).await.unwrap();
            assert_eq!(site.read_dist("p.html"), expected);
        }
    }

    #[tokio::test]
    async fn test_explicit_dist_path_moves_outputs() {
        let site = SiteFixture::new(Environment::parse("staging"));
        site.write_src("pages/home.html", "home");

        site.run_kind(
            StageKind::Markup,
            json!({"path": "pages", "distPath": "site", "output": {"home": {"distPath": "index.htm"}}}),
        )
        .await
        .unwrap();

        assert_eq!(site.read_dist("site/index.htm"), "home");
    }
}
