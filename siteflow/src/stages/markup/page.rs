//! Compilation of a single markup output.

use super::options::{Layout, MarkupOptions, PageOptions};
use crate::context::ContextSnapshot;
use crate::core::{BundleArtifact, Environment, LocaleArtifact, OutputStyle, StageKind};
use crate::errors::OutputFailure;
use crate::transform::{Delimiters, Toolchain};
use crate::utils::{fs, join_relative};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Layout used when `layout` is `true`, and written when a configured layout
/// file is scaffolded.
pub const BUILTIN_LAYOUT: &str = "<!DOCTYPE html>
<html lang='en'>
<head>
  <title>{{ pageName }}</title>
  <meta charset='utf-8'>
  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1, shrink-to-fit=no\">
  <link rel='icon' href='favicon.ico'>
  <link rel='stylesheet' type='text/css' href='{{& cssFilename }}'>
</head>
<body>
  {{> content}}
  <script type='text/javascript' src='{{& jsFilename }}'></script>
</body>
</html>";

/// Name of the partial a layout includes the page through.
const CONTENT_PARTIAL: &str = "content";

/// Returns the built-in layout written with `tags`.
pub(crate) fn builtin_layout(tags: &Delimiters) -> String {
    if *tags == Delimiters::default() {
        return BUILTIN_LAYOUT.to_string();
    }
    BUILTIN_LAYOUT
        .replace("{{", &tags.open)
        .replace("}}", &tags.close)
}

fn page_stub(name: &str) -> String {
    format!("<h1>Stub {name}</h1>")
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LayoutSource {
    None,
    Builtin,
    File(String),
}

fn layout_source(page: Option<&Layout>, stage: Option<&Layout>) -> LayoutSource {
    match page {
        Some(Layout::Path(path)) => LayoutSource::File(path.clone()),
        Some(Layout::Flag(false)) => LayoutSource::None,
        Some(Layout::Flag(true)) => LayoutSource::Builtin,
        None => match stage {
            Some(Layout::Path(path)) => LayoutSource::File(path.clone()),
            Some(Layout::Flag(true)) => LayoutSource::Builtin,
            Some(Layout::Flag(false)) | None => LayoutSource::None,
        },
    }
}

/// How an output ended.
#[derive(Debug)]
pub(super) enum PageOutcome {
    /// The compiled file was written.
    Written(PathBuf),
    /// The source was missing outside development.
    Skipped,
    /// Compilation or writing failed.
    Failed(OutputFailure),
}

/// The result of one output, with the warnings it raised.
#[derive(Debug)]
pub(super) struct PageReport {
    pub(super) outcome: PageOutcome,
    pub(super) warnings: Vec<String>,
}

/// Everything needed to compile one output, borrowed from the stage run.
pub(super) struct PageRenderer<'a> {
    pub(super) options: &'a MarkupOptions,
    pub(super) src_dir: &'a Path,
    pub(super) out_dir: &'a Path,
    pub(super) env: &'a Environment,
    pub(super) toolchain: &'a Toolchain,
    pub(super) snapshot: &'a ContextSnapshot,
}

impl PageRenderer<'_> {
    /// Compiles the output `name`. Never returns early with an error: every
    /// problem ends up in the report.
    pub(super) async fn render(&self, name: &str, page: &PageOptions) -> PageReport {
        let mut warnings = Vec::new();
        let outcome = match self.compile(name, page, &mut warnings).await {
            Ok(Some(path)) => PageOutcome::Written(path),
            Ok(None) => PageOutcome::Skipped,
            Err(message) => PageOutcome::Failed(OutputFailure::new(name, message)),
        };
        PageReport { outcome, warnings }
    }

    async fn compile(
        &self,
        name: &str,
        page: &PageOptions,
        warnings: &mut Vec<String>,
    ) -> Result<Option<PathBuf>, String> {
        let ext = &self.options.default_extension;
        let scaffolds = self.env.scaffolds();

        let layout = match layout_source(page.layout.as_ref(), self.options.layout.as_ref()) {
            LayoutSource::None => None,
            LayoutSource::Builtin => Some(builtin_layout(&self.options.tags)),
            LayoutSource::File(relative) => {
                let path = join_relative(self.src_dir, &relative);
                if scaffolds {
                    fs::write_if_absent(&path, builtin_layout(&self.options.tags))
                        .await
                        .map_err(|e| describe(&path, &e))?;
                }
                let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
                    if e.kind() == io::ErrorKind::NotFound {
                        format!("layout \"{}\" was not found", path.display())
                    } else {
                        describe(&path, &e)
                    }
                })?;
                Some(text)
            }
        };

        let source_path = join_relative(self.src_dir, &page.src(name, ext));
        if scaffolds {
            fs::write_if_absent(&source_path, page_stub(name))
                .await
                .map_err(|e| describe(&source_path, &e))?;
        }
        let source = match tokio::fs::read_to_string(&source_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warnings.push(format!(
                    "output '{name}' skipped: \"{}\" was not found",
                    source_path.display()
                ));
                return Ok(None);
            }
            Err(e) => return Err(describe(&source_path, &e)),
        };

        let vars = self.vars(name, page);
        let mut partials = self.partials(page, warnings).await?;

        let template = match layout {
            Some(layout) => {
                partials.insert(CONTENT_PARTIAL.to_string(), source);
                layout
            }
            None => source,
        };
        for (key, markup) in self.svg_fragments() {
            partials.insert(key, markup);
        }

        let compiled = self
            .toolchain
            .renderer
            .render(&template, &Value::Object(vars), &partials, &self.options.tags)
            .map_err(|e| e.to_string())?;
        let formatted = self.format(&compiled);

        let target = join_relative(self.out_dir, &page.dist(name, ext));
        fs::write_file(&target, formatted)
            .await
            .map_err(|e| describe(&target, &e))?;
        Ok(Some(target))
    }

    /// Context artifacts, then stage `vars`, then page `vars`.
    fn vars(&self, name: &str, page: &PageOptions) -> Map<String, Value> {
        let mut vars = Map::new();
        for (var, kind) in [
            ("stylesheet", StageKind::Stylesheet),
            ("script", StageKind::Script),
            ("svg", StageKind::Vector),
        ] {
            if let Some(value) = self.snapshot.get(kind.namespace()) {
                vars.insert(var.to_string(), value.clone());
            }
        }
        if let Some(locales) = self
            .snapshot
            .get_as::<LocaleArtifact>(StageKind::I18n.namespace())
        {
            vars.insert("i18n".to_string(), locales.markup_vars());
        }
        let filename = |kind: StageKind| {
            self.snapshot
                .get_as::<BundleArtifact>(kind.namespace())
                .map(|artifact| artifact.filename)
                .unwrap_or_default()
        };
        vars.insert("cssFilename".to_string(), Value::String(filename(StageKind::Stylesheet)));
        vars.insert("jsFilename".to_string(), Value::String(filename(StageKind::Script)));
        vars.insert("pageName".to_string(), Value::String(name.to_string()));

        for (key, value) in self.options.vars.iter().chain(page.vars.iter()) {
            vars.insert(key.clone(), value.clone());
        }
        vars
    }

    /// Stage `elements` overlaid with page `elements`, read from disk.
    async fn partials(
        &self,
        page: &PageOptions,
        warnings: &mut Vec<String>,
    ) -> Result<HashMap<String, String>, String> {
        let mut elements = self.options.elements.clone();
        elements.extend(page.elements.clone());

        let mut partials = HashMap::with_capacity(elements.len());
        for (key, relative) in elements {
            let path = join_relative(self.src_dir, &relative);
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => {
                    partials.insert(key, text);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warnings.push(format!(
                        "partial '{key}' not found: \"{}\"",
                        path.display()
                    ));
                }
                Err(e) => return Err(describe(&path, &e)),
            }
        }
        Ok(partials)
    }

    fn svg_fragments(&self) -> Vec<(String, String)> {
        let Some(Value::Object(fragments)) = self.snapshot.get(StageKind::Vector.namespace())
        else {
            return Vec::new();
        };
        fragments
            .iter()
            .filter_map(|(key, value)| Some((key.clone(), value.as_str()?.to_string())))
            .collect()
    }

    fn format(&self, html: &str) -> String {
        let formatter = &self.toolchain.markup;
        if let Some(options) = self.options.beautify.options() {
            return formatter.beautify(html, &options);
        }
        if let Some(options) = self.options.minify.options() {
            return formatter.minify(html, &options);
        }
        match self.env.output_style() {
            OutputStyle::Readable => formatter.beautify(html, &Default::default()),
            OutputStyle::Minified => formatter.minify(html, &Default::default()),
            OutputStyle::Raw => html.to_string(),
        }
    }
}

fn describe(path: &Path, err: &io::Error) -> String {
    format!("\"{}\": {err}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SiteFixture;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_outcome_carries_written_path() {
        let site = SiteFixture::production();
        site.write_src("html/about.html", "<p>{{ pageName }}</p>");
        let options = MarkupOptions::default();
        let snapshot = site.shared.snapshot();
        let renderer = PageRenderer {
            options: &options,
            src_dir: &site.src.join("html"),
            out_dir: &site.dist,
            env: &site.env,
            toolchain: &site.toolchain,
            snapshot: &snapshot,
        };

        let written = renderer.render("about", &PageOptions::default()).await;
        let PageOutcome::Written(path) = written.outcome else {
            panic!("expected a written page");
        };
        assert_eq!(path, site.dist.join("about.html"));
        assert_eq!(site.read_dist("about.html"), "<p>about</p>");

        let skipped = renderer.render("missing", &PageOptions::default()).await;
        assert!(matches!(skipped.outcome, PageOutcome::Skipped));
        assert_eq!(skipped.warnings.len(), 1);
    }

    #[test]
    fn test_layout_precedence() {
        let file = |p: &str| Layout::Path(p.to_string());

        assert_eq!(
            layout_source(Some(&file("a.html")), Some(&file("b.html"))),
            LayoutSource::File("a.html".to_string())
        );
        assert_eq!(
            layout_source(Some(&Layout::Flag(false)), Some(&file("b.html"))),
            LayoutSource::None
        );
        assert_eq!(
            layout_source(None, Some(&file("b.html"))),
            LayoutSource::File("b.html".to_string())
        );
        assert_eq!(layout_source(None, Some(&Layout::Flag(true))), LayoutSource::Builtin);
        assert_eq!(
            layout_source(Some(&Layout::Flag(true)), Some(&Layout::Flag(false))),
            LayoutSource::Builtin
        );
        assert_eq!(layout_source(None, None), LayoutSource::None);
    }

    #[test]
    fn test_builtin_layout_follows_tags() {
        assert_eq!(builtin_layout(&Delimiters::default()), BUILTIN_LAYOUT);

        let layout = builtin_layout(&Delimiters::new("<%", "%>"));
        assert!(layout.contains("<title><% pageName %></title>"));
        assert!(layout.contains("href='<%& cssFilename %>'"));
        assert!(layout.contains("<%> content%>"));
        assert!(!layout.contains("{{"));
    }
}
