//! Script bundling.

use super::scaffold::{require_dir, require_file};
use super::{PathOptions, Stage};
use crate::context::StageContext;
use crate::core::{BundleArtifact, LocaleArtifact, StageKind};
use crate::errors::StageError;
use crate::transform::BundleOptions;
use crate::utils::{fs, relative_slash};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

const STUB: &str = "console.log('Stub index.js');";

/// Options for the script stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptOptions {
    /// Location of the scripts (default `js`).
    #[serde(flatten)]
    pub location: PathOptions,
    /// Entry file inside the source folder.
    pub entry: String,
    /// Output file name inside the output folder.
    pub filename: String,
    /// Files prepended verbatim after the locale banner, relative to the source folder.
    #[serde(default)]
    pub libs: Vec<String>,
    /// Extra folders searched for bare imports, relative to the source folder.
    #[serde(default)]
    pub include: Vec<String>,
    /// Copy the entry verbatim instead of bundling it.
    #[serde(default)]
    pub raw_only: bool,
    /// Skip down-levelling.
    #[serde(default)]
    pub no_transpile: bool,
    /// Skip writing the output file.
    #[serde(default)]
    pub no_file: bool,
    /// Publish the bundled code for the markup stage.
    pub expose_html: bool,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            location: PathOptions::shared("js"),
            entry: "index.js".to_string(),
            filename: "bundle.js".to_string(),
            libs: Vec::new(),
            include: Vec::new(),
            raw_only: false,
            no_transpile: false,
            no_file: false,
            expose_html: true,
        }
    }
}

/// Bundles the script entry, prefixed with locale tables and libraries.
#[derive(Debug, Clone)]
pub struct ScriptStage {
    options: ScriptOptions,
}

impl ScriptStage {
    /// Creates a new script stage.
    #[must_use]
    pub fn new(options: ScriptOptions) -> Self {
        Self { options }
    }

    async fn banner(&self, ctx: &mut StageContext<'_>, src_dir: &Path) -> Vec<String> {
        let mut banner = Vec::new();
        if let Some(locales) = ctx.artifact::<LocaleArtifact>(StageKind::I18n) {
            banner.push(locales.to_script_banner());
        }
        for lib in &self.options.libs {
            let path = src_dir.join(lib);
            match tokio::fs::read_to_string(&path).await {
                Ok(code) => {
                    debug!(stage = %ctx.kind(), lib = %path.display(), "Prepending library");
                    banner.push(code);
                }
                Err(e) => ctx.warn(format!("library \"{}\" skipped: {e}", path.display())),
            }
        }
        banner
    }
}

#[async_trait]
impl Stage for ScriptStage {
    fn kind(&self) -> StageKind {
        StageKind::Script
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let kind = self.kind();
        let options = &self.options;
        let src_dir = ctx.src_path(options.location.src().unwrap_or("js"));
        require_dir(ctx, &src_dir).await?;
        let entry = src_dir.join(&options.entry);
        require_file(ctx, &entry, STUB).await?;

        let code = if options.raw_only {
            tokio::fs::read_to_string(&entry)
                .await
                .map_err(|e| StageError::io(kind, &entry, e))?
        } else {
            let mut include_paths = vec![src_dir.clone()];
            include_paths.extend(options.include.iter().map(|p| src_dir.join(p)));
            let bundle_options = BundleOptions {
                include_paths,
                banner: self.banner(ctx, &src_dir).await,
                transpile: !options.no_transpile,
                minify: ctx.env().minifies(),
            };
            ctx.toolchain()
                .scripts
                .bundle(&entry, &bundle_options)
                .map_err(|e| StageError::transform(kind, e))?
                .code
        };

        let target = ctx
            .dist_path(options.location.dist().unwrap_or("js"))
            .join(&options.filename);
        let filename = if options.no_file {
            String::new()
        } else {
            fs::write_file(&target, &code)
                .await
                .map_err(|e| StageError::io(kind, &target, e))?;
            relative_slash(ctx.dist_root(), &target)
        };

        info!(
            stage = %kind,
            entry = %entry.display(),
            bytes = code.len(),
            raw = options.raw_only,
            "Bundled script"
        );

        if options.expose_html || options.no_file {
            ctx.publish(&BundleArtifact::new(code, filename))?;
        }
        Ok(())
    }
}
