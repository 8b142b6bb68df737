//! Localization tables.

use super::scaffold::{pretty_json, require_dir, require_file};
use super::{PathOptions, Stage};
use crate::context::StageContext;
use crate::core::{LocaleArtifact, StageKind};
use crate::errors::{StageError, TransformError};
use crate::utils::fs;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Options for the i18n stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct I18nOptions {
    /// Location of the locale files (default `i18n`).
    #[serde(flatten)]
    pub location: PathOptions,
    /// Locale that must exist and is recorded as `default` (default `en`).
    pub default_locale: String,
    /// Global name scripts see the tables under (default `i18n`).
    pub name: String,
    /// Name markup sees as `i18n.name` (default `i18n`).
    pub html_name: String,
    /// Also write the normalized locale files to the output tree.
    #[serde(default)]
    pub write_files: bool,
}

impl Default for I18nOptions {
    fn default() -> Self {
        Self {
            location: PathOptions::shared("i18n"),
            default_locale: "en".to_string(),
            name: "i18n".to_string(),
            html_name: "i18n".to_string(),
            write_files: false,
        }
    }
}

/// Loads `*.json` locale tables and publishes them for scripts and markup.
#[derive(Debug, Clone)]
pub struct I18nStage {
    options: I18nOptions,
}

impl I18nStage {
    /// Creates a new i18n stage.
    #[must_use]
    pub fn new(options: I18nOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Stage for I18nStage {
    fn kind(&self) -> StageKind {
        StageKind::I18n
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let kind = self.kind();
        let src_dir = ctx.src_path(self.options.location.src().unwrap_or("i18n"));
        require_dir(ctx, &src_dir).await?;

        let default_file = src_dir.join(format!("{}.json", self.options.default_locale));
        require_file(ctx, &default_file, &pretty_json(&json!({"stub": "stub"}))).await?;

        let mut store = BTreeMap::new();
        for file in fs::list_matching(&src_dir, &["*.json"]) {
            let Some(locale) = file.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let text = tokio::fs::read_to_string(&file)
                .await
                .map_err(|e| StageError::io(kind, &file, e))?;
            let table: Value = serde_json::from_str(&text).map_err(|e| {
                StageError::transform(kind, TransformError::parse(file.display(), e))
            })?;
            debug!(stage = %kind, locale, "Loaded locale");
            store.insert(locale.to_string(), table);
        }

        if self.options.write_files {
            let dist_dir = ctx.dist_path(self.options.location.dist().unwrap_or("i18n"));
            for (locale, table) in &store {
                let target = dist_dir.join(format!("{locale}.json"));
                fs::write_file(&target, pretty_json(table))
                    .await
                    .map_err(|e| StageError::io(kind, &target, e))?;
            }
        }

        info!(stage = %kind, locales = store.len(), "Loaded locale tables");
        store.insert(
            "default".to_string(),
            Value::String(self.options.default_locale.clone()),
        );
        ctx.publish(&LocaleArtifact {
            store,
            name: self.options.name.clone(),
            html_name: self.options.html_name.clone(),
        })
    }
}
