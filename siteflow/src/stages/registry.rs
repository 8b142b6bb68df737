//! Compile-time mapping from stage kind to constructor.

use super::{
    CopyStage, DeleteStage, FontStage, I18nStage, ImageStage, MarkupStage, MediaOptions,
    MediaStage, MoveStage, ScriptStage, Stage, StylesheetStage, VectorStage,
};
use crate::config::{resolve, SiteConfig, StageValue};
use crate::core::StageKind;
use crate::errors::StageConstructionError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

fn build<O, S>(
    kind: StageKind,
    value: &StageValue,
    defaults: &O,
    make: impl FnOnce(O) -> S,
) -> Result<Box<dyn Stage>, StageConstructionError>
where
    O: Serialize + DeserializeOwned,
    S: Stage + 'static,
{
    let options = resolve(defaults, value).map_err(|e| StageConstructionError::invalid(kind, e))?;
    Ok(Box::new(make(options)))
}

impl StageKind {
    /// Builds the stage for this kind from its configuration value.
    ///
    /// `true` uses the kind defaults; an object is resolved onto them.
    ///
    /// # Errors
    ///
    /// Returns [`StageConstructionError::InvalidOptions`] if the resolved
    /// options do not fit the kind's option type.
    pub fn construct(self, value: &StageValue) -> Result<Box<dyn Stage>, StageConstructionError> {
        match self {
            Self::I18n => build(self, value, &Default::default(), I18nStage::new),
            Self::Image => build(self, value, &Default::default(), ImageStage::new),
            Self::Font => build(self, value, &Default::default(), FontStage::new),
            Self::Vector => build(self, value, &Default::default(), VectorStage::new),
            Self::Video | Self::Audio => build(self, value, &MediaOptions::for_kind(self), |o| {
                MediaStage::new(self, o)
            }),
            Self::Stylesheet => build(self, value, &Default::default(), StylesheetStage::new),
            Self::Script => build(self, value, &Default::default(), ScriptStage::new),
            Self::Markup => build(self, value, &Default::default(), MarkupStage::new),
            Self::Copy => build(self, value, &Default::default(), CopyStage::new),
            Self::Move => build(self, value, &Default::default(), MoveStage::new),
            Self::Delete => build(self, value, &Default::default(), DeleteStage::new),
        }
    }
}

/// A configuration key that did not become a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanNote {
    /// The key names no stage but tried to activate one.
    UnknownKey(String),
    /// Another key (an alias) already configured this kind.
    DuplicateKey {
        /// The ignored key.
        key: String,
        /// The kind it names.
        kind: StageKind,
        /// The key that won.
        first: String,
    },
}

impl PlanNote {
    /// Returns the configuration key the note is about.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::UnknownKey(key) | Self::DuplicateKey { key, .. } => key,
        }
    }
}

impl fmt::Display for PlanNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKey(key) => write!(f, "unknown stage '{key}' ignored"),
            Self::DuplicateKey { key, kind, first } => {
                write!(f, "'{key}' ignored: stage '{kind}' is already configured by '{first}'")
            }
        }
    }
}

/// The stages a configuration asks for.
#[derive(Debug, Default)]
pub struct StagePlan {
    /// Constructed stages, in execution order.
    pub stages: Vec<Box<dyn Stage>>,
    /// Keys that were dropped.
    pub notes: Vec<PlanNote>,
    /// Stages that could not be constructed.
    pub errors: Vec<StageConstructionError>,
}

/// Resolves every enabled stage key of `config`.
///
/// Keys are matched against canonical names and aliases. The first enabled
/// key for a kind wins; unknown keys whose value is `true` or an object are
/// noted, other unknown keys are ignored.
#[must_use]
pub fn plan(config: &SiteConfig) -> StagePlan {
    let mut out = StagePlan::default();
    let mut claimed: HashMap<StageKind, &str> = HashMap::new();

    for (key, value) in &config.stages {
        let Some(kind) = StageKind::from_key(key) else {
            if value.is_activation() {
                out.notes.push(PlanNote::UnknownKey(key.clone()));
            }
            continue;
        };
        if !value.is_enabled() {
            continue;
        }
        if let Some(first) = claimed.get(&kind) {
            out.notes.push(PlanNote::DuplicateKey {
                key: key.clone(),
                kind,
                first: (*first).to_string(),
            });
            continue;
        }
        claimed.insert(kind, key);

        match kind.construct(value) {
            Ok(stage) => out.stages.push(stage),
            Err(err) => out.errors.push(err),
        }
    }

    out.stages.sort_by_key(|stage| stage.kind().position());
    out
}
