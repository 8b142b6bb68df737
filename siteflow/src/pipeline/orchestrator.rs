//! Pipeline orchestration.

use super::report::{BuildReport, Diagnostic, StageRecord};
use crate::config::{ConstructionPolicy, SiteConfig};
use crate::context::{SharedContext, StageContext};
use crate::core::Environment;
use crate::errors::{
    AggregateError, ConfigError, SiteflowError, StageConstructionError, StageError,
};
use crate::events::{BuildEvent, EventSink, LoggingEventSink};
use crate::stages::plan;
use crate::transform::Toolchain;
use crate::utils::{absolutize, fs};
use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn construction_source(err: &StageConstructionError) -> String {
    match err {
        StageConstructionError::UnknownStage { key } => key.clone(),
        StageConstructionError::InvalidOptions { kind, .. } => kind.key().to_string(),
    }
}

/// Makes sure a root folder exists, creating it in development.
async fn ensure_root(env: &Environment, role: &str, path: &Path) -> Result<(), ConfigError> {
    if fs::is_dir(path).await {
        return Ok(());
    }
    if !env.scaffolds() {
        return Err(ConfigError::missing_root(role, path));
    }
    fs::ensure_dir(path).await.map_err(|e| {
        ConfigError::new(format!("cannot create {role} folder: {e}"))
            .with_path(path)
            .with_context_entry("role", role)
    })?;
    info!(role, path = %path.display(), "Created root folder");
    Ok(())
}

/// Runs site configurations through the fixed stage sequence.
///
/// A pipeline is stateless between runs: every run gets its own shared
/// context, so one pipeline can run many configurations, concurrently
/// through [`Pipeline::run_all`].
#[derive(Clone)]
pub struct Pipeline {
    toolchain: Toolchain,
    events: Arc<dyn EventSink>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            toolchain: Toolchain::default(),
            events: Arc::new(LoggingEventSink::default()),
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("toolchain", &self.toolchain)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline with the default toolchain that logs its events.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transform implementations.
    #[must_use]
    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the transform implementations.
    #[must_use]
    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Runs one configuration.
    ///
    /// Stages run one after another in [`StageKind::ORDER`](crate::core::StageKind::ORDER);
    /// the first failing stage stops the run. Files written by earlier stages
    /// are left in place.
    ///
    /// # Errors
    ///
    /// Returns [`SiteflowError::Config`] if a root folder is missing outside
    /// development or a stage cannot be constructed under the `fail` policy,
    /// and [`SiteflowError::Stage`] for the first stage that fails.
    pub async fn run(&self, config: &SiteConfig) -> Result<BuildReport, SiteflowError> {
        let run_id = Uuid::new_v4();
        let result = self.execute(run_id, config).await;
        if let Err(err) = &result {
            self.events
                .emit(&BuildEvent::BuildFailed {
                    run_id,
                    error: err.to_string(),
                })
                .await;
        }
        result
    }

    /// Runs independent configurations concurrently, each with its own context.
    ///
    /// # Errors
    ///
    /// Returns [`SiteflowError::Aggregate`] with every failure once all runs
    /// have settled.
    pub async fn run_all(&self, configs: Vec<SiteConfig>) -> Result<Vec<BuildReport>, SiteflowError> {
        let results = join_all(configs.iter().map(|config| self.run(config))).await;

        let mut reports = Vec::with_capacity(results.len());
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(report) => reports.push(report),
                Err(err) => errors.push(err),
            }
        }
        if errors.is_empty() {
            Ok(reports)
        } else {
            Err(AggregateError::new(errors).into())
        }
    }

    /// Runs a configuration object or (nested) array of objects.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an element is not a valid
    /// configuration, otherwise as [`Pipeline::run_all`].
    pub async fn run_value(&self, value: &Value) -> Result<Vec<BuildReport>, SiteflowError> {
        let configs = SiteConfig::flatten(value)?;
        self.run_all(configs).await
    }

    async fn execute(&self, run_id: Uuid, config: &SiteConfig) -> Result<BuildReport, SiteflowError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let env = &config.env;

        let cwd = std::env::current_dir()?;
        let src = absolutize(&config.src, &cwd);
        let dist = absolutize(&config.dist, &cwd);
        ensure_root(env, "Source", &src).await?;
        ensure_root(env, "Output", &dist).await?;

        let plan = plan(config);
        let mut diagnostics = Vec::new();
        for note in &plan.notes {
            warn!(%run_id, key = note.key(), "{note}");
            diagnostics.push(Diagnostic::new(note.key(), note.to_string()));
        }
        for err in plan.errors {
            let source = construction_source(&err);
            if config.construction_errors == ConstructionPolicy::Fail {
                return Err(ConfigError::new(err.to_string())
                    .with_context_entry("stage", source)
                    .into());
            }
            warn!(%run_id, stage = %source, error = %err, "Stage skipped");
            diagnostics.push(Diagnostic::new(source, err.to_string()));
        }

        let kinds = plan.stages.iter().map(|stage| stage.kind()).collect();
        self.events
            .emit(&BuildEvent::BuildStarted {
                run_id,
                src: src.clone(),
                dist: dist.clone(),
                env: env.to_string(),
                stages: kinds,
            })
            .await;

        let shared = SharedContext::new();
        let mut records = Vec::with_capacity(plan.stages.len());
        for stage in &plan.stages {
            let kind = stage.kind();
            self.events
                .emit(&BuildEvent::StageStarted { run_id, stage: kind })
                .await;

            let stage_clock = Instant::now();
            let mut ctx = StageContext::new(kind, &src, &dist, env, &self.toolchain, &shared);
            let result = match config.stage_timeout {
                Some(limit) => tokio::time::timeout(limit, stage.run(&mut ctx))
                    .await
                    .unwrap_or_else(|_| {
                        Err(StageError::Timeout {
                            kind,
                            seconds: limit.as_secs_f64(),
                        })
                    }),
                None => stage.run(&mut ctx).await,
            };
            let duration_ms = elapsed_ms(stage_clock);

            if let Err(err) = result {
                self.events
                    .emit(&BuildEvent::StageFailed {
                        run_id,
                        stage: kind,
                        error: err.to_string(),
                    })
                    .await;
                return Err(err.into());
            }

            let warnings = ctx.into_warnings();
            debug!(%run_id, stage = %kind, duration_ms, warnings = warnings.len(), "Stage finished");
            self.events
                .emit(&BuildEvent::StageCompleted {
                    run_id,
                    stage: kind,
                    duration_ms,
                    warnings: warnings.len(),
                })
                .await;
            records.push(StageRecord {
                kind,
                duration_ms,
                warnings,
            });
        }

        let duration_ms = elapsed_ms(clock);
        self.events
            .emit(&BuildEvent::BuildCompleted {
                run_id,
                duration_ms,
                stages: records.len(),
            })
            .await;

        Ok(BuildReport {
            run_id,
            started_at,
            env: env.clone(),
            src,
            dist,
            stages: records,
            diagnostics,
            duration_ms,
        })
    }
}
