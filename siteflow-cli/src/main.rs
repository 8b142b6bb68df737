//! Siteflow command line.
//!
//! Loads a JSON site configuration (one object or an array of them), runs it
//! and exits non-zero if any build failed.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use siteflow::config::SiteConfig;
use siteflow::core::Environment;
use siteflow::pipeline::Pipeline;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "siteflow")]
#[command(about = "Build static site assets in a fixed stage order", version)]
struct Cli {
    /// Path to the JSON configuration
    #[arg(short, long, default_value = "site.json")]
    config: PathBuf,

    /// Build environment, overriding the configuration and SITEFLOW_ENV
    #[arg(short, long)]
    env: Option<String>,

    /// Source root, overriding the configuration
    #[arg(long)]
    src: Option<PathBuf>,

    /// Output root, overriding the configuration
    #[arg(long)]
    dist: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Print the build reports as JSON on stdout
    #[arg(long)]
    report: bool,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load(cli: &Cli) -> Result<Vec<SiteConfig>> {
    let mut configs = SiteConfig::load_all(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    for config in &mut configs {
        if let Some(env) = &cli.env {
            config.env = Environment::parse(env);
        }
        if let Some(src) = &cli.src {
            config.src.clone_from(src);
        }
        if let Some(dist) = &cli.dist {
            config.dist.clone_from(dist);
        }
    }
    Ok(configs)
}

async fn run(cli: &Cli) -> Result<bool> {
    let configs = load(cli)?;
    info!(configs = configs.len(), "Loaded configuration");

    match Pipeline::new().run_all(configs).await {
        Ok(reports) => {
            for report in &reports {
                for warning in report.warnings() {
                    warn!(run_id = %report.run_id, "{warning}");
                }
                info!(
                    run_id = %report.run_id,
                    dist = %report.dist.display(),
                    stages = report.stages.len(),
                    duration_ms = report.duration_ms,
                    "Build finished"
                );
            }
            if cli.report {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            }
            Ok(true)
        }
        Err(err) => {
            for failure in err.into_errors() {
                error!(error = %failure, "Build failed");
            }
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(&cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(2)
        }
    }
}
