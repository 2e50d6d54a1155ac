use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use episode_runner::{load_manifest, Orchestrator, ProgressTracker};
use oracle_client::{HttpOracle, HttpOracleConfig};
use trailforge::{AppConfig, CdpSessionFactory};
use trajectory_store::TrajectoryStore;

#[derive(Parser)]
#[command(
    name = "trailforge",
    version,
    about = "Browser trajectory generation for web-acting agents"
)]
struct Cli {
    /// Configuration file (defaults to ./trailforge.{toml,yaml,json}).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run trajectory generation for one phase's instruction manifest.
    Run {
        /// Generation phase whose manifest to execute.
        #[arg(long, default_value_t = 1)]
        phase: u8,

        /// Override: run the browsers headless.
        #[arg(long)]
        headless: bool,

        /// Override the configured results directory.
        #[arg(long)]
        results_dir: Option<PathBuf>,

        /// Explicit manifest path instead of the phase-derived one.
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Re-render the HTML report of a recorded episode.
    Report {
        /// Episode directory (a child of the results directory).
        episode_dir: PathBuf,
    },

    /// Print the progress summary of the current/last run.
    Progress,
}

fn init_tracing(results_dir: &std::path::Path) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_dir = results_dir.join("logs");
    match std::fs::create_dir_all(&log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(log_dir, "trailforge.log");
            let (file_writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(file_writer),
                )
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            phase,
            headless,
            results_dir,
            manifest,
        } => {
            if headless {
                config.browser.headless = true;
            }
            if let Some(dir) = results_dir {
                config.results_dir = dir;
            }
            let _guard = init_tracing(&config.results_dir);
            info!(
                build_date = env!("BUILD_DATE"),
                git = env!("GIT_HASH"),
                phase,
                "starting trailforge"
            );
            run(config, phase, manifest).await
        }
        Command::Report { episode_dir } => report(episode_dir),
        Command::Progress => progress(config),
    }
}

async fn run(config: AppConfig, phase: u8, manifest: Option<PathBuf>) -> Result<()> {
    let manifest_path = manifest.unwrap_or_else(|| config.manifest_path(phase));
    let instructions = load_manifest(&manifest_path)?;
    if instructions.is_empty() {
        anyhow::bail!("manifest {} holds no instructions", manifest_path.display());
    }

    let workers = config.worker_specs(instructions.len())?;
    info!(
        instructions = instructions.len(),
        workers = workers.len(),
        "run plan assembled"
    );

    let api_key = std::env::var(&config.oracle.api_key_env).ok();
    let oracle = Arc::new(HttpOracle::new(HttpOracleConfig {
        endpoint: config
            .oracle
            .endpoint
            .parse()
            .with_context(|| format!("invalid oracle endpoint '{}'", config.oracle.endpoint))?,
        api_key,
        timeout_ms: config.oracle.timeout_ms,
    })
    .context("failed to build oracle client")?);

    let factory = Arc::new(CdpSessionFactory::new(config.browser.clone()));
    let tracker = Arc::new(ProgressTracker::new(&config.results_dir)?);

    let orchestrator = Orchestrator::new(
        config.runner.clone(),
        config.results_dir.clone(),
        oracle,
        factory,
    )
    .with_tracker(tracker.clone());

    orchestrator.run(Arc::new(instructions), workers).await?;

    println!("{}", tracker.summary());
    Ok(())
}

fn report(episode_dir: PathBuf) -> Result<()> {
    let store = TrajectoryStore::open(&episode_dir);
    let metadata = store
        .load_metadata()
        .with_context(|| format!("no episode metadata under {}", episode_dir.display()))?;
    store.record_report(&metadata)?;
    println!("report regenerated at {}", episode_dir.join("report.html").display());
    Ok(())
}

fn progress(config: AppConfig) -> Result<()> {
    let path = config.results_dir.join("progress_tracking.json");
    let bytes = std::fs::read(&path)
        .with_context(|| format!("no progress file at {}", path.display()))?;
    let state: serde_json::Value = serde_json::from_slice(&bytes)?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
