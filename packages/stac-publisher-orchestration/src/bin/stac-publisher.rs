//! `stac-publisher`: run one publish cycle and exit.
//!
//! Exit status: 0 on success, 1 for transient failures (backend unreachable,
//! channel closed), 2 for permanent ones (configuration, malformed documents).
//! Schedule it externally and never run two instances against the same index.

use anyhow::Context;
use clap::Parser;
use stac_publisher_orchestration::config::CONFIG_ENV_VAR;
use stac_publisher_orchestration::{
    AppConfig, CycleOrchestrator, CycleReport, JsonLinesSink, PublisherError, QueueSink,
    SinkConfig, SourceConfig,
};
use stac_publisher_storage::{DocumentSource, SqliteDocumentSource};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stac-publisher", about = "Publish stabilized documents to the queue")]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run(config: AppConfig) -> anyhow::Result<CycleReport> {
    let source: Arc<dyn DocumentSource> = match &config.source {
        SourceConfig::Sqlite { path } => Arc::new(
            SqliteDocumentSource::open(path)
                .with_context(|| format!("failed to open document source {}", path.display()))?,
        ),
    };

    let sink: Arc<dyn QueueSink> = match &config.sink {
        SinkConfig::Jsonl { directory } => Arc::new(JsonLinesSink::new(directory)),
    };

    let orchestrator = CycleOrchestrator::new(config.publisher, source, sink)?;
    Ok(orchestrator.run_cycle().await?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let path = AppConfig::resolve_path(cli.config, std::env::var(CONFIG_ENV_VAR).ok());
    let config = match AppConfig::from_yaml_file(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("stac-publisher: invalid configuration {}: {}", path.display(), e);
            return ExitCode::from(e.category().exit_code() as u8);
        }
    };

    init_tracing(&config.logging.level);
    info!("Loaded configuration from {}", path.display());

    match run(config).await {
        Ok(report) => {
            info!(
                "Published {} message(s), marked {} document(s)",
                report.published, report.marked
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Cycle failed: {:#}", e);
            let code = e
                .downcast_ref::<PublisherError>()
                .map(|err| err.category().exit_code())
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}
