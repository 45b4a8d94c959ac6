//! Daily Sales Pipeline
//!
//! Batch ETL over the store's product catalog and sales exports:
//! - CSV extraction with row-level rejection
//! - Cleaning, derived columns, and the sales/products join
//! - ClickHouse tables for products, sales, the joined report, and alerts
//! - JSON sales report and low-performance product alerts
//! - Daily schedule with fixed-delay retries per task

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use clickhouse_client::{ClickHouseClient, ClickHouseConfig};
use telemetry::{health, init_tracing, LoggingConfig};
use worker::{Pipeline, PipelineConfig, PipelineScheduler, TaskState};

/// Application configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(flatten)]
    pipeline: PipelineConfig,

    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    logging: LoggingConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = load_config()?;
    init_tracing(&config.logging);

    info!("Starting Sales Pipeline v{}", env!("CARGO_PKG_VERSION"));
    let schedule = config
        .pipeline
        .daily_schedule()
        .context("Invalid pipeline schedule")?;

    info!(
        data_dir = %config.pipeline.data_dir.display(),
        report_dir = %config.pipeline.report_dir.display(),
        schedule = %schedule,
        retries = config.pipeline.retry.retries,
        retry_delay_secs = config.pipeline.retry.delay_secs,
        clickhouse_url = %config.clickhouse.url,
        database = %config.clickhouse.database,
        "Loaded pipeline config"
    );

    let clickhouse = Arc::new(
        ClickHouseClient::new(config.clickhouse.clone())
            .context("Failed to create ClickHouse client")?,
    );

    let pipeline = Arc::new(Pipeline::new(clickhouse, config.pipeline.clone()));

    if pipeline.check_health().await {
        info!("Sources and ClickHouse: healthy");
    } else {
        let report = health().report();
        for component in report.failing() {
            warn!(
                component = %component.name,
                message = component.message.as_deref().unwrap_or("unknown"),
                "Component unhealthy, runs may fail"
            );
        }
    }

    if config.pipeline.run_once {
        let summary = pipeline.run().await;
        for task in &summary.tasks {
            match &task.state {
                TaskState::Success { detail } => {
                    info!(task = %task.task, attempts = task.attempts, "{}", detail)
                }
                TaskState::Failed { error } => {
                    error!(task = %task.task, attempts = task.attempts, "{}", error)
                }
                TaskState::UpstreamFailed => warn!(task = %task.task, "Upstream failed"),
            }
        }
        if !summary.is_success() {
            anyhow::bail!(
                "Pipeline run {} failed: {:?}",
                summary.run_id,
                summary.failed_tasks()
            );
        }
        return Ok(());
    }

    let scheduler = Arc::new(
        PipelineScheduler::new(pipeline, schedule).with_run_on_start(config.pipeline.run_on_start),
    );
    let handle = scheduler.start();

    shutdown_signal().await;

    info!("Shutting down...");
    handle.abort();

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables, e.g. PIPELINE__RETRY__DELAY_SECS
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("PIPELINE")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat overrides for the ClickHouse connection
    if let Ok(url) = std::env::var("PIPELINE_CLICKHOUSE_URL") {
        config.clickhouse.url = url;
    }
    if let Ok(database) = std::env::var("PIPELINE_CLICKHOUSE_DATABASE") {
        config.clickhouse.database = database;
    }
    if let Ok(username) = std::env::var("PIPELINE_CLICKHOUSE_USERNAME") {
        config.clickhouse.username = Some(username);
    }
    if let Ok(password) = std::env::var("PIPELINE_CLICKHOUSE_PASSWORD") {
        config.clickhouse.password = Some(password);
    }

    Ok(config)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
