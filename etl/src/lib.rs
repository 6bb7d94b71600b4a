pub mod engine;
pub mod paths;
pub mod pipeline;
pub mod reader;
pub mod schema;
pub mod sink;
pub mod storage;
pub mod transform;
pub mod udf;

#[cfg(test)]
mod test_util;

use common::Result;
use common::config::{LoggingSettings, Settings};
use pipeline::{Pipeline, RunSummary};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_CONFIG_PATH: &str = "config/etl.toml";

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
/// Does nothing if a subscriber is already installed.
pub fn init_logging(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Runs the complete star-schema ETL with settings loaded from `config_path`
pub async fn run_etl_pipeline(config_path: &str) -> Result<RunSummary> {
    let settings = Settings::new(config_path)?;
    init_logging(&settings.logging);

    info!(config_path, "Loaded settings");
    run_with_settings(&settings).await
}

pub async fn run_with_settings(settings: &Settings) -> Result<RunSummary> {
    let summary = Pipeline::new(settings)?.run().await?;

    for table in &summary.tables {
        info!(
            run_id = %summary.run_id,
            table = %table.table,
            destination = %table.destination,
            rows = table.rows,
            "Wrote table"
        );
    }

    Ok(summary)
}
