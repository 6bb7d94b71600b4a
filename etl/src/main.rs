use clap::Command;
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    Command::new("etl-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds the star-schema Parquet tables from the song catalog and event logs")
        .after_help(
            "Settings are read from config/etl.toml (override with ETL_CONFIG) \
             and ETL_* environment variables.",
        )
        .get_matches();

    let config_path =
        std::env::var("ETL_CONFIG").unwrap_or_else(|_| etl::DEFAULT_CONFIG_PATH.to_string());

    if let Err(e) = etl::run_etl_pipeline(&config_path).await {
        error!(error = %e, "ETL pipeline failed");
        eprintln!("ETL pipeline error: {}", e);
        process::exit(1);
    }
}
