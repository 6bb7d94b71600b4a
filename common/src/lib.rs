use arrow::error::ArrowError;
use datafusion::error::DataFusionError;
use parquet::errors::ParquetError;
use thiserror::Error;
use url::ParseError;

pub mod config;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Source read error: {0}")]
    SourceRead(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Timestamp error: {0}")]
    Timestamp(String),

    #[error("Sink write error: {0}")]
    SinkWrite(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("DataFusion error: {0}")]
    DataFusion(#[from] DataFusionError),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid Uri: {0}")]
    InvalidUri(String),

    #[error("{0}")]
    Other(String),
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::InvalidUri(format!("URL parse error: {}", err))
    }
}

impl Error {
    /// Wraps any engine or storage failure raised while reading a source.
    pub fn source_read(location: &str, err: impl std::fmt::Display) -> Self {
        Error::SourceRead(format!("{}: {}", location, err))
    }

    /// Wraps any engine or storage failure raised while writing a table.
    pub fn sink_write(table: &str, destination: &str, err: impl std::fmt::Display) -> Self {
        Error::SinkWrite(format!("{} -> {}: {}", table, destination, err))
    }
}
