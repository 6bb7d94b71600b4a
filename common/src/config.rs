use config::{Config, ConfigBuilder, ConfigError, builder::DefaultState};
use serde::Deserialize;
use std::fmt;
use tracing::debug;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Object-store credentials and connection options, shared by every S3
/// location the pipeline touches.
#[derive(Deserialize, Clone)]
pub struct StorageSettings {
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub allow_http: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineSettings {
    #[serde(default = "default_input_root")]
    pub input_root: String,
    #[serde(default = "default_output_root")]
    pub output_root: String,
    #[serde(default = "default_catalog_pattern")]
    pub catalog_pattern: String,
    #[serde(default = "default_events_pattern")]
    pub events_pattern: String,
    #[serde(default = "default_compression")]
    pub compression: String,
    #[serde(default)]
    pub persist_songplay_id: bool,
    /// Keep only event rows whose `page` equals this value before the join.
    #[serde(default)]
    pub songplay_page: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_region() -> String {
    "us-west-2".to_string()
}

fn default_input_root() -> String {
    "s3a://udacity-dend/".to_string()
}

fn default_output_root() -> String {
    "s3a://u-de-project4/".to_string()
}

fn default_catalog_pattern() -> String {
    "song_data/*/*/*/*.json".to_string()
}

fn default_events_pattern() -> String {
    "log_data/*/*/*.json".to_string()
}

fn default_compression() -> String {
    "snappy".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            access_key_id: String::new(),
            secret_access_key: String::new(),
            region: default_region(),
            endpoint: None,
            allow_http: false,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            input_root: default_input_root(),
            output_root: default_output_root(),
            catalog_pattern: default_catalog_pattern(),
            events_pattern: default_events_pattern(),
            compression: default_compression(),
            persist_songplay_id: false,
            songplay_page: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl StorageSettings {
    pub fn has_static_credentials(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }
}

// Secrets never reach the logs.
impl fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &str| if value.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("StorageSettings")
            .field("access_key_id", &redact(&self.access_key_id))
            .field("secret_access_key", &redact(&self.secret_access_key))
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("allow_http", &self.allow_http)
            .finish()
    }
}

impl Settings {
    /// Loads settings from an optional file at `path`, overlaid with
    /// `ETL_`-prefixed environment variables (`ETL_STORAGE__ACCESS_KEY_ID`).
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("ETL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::from_builder(builder)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config = builder.build()?;
        let settings: Settings = config.try_deserialize()?;

        debug!(
            storage = ?settings.storage,
            pipeline = ?settings.pipeline,
            "Parsed pipeline settings"
        );

        Ok(settings)
    }
}
