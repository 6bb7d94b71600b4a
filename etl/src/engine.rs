use crate::storage::StorageManager;
use crate::udf;
use common::Result;
use common::config::Settings;
use datafusion::execution::context::SessionContext;
use datafusion::prelude::SessionConfig;

const IGNORE_SUBDIRECTORY: &str = "datafusion.execution.listing_table_ignore_subdirectory";

/// Engine settings for every session. Source patterns such as
/// `song_data/*/*/*/*.json` reach below the first directory level, so
/// listing must descend into subdirectories.
pub fn session_config() -> SessionConfig {
    SessionConfig::new().set_bool(IGNORE_SUBDIRECTORY, false)
}

/// Builds the run's engine session: calendar functions plus an object store
/// for every remote root the pipeline reads from or writes to.
pub fn create_session(settings: &Settings) -> Result<SessionContext> {
    let ctx = SessionContext::new_with_config(session_config());
    udf::register_udfs(&ctx)?;

    let storage = StorageManager::new(&settings.storage);
    storage.register_location(&ctx, &settings.pipeline.input_root)?;
    storage.register_location(&ctx, &settings.pipeline.output_root)?;

    Ok(ctx)
}
