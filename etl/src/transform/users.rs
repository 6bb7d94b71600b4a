use crate::schema::{USER_COLUMNS, projection, require_columns, sources};
use common::Result;
use datafusion::prelude::*;

/// Builds the user dimension from the event log.
///
/// Rows are deduplicated on the full tuple, so a user seen at two
/// subscription levels keeps one row per level.
pub struct UserTransformer;

impl UserTransformer {
    pub fn new() -> Self {
        Self
    }

    pub fn transform(&self, events: DataFrame) -> Result<DataFrame> {
        require_columns(&events, "event log", sources(&USER_COLUMNS))?;
        Ok(events.select(projection(&USER_COLUMNS))?.distinct()?)
    }
}

impl Default for UserTransformer {
    fn default() -> Self {
        Self::new()
    }
}
