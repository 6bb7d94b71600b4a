use crate::schema::{PUBLISHER_COLUMNS, TRACK_COLUMNS, projection, require_columns, sources};
use common::Result;
use datafusion::prelude::*;
use tracing::debug;

/// Track and publisher dimensions built from one catalog read.
pub struct CatalogTables {
    /// Materialised: it is written and then joined by the fact assembler.
    pub tracks: DataFrame,
    pub publishers: DataFrame,
}

pub struct CatalogTransformer;

impl CatalogTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Projects both dimensions and drops exact duplicate rows from each.
    pub async fn transform(&self, catalog: DataFrame) -> Result<CatalogTables> {
        require_columns(
            &catalog,
            "catalog",
            sources(&TRACK_COLUMNS).chain(sources(&PUBLISHER_COLUMNS)),
        )?;

        let tracks = catalog
            .clone()
            .select(projection(&TRACK_COLUMNS))?
            .distinct()?
            .cache()
            .await?;

        let publishers = catalog.select(projection(&PUBLISHER_COLUMNS))?.distinct()?;

        debug!(tracks = tracks.clone().count().await?, "Built catalog dimensions");

        Ok(CatalogTables { tracks, publishers })
    }
}

impl Default for CatalogTransformer {
    fn default() -> Self {
        Self::new()
    }
}
