use crate::paths;
use common::{Error, Result};
use datafusion::prelude::*;
use tracing::info;

/// Loads line-delimited JSON sources into memory.
pub struct SourceReader {
    ctx: SessionContext,
}

impl SourceReader {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Reads every file under `root` matching the glob `pattern`.
    ///
    /// Schema inference scans every record, so the column set is the union
    /// of all fields seen and a malformed line fails the read instead of a
    /// later stage. The result is materialised in memory.
    pub async fn read(&self, root: &str, pattern: &str) -> Result<DataFrame> {
        let location = paths::join(root, pattern);
        info!(%location, "Reading source");

        let options = NdJsonReadOptions {
            schema_infer_max_records: usize::MAX,
            ..Default::default()
        };

        let df = self
            .ctx
            .read_json(location.as_str(), options)
            .await
            .map_err(|e| Error::source_read(&location, e))?;

        if df.schema().fields().is_empty() {
            return Err(Error::SourceRead(format!(
                "{}: no JSON records matched",
                location
            )));
        }

        let df = df
            .cache()
            .await
            .map_err(|e| Error::source_read(&location, e))?;

        let rows = df.clone().count().await?;
        info!(
            %location,
            rows,
            columns = df.schema().fields().len(),
            "Loaded source"
        );

        Ok(df)
    }
}
