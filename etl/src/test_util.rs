//! Fixtures shared by the unit tests.

use crate::engine;
use crate::reader::SourceReader;
use crate::udf;
use datafusion::arrow::util::display::array_value_to_string;
use datafusion::prelude::*;
use serde_json::Value;
use std::fs;

pub fn session() -> SessionContext {
    let ctx = SessionContext::new_with_config(engine::session_config());
    udf::register_udfs(&ctx).unwrap();
    ctx
}

/// Loads JSON records through the source reader, as the pipeline would.
pub async fn frame(ctx: &SessionContext, records: &[Value]) -> DataFrame {
    let dir = tempfile::tempdir().unwrap();
    let body: String = records.iter().map(|r| format!("{}\n", r)).collect();
    fs::write(dir.path().join("records.json"), body).unwrap();

    SourceReader::new(ctx.clone())
        .read(dir.path().to_str().unwrap(), "*.json")
        .await
        .unwrap()
}

/// Renders the named columns of every row, sorted, for order-independent
/// comparison.
pub async fn rows(df: DataFrame, columns: &[&str]) -> Vec<Vec<String>> {
    let batches = df.collect().await.unwrap();
    let mut rows = Vec::new();
    for batch in &batches {
        let indices: Vec<usize> = columns
            .iter()
            .map(|name| batch.schema().index_of(name).unwrap())
            .collect();
        for row in 0..batch.num_rows() {
            rows.push(
                indices
                    .iter()
                    .map(|&i| array_value_to_string(batch.column(i), row).unwrap())
                    .collect(),
            );
        }
    }
    rows.sort();
    rows
}
