use crate::paths;
use crate::schema::TableKind;
use async_trait::async_trait;
use common::{Error, Result};
use datafusion::arrow::array::{Array, UInt64Array};
use datafusion::arrow::datatypes::DataType;
use datafusion::config::TableParquetOptions;
use datafusion::dataframe::DataFrameWriteOptions;
use datafusion::datasource::listing::ListingTableUrl;
use datafusion::logical_expr::{cast, col, lit, when};
use datafusion::prelude::*;
use futures::{StreamExt, TryStreamExt};
use parquet::basic::Compression;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Directory name hive-style writers use for a null partition value.
pub const DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// A finished star-schema table ready to be written.
pub struct StarTable {
    pub kind: TableKind,
    pub df: DataFrame,
}

impl StarTable {
    pub fn new(kind: TableKind, df: DataFrame) -> Self {
        Self { kind, df }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub table: TableKind,
    pub destination: String,
    pub rows: u64,
}

#[async_trait]
pub trait TableSink: Send + Sync {
    /// Replaces whatever is stored for `table` with its current contents.
    async fn write_table(&self, table: &StarTable) -> Result<WriteSummary>;
}

/// Writes tables as hive-partitioned Parquet directories under one root.
pub struct ParquetSink {
    ctx: SessionContext,
    output_root: String,
    compression: String,
    run_id: Uuid,
}

impl ParquetSink {
    pub fn new(
        ctx: SessionContext,
        output_root: impl Into<String>,
        compression: &str,
        run_id: Uuid,
    ) -> Result<Self> {
        Compression::from_str(compression).map_err(|e| {
            Error::InvalidInput(format!("Unsupported parquet compression '{}': {}", compression, e))
        })?;

        Ok(Self {
            ctx,
            output_root: output_root.into(),
            compression: compression.to_lowercase(),
            run_id,
        })
    }

    pub fn destination(&self, kind: TableKind) -> String {
        paths::table_destination(&self.output_root, kind.as_str())
    }

    /// Deletes every object below `destination`. Returns how many were removed.
    async fn clear_destination(&self, destination: &str) -> Result<usize> {
        let url = ListingTableUrl::parse(destination)?;
        let store = self.ctx.runtime_env().object_store(url.object_store())?;

        let locations = store
            .list(Some(url.prefix()))
            .map_ok(|meta| meta.location)
            .boxed();
        let deleted = store.delete_stream(locations).try_collect::<Vec<_>>().await?;

        Ok(deleted.len())
    }

    /// Partition values become directory names, so they are written as
    /// strings with nulls mapped to the default partition.
    fn stringify_partitions(kind: TableKind, df: DataFrame) -> Result<DataFrame> {
        kind.partition_columns().iter().try_fold(df, |df, name| {
            let value = when(col(*name).is_null(), lit(DEFAULT_PARTITION))
                .otherwise(cast(col(*name), DataType::Utf8))?;
            Ok(df.with_column(name, value)?)
        })
    }

    fn parquet_options(&self, kind: TableKind) -> TableParquetOptions {
        let mut options = TableParquetOptions::default();
        options.global.compression = Some(self.compression.clone());
        options
            .key_value_metadata
            .insert("star_table".to_string(), Some(kind.to_string()));
        options
            .key_value_metadata
            .insert("etl_run_id".to_string(), Some(self.run_id.to_string()));
        options
    }

    async fn write(&self, table: &StarTable, destination: &str) -> Result<u64> {
        let kind = table.kind;

        let removed = self.clear_destination(destination).await?;
        if removed > 0 {
            debug!(table = %kind, removed, "Cleared previous output");
        }

        let df = Self::stringify_partitions(kind, table.df.clone())?;
        let write_options = DataFrameWriteOptions::new().with_partition_by(
            kind.partition_columns()
                .iter()
                .map(|c| c.to_string())
                .collect(),
        );

        let batches = df
            .write_parquet(destination, write_options, Some(self.parquet_options(kind)))
            .await?;

        let rows: u64 = batches
            .iter()
            .filter_map(|batch| batch.column_by_name("count"))
            .filter_map(|column| column.as_any().downcast_ref::<UInt64Array>())
            .flat_map(|counts| counts.iter().flatten())
            .sum();

        Ok(rows)
    }
}

#[async_trait]
impl TableSink for ParquetSink {
    async fn write_table(&self, table: &StarTable) -> Result<WriteSummary> {
        let destination = self.destination(table.kind);
        info!(table = %table.kind, %destination, "Writing table");

        let rows = self
            .write(table, &destination)
            .await
            .map_err(|e| Error::sink_write(table.kind.as_str(), &destination, e))?;

        info!(table = %table.kind, %destination, rows, "Table written");

        Ok(WriteSummary {
            table: table.kind,
            destination,
            rows,
        })
    }
}
