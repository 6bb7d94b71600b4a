use crate::engine;
use crate::reader::SourceReader;
use crate::schema::TableKind;
use crate::sink::{ParquetSink, StarTable, TableSink, WriteSummary};
use crate::transform::{CalendarTransformer, CatalogTransformer, FactAssembler, UserTransformer};
use common::Result;
use common::config::{PipelineSettings, Settings};
use datafusion::prelude::*;
use std::sync::Arc;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

/// Row counts of one completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub tables: Vec<WriteSummary>,
}

impl RunSummary {
    pub fn rows_written(&self, kind: TableKind) -> Option<u64> {
        self.tables.iter().find(|t| t.table == kind).map(|t| t.rows)
    }
}

/// Drives one batch run from the two sources to the five tables.
pub struct Pipeline {
    ctx: SessionContext,
    settings: PipelineSettings,
    run_id: Uuid,
    reader: SourceReader,
    sink: Arc<dyn TableSink>,
}

impl Pipeline {
    pub fn new(settings: &Settings) -> Result<Self> {
        let ctx = engine::create_session(settings)?;
        let run_id = Uuid::new_v4();
        let sink = ParquetSink::new(
            ctx.clone(),
            settings.pipeline.output_root.clone(),
            &settings.pipeline.compression,
            run_id,
        )?;

        Ok(Self {
            reader: SourceReader::new(ctx.clone()),
            ctx,
            settings: settings.pipeline.clone(),
            run_id,
            sink: Arc::new(sink),
        })
    }

    /// Replaces the table writer, e.g. to capture tables in tests.
    pub fn with_sink(mut self, sink: Arc<dyn TableSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Runs every stage in order. The first failure aborts the run; tables
    /// written before it are left in place.
    pub async fn run(&self) -> Result<RunSummary> {
        let span = info_span!("etl_run", run_id = %self.run_id);
        self.run_stages().instrument(span).await
    }

    async fn run_stages(&self) -> Result<RunSummary> {
        let settings = &self.settings;
        let mut tables = Vec::with_capacity(5);

        info!(
            input_root = %settings.input_root,
            output_root = %settings.output_root,
            "Starting ETL run"
        );

        let catalog = self
            .reader
            .read(&settings.input_root, &settings.catalog_pattern)
            .await?;
        let dimensions = CatalogTransformer::new().transform(catalog).await?;

        tables.push(self.write(TableKind::Tracks, dimensions.tracks.clone()).await?);
        tables.push(self.write(TableKind::Publishers, dimensions.publishers).await?);

        let events = self
            .reader
            .read(&settings.input_root, &settings.events_pattern)
            .await?;

        let users = UserTransformer::new().transform(events.clone())?;
        tables.push(self.write(TableKind::Users, users).await?);

        let calendar = CalendarTransformer::new().transform(events.clone()).await?;
        tables.push(self.write(TableKind::Calendar, calendar).await?);

        let songplays = FactAssembler::new(self.ctx.clone())
            .with_songplay_page(settings.songplay_page.clone())
            .with_persisted_ids(settings.persist_songplay_id)
            .assemble(events, &dimensions.tracks)
            .await?;
        tables.push(self.write(TableKind::Songplays, songplays).await?);

        let summary = RunSummary {
            run_id: self.run_id,
            tables,
        };
        info!(
            tables = summary.tables.len(),
            songplays = summary.rows_written(TableKind::Songplays),
            "ETL run finished"
        );

        Ok(summary)
    }

    async fn write(&self, kind: TableKind, df: DataFrame) -> Result<WriteSummary> {
        self.sink.write_table(&StarTable::new(kind, df)).await
    }
}
