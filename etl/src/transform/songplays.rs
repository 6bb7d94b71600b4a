use crate::schema::{
    EVENT_PAGE, EVENT_SONG_TITLE, EVENT_TIMESTAMP, INSTANT, MONTH, PUBLISHER_ID,
    SONGPLAY_EVENT_COLUMNS, SONGPLAY_ID, TRACK_ID, TRACK_TITLE, YEAR, projection,
    require_columns, sources,
};
use crate::transform::calendar;
use arrow::array::{ArrayRef, Int64Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use common::Result;
use datafusion::common::JoinType;
use datafusion::datasource::MemTable;
use datafusion::logical_expr::{col, ident, lit};
use datafusion::prelude::*;
use std::sync::Arc;
use tracing::info;

/// Hands out songplay ids for a single run.
///
/// Ids increase strictly in the order rows are assigned. They are only
/// unique within the run that produced them and are not a durable key.
#[derive(Debug)]
pub struct SongplaySequence {
    next: i64,
}

impl SongplaySequence {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Number of ids handed out so far.
    pub fn assigned(&self) -> i64 {
        self.next - 1
    }

    pub fn id_schema(schema: &Schema) -> SchemaRef {
        let mut fields = vec![Arc::new(Field::new(SONGPLAY_ID, DataType::Int64, false))];
        fields.extend(schema.fields().iter().cloned());
        Arc::new(Schema::new(fields))
    }

    /// Prepends a `songplay_id` column to `batch`.
    pub fn assign(&mut self, schema: &SchemaRef, batch: &RecordBatch) -> Result<RecordBatch> {
        let rows = batch.num_rows() as i64;
        let ids = Int64Array::from_iter_values(self.next..self.next + rows);
        self.next += rows;

        let mut columns: Vec<ArrayRef> = vec![Arc::new(ids)];
        columns.extend(batch.columns().iter().cloned());
        Ok(RecordBatch::try_new(schema.clone(), columns)?)
    }
}

impl Default for SongplaySequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Rebuilds listening events by joining the event log to the track
/// dimension on song title.
pub struct FactAssembler {
    ctx: SessionContext,
    songplay_page: Option<String>,
    persist_songplay_id: bool,
}

impl FactAssembler {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            songplay_page: None,
            persist_songplay_id: false,
        }
    }

    /// Keep only events whose `page` equals `page` (e.g. "NextSong").
    pub fn with_songplay_page(mut self, page: Option<String>) -> Self {
        self.songplay_page = page;
        self
    }

    pub fn with_persisted_ids(mut self, persist: bool) -> Self {
        self.persist_songplay_id = persist;
        self
    }

    /// Events whose title matches no track are dropped; a title matching
    /// several tracks yields one fact row per match.
    pub async fn assemble(&self, events: DataFrame, tracks: &DataFrame) -> Result<DataFrame> {
        require_columns(
            &events,
            "event log",
            sources(&SONGPLAY_EVENT_COLUMNS).chain([EVENT_TIMESTAMP, EVENT_SONG_TITLE]),
        )?;
        require_columns(tracks, "tracks table", [TRACK_TITLE, TRACK_ID, PUBLISHER_ID])?;

        let events = match &self.songplay_page {
            Some(page) => {
                require_columns(&events, "event log", [EVENT_PAGE])?;
                events.filter(ident(EVENT_PAGE).eq(lit(page.as_str())))?
            }
            None => events,
        };

        calendar::validate_timestamps(&events).await?;

        let mut selected = vec![ident(EVENT_TIMESTAMP), ident(EVENT_SONG_TITLE)];
        selected.extend(projection(&SONGPLAY_EVENT_COLUMNS));
        let events = events.select(selected)?;

        let track_keys = tracks
            .clone()
            .select(vec![col(TRACK_TITLE), col(TRACK_ID), col(PUBLISHER_ID)])?;
        let joined = events.join(
            track_keys,
            JoinType::Inner,
            &[EVENT_SONG_TITLE],
            &[TRACK_TITLE],
            None,
        )?;

        let instant = calendar::instant_expr(&joined)?;
        let joined = joined.with_column(INSTANT, instant)?;
        let (year, month) = calendar::partition_exprs(&joined, col(INSTANT))?;

        let facts = joined.select(vec![
            col(INSTANT),
            col("user_id"),
            col("subscription_level"),
            col(TRACK_ID),
            col(PUBLISHER_ID),
            col("session_id"),
            col("location"),
            col("user_agent"),
            year.alias(YEAR),
            month.alias(MONTH),
        ])?;

        let facts = self.assign_ids(facts).await?;
        if self.persist_songplay_id {
            Ok(facts)
        } else {
            Ok(facts.drop_columns(&[SONGPLAY_ID])?)
        }
    }

    async fn assign_ids(&self, facts: DataFrame) -> Result<DataFrame> {
        let logical = Schema::from(facts.schema());
        let batches = facts.collect().await?;

        let base = batches
            .first()
            .map(|b| b.schema())
            .unwrap_or_else(|| Arc::new(logical));
        let schema = SongplaySequence::id_schema(&base);

        let mut sequence = SongplaySequence::new();
        let batches = batches
            .iter()
            .map(|batch| sequence.assign(&schema, batch))
            .collect::<Result<Vec<_>>>()?;

        info!(songplays = sequence.assigned(), "Assigned songplay ids");

        let table = MemTable::try_new(schema, vec![batches])?;
        Ok(self.ctx.read_table(Arc::new(table))?)
    }
}
