use common::{Error, Result};
use datafusion::logical_expr::{Expr, ident};
use datafusion::prelude::DataFrame;

/// A source column renamed into an output column.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMapping {
    pub source: &'static str,
    pub target: &'static str,
}

const fn map(source: &'static str, target: &'static str) -> ColumnMapping {
    ColumnMapping { source, target }
}

// Catalog ("song data") records
pub const TRACK_COLUMNS: [ColumnMapping; 5] = [
    map("song_id", "track_id"),
    map("title", "title"),
    map("artist_id", "publisher_id"),
    map("year", "year"),
    map("duration", "duration"),
];

pub const PUBLISHER_COLUMNS: [ColumnMapping; 5] = [
    map("artist_id", "publisher_id"),
    map("artist_name", "name"),
    map("artist_location", "location"),
    map("artist_latitude", "latitude"),
    map("artist_longitude", "longitude"),
];

// Event log records
pub const USER_COLUMNS: [ColumnMapping; 5] = [
    map("userId", "user_id"),
    map("firstName", "first_name"),
    map("lastName", "last_name"),
    map("gender", "gender"),
    map("level", "subscription_level"),
];

pub const EVENT_TIMESTAMP: &str = "ts";
pub const EVENT_SONG_TITLE: &str = "song";
pub const EVENT_PAGE: &str = "page";

pub const SONGPLAY_EVENT_COLUMNS: [ColumnMapping; 5] = [
    map("userId", "user_id"),
    map("level", "subscription_level"),
    map("sessionId", "session_id"),
    map("location", "location"),
    map("userAgent", "user_agent"),
];

// Derived columns
pub const INSTANT: &str = "instant";
pub const SONGPLAY_ID: &str = "songplay_id";
pub const TRACK_ID: &str = "track_id";
pub const TRACK_TITLE: &str = "title";
pub const PUBLISHER_ID: &str = "publisher_id";
pub const YEAR: &str = "year";
pub const MONTH: &str = "month";

/// The tables of the star schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Tracks,
    Publishers,
    Users,
    Calendar,
    Songplays,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tracks => "tracks",
            Self::Publishers => "publishers",
            Self::Users => "users",
            Self::Calendar => "calendar",
            Self::Songplays => "songplays",
        }
    }

    /// Columns the table is physically partitioned by, outermost first.
    pub fn partition_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Tracks => &[YEAR, PUBLISHER_ID],
            Self::Publishers | Self::Users => &[],
            Self::Calendar | Self::Songplays => &[YEAR, MONTH],
        }
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fails with a schema error naming every column of `required` that `df`
/// does not have.
pub fn require_columns<'a>(
    df: &DataFrame,
    context: &str,
    required: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    let missing: Vec<&str> = required
        .into_iter()
        .filter(|name| !df.schema().has_column_with_unqualified_name(name))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Schema(format!(
            "{} is missing required column(s): {}",
            context,
            missing.join(", ")
        )))
    }
}

/// Select-and-rename expressions for a column mapping. Source names are
/// case-sensitive (`userId`), so they are referenced without normalisation.
pub fn projection(columns: &[ColumnMapping]) -> Vec<Expr> {
    columns
        .iter()
        .map(|c| ident(c.source).alias(c.target))
        .collect()
}

pub fn sources(columns: &[ColumnMapping]) -> impl Iterator<Item = &'static str> + '_ {
    columns.iter().map(|c| c.source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::prelude::SessionContext;

    #[test]
    fn test_partition_layout_per_table() {
        assert_eq!(TableKind::Tracks.partition_columns(), &["year", "publisher_id"]);
        assert!(TableKind::Publishers.partition_columns().is_empty());
        assert!(TableKind::Users.partition_columns().is_empty());
        assert_eq!(TableKind::Calendar.partition_columns(), &["year", "month"]);
        assert_eq!(TableKind::Songplays.partition_columns(), &["year", "month"]);
    }

    #[tokio::test]
    async fn test_require_columns_lists_every_missing_column() {
        let ctx = SessionContext::new();
        let df = ctx.sql("SELECT 1 AS song_id, 'x' AS title").await.unwrap();

        assert!(require_columns(&df, "catalog", ["song_id", "title"]).is_ok());

        let err = require_columns(&df, "catalog", sources(&TRACK_COLUMNS)).unwrap_err();
        match err {
            Error::Schema(msg) => {
                assert!(msg.contains("artist_id"));
                assert!(msg.contains("year"));
                assert!(msg.contains("duration"));
                assert!(!msg.contains("song_id"));
            }
            other => panic!("Expected schema error, got {other:?}"),
        }
    }
}
