use crate::schema::{EVENT_TIMESTAMP, INSTANT, MONTH, YEAR};
use crate::udf;
use common::{Error, Result};
use datafusion::arrow::datatypes::DataType;
use datafusion::logical_expr::{Expr, cast, col, ident, lit};
use datafusion::prelude::DataFrame;

fn call(df: &DataFrame, function: &str, arg: Expr) -> Result<Expr> {
    let udf = df.registry().udf(function)?;
    Ok(udf.call(vec![arg]))
}

/// Expression deriving the UTC instant from the event's epoch-millisecond
/// `ts`. Shared by the calendar and the fact table so both derive identical
/// values from the same field.
pub fn instant_expr(events: &DataFrame) -> Result<Expr> {
    let field = events
        .schema()
        .field_with_unqualified_name(EVENT_TIMESTAMP)
        .map_err(|_| Error::Timestamp(format!("event log has no '{}' column", EVENT_TIMESTAMP)))?;

    if !field.data_type().is_numeric() {
        return Err(Error::Timestamp(format!(
            "'{}' must be numeric, found {}",
            EVENT_TIMESTAMP,
            field.data_type()
        )));
    }

    call(
        events,
        udf::TO_INSTANT,
        cast(ident(EVENT_TIMESTAMP), DataType::Int64),
    )
}

/// `(year, month)` of an instant column, used as output partition keys.
pub fn partition_exprs(df: &DataFrame, instant: Expr) -> Result<(Expr, Expr)> {
    Ok((
        call(df, udf::INSTANT_YEAR, instant.clone())?,
        call(df, udf::INSTANT_MONTH, instant)?,
    ))
}

/// Fails unless every event row carries a numeric timestamp between the
/// epoch and the last instant the calendar functions can represent.
pub async fn validate_timestamps(events: &DataFrame) -> Result<()> {
    instant_expr(events)?;

    let ts = ident(EVENT_TIMESTAMP);
    let out_of_range = ts
        .clone()
        .lt(lit(0_i64))
        .or(ts.clone().gt(lit(udf::max_epoch_millis())));
    let invalid = events
        .clone()
        .filter(ts.is_null().or(out_of_range))?
        .count()
        .await?;

    if invalid > 0 {
        return Err(Error::Timestamp(format!(
            "{} event row(s) have a missing or out-of-range '{}'",
            invalid, EVENT_TIMESTAMP
        )));
    }

    Ok(())
}

/// Decomposes each event timestamp into calendar attributes. One output row
/// per event row; rows are not deduplicated.
pub struct CalendarTransformer;

impl CalendarTransformer {
    pub fn new() -> Self {
        Self
    }

    pub async fn transform(&self, events: DataFrame) -> Result<DataFrame> {
        validate_timestamps(&events).await?;

        let instant = instant_expr(&events)?;
        let instants = events.select(vec![instant.alias(INSTANT)])?;

        let (year, month) = partition_exprs(&instants, col(INSTANT))?;
        let hour = call(&instants, udf::INSTANT_HOUR, col(INSTANT))?;
        let day = call(&instants, udf::INSTANT_DAY, col(INSTANT))?;
        let week = call(&instants, udf::ISO_WEEK, col(INSTANT))?;
        let weekday = call(&instants, udf::WEEKDAY_NAME, col(INSTANT))?;

        Ok(instants.select(vec![
            col(INSTANT),
            hour.alias("hour"),
            day.alias("day"),
            week.alias("week"),
            month.alias(MONTH),
            year.alias(YEAR),
            weekday.alias("weekday"),
        ])?)
    }
}

impl Default for CalendarTransformer {
    fn default() -> Self {
        Self::new()
    }
}
