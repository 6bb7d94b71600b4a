use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc, Weekday};
use common::Result;
use datafusion::arrow::array::{Array, Int32Array, Int64Array, StringArray, TimestampSecondArray};
use datafusion::arrow::datatypes::{DataType, TimeUnit};
use datafusion::common::DataFusionError;
use datafusion::execution::context::SessionContext;
use datafusion::logical_expr::{ColumnarValue, Volatility, create_udf};
use std::sync::Arc;

pub const TO_INSTANT: &str = "to_instant";
pub const INSTANT_HOUR: &str = "instant_hour";
pub const INSTANT_DAY: &str = "instant_day";
pub const INSTANT_MONTH: &str = "instant_month";
pub const INSTANT_YEAR: &str = "instant_year";
pub const ISO_WEEK: &str = "iso_week";
pub const WEEKDAY_NAME: &str = "weekday_name";

type FunctionResult = datafusion::error::Result<ColumnarValue>;

/// Arrow type of a derived instant: whole seconds, no timezone (UTC).
pub fn instant_type() -> DataType {
    DataType::Timestamp(TimeUnit::Second, None)
}

/// Largest epoch-millisecond value `to_instant` can convert.
pub fn max_epoch_millis() -> i64 {
    DateTime::<Utc>::MAX_UTC.timestamp_millis()
}

/// Registers the calendar derivation functions with the SessionContext
pub fn register_udfs(ctx: &SessionContext) -> Result<()> {
    // Epoch milliseconds to instant
    let to_instant = create_udf(
        TO_INSTANT,
        vec![DataType::Int64],
        instant_type(),
        Volatility::Immutable,
        Arc::new(convert_to_instant),
    );
    ctx.register_udf(to_instant);

    // Calendar components of an instant
    let parts: [(&str, fn(&[ColumnarValue]) -> FunctionResult); 5] = [
        (INSTANT_HOUR, instant_hour),
        (INSTANT_DAY, instant_day),
        (INSTANT_MONTH, instant_month),
        (INSTANT_YEAR, instant_year),
        (ISO_WEEK, iso_week),
    ];
    for (name, fun) in parts {
        ctx.register_udf(create_udf(
            name,
            vec![instant_type()],
            DataType::Int32,
            Volatility::Immutable,
            Arc::new(fun),
        ));
    }

    let weekday = create_udf(
        WEEKDAY_NAME,
        vec![instant_type()],
        DataType::Utf8,
        Volatility::Immutable,
        Arc::new(weekday_name),
    );
    ctx.register_udf(weekday);

    Ok(())
}

fn single_array(args: &[ColumnarValue]) -> datafusion::error::Result<Arc<dyn Array>> {
    ColumnarValue::values_to_arrays(args)?
        .into_iter()
        .next()
        .ok_or_else(|| DataFusionError::Internal("Expected one argument".to_string()))
}

/// Truncates epoch milliseconds to whole seconds. Negative input is an error.
fn convert_to_instant(args: &[ColumnarValue]) -> FunctionResult {
    let array = single_array(args)?;
    let millis = array
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| DataFusionError::Internal("Expected int64 array".to_string()))?;

    let result = millis
        .iter()
        .map(|opt_ms| {
            opt_ms
                .map(|ms| {
                    if ms < 0 {
                        return Err(DataFusionError::Execution(format!(
                            "Negative epoch timestamp: {}",
                            ms
                        )));
                    }
                    DateTime::from_timestamp_millis(ms)
                        .map(|dt| dt.timestamp())
                        .ok_or_else(|| {
                            DataFusionError::Execution(format!(
                                "Epoch timestamp out of range: {}",
                                ms
                            ))
                        })
                })
                .transpose()
        })
        .collect::<datafusion::error::Result<TimestampSecondArray>>()?;

    Ok(ColumnarValue::Array(Arc::new(result)))
}

fn instants(args: &[ColumnarValue]) -> datafusion::error::Result<Vec<Option<NaiveDateTime>>> {
    let array = single_array(args)?;
    let seconds = array
        .as_any()
        .downcast_ref::<TimestampSecondArray>()
        .ok_or_else(|| DataFusionError::Internal("Expected timestamp(second) array".to_string()))?;

    Ok(seconds
        .iter()
        .map(|opt| opt.and_then(|secs| DateTime::from_timestamp(secs, 0)).map(|dt| dt.naive_utc()))
        .collect())
}

fn calendar_part(args: &[ColumnarValue], part: impl Fn(&NaiveDateTime) -> i32) -> FunctionResult {
    let result: Int32Array = instants(args)?
        .into_iter()
        .map(|opt| opt.as_ref().map(&part))
        .collect();
    Ok(ColumnarValue::Array(Arc::new(result)))
}

fn instant_hour(args: &[ColumnarValue]) -> FunctionResult {
    calendar_part(args, |dt| dt.hour() as i32)
}

fn instant_day(args: &[ColumnarValue]) -> FunctionResult {
    calendar_part(args, |dt| dt.day() as i32)
}

fn instant_month(args: &[ColumnarValue]) -> FunctionResult {
    calendar_part(args, |dt| dt.month() as i32)
}

fn instant_year(args: &[ColumnarValue]) -> FunctionResult {
    calendar_part(args, |dt| dt.year())
}

/// ISO-8601 week of year; early January can fall in the previous year's week.
fn iso_week(args: &[ColumnarValue]) -> FunctionResult {
    calendar_part(args, |dt| dt.iso_week().week() as i32)
}

fn weekday_name(args: &[ColumnarValue]) -> FunctionResult {
    let result: StringArray = instants(args)?
        .into_iter()
        .map(|opt| opt.map(|dt| english_day_name(dt.weekday())))
        .collect();
    Ok(ColumnarValue::Array(Arc::new(result)))
}

fn english_day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
