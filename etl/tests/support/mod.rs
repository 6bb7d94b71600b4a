#![allow(dead_code)]

use anyhow::Result;
use common::config::Settings;
use datafusion::arrow::datatypes::DataType;
use datafusion::arrow::util::display::array_value_to_string;
use datafusion::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;

pub fn song(id: &str, title: &str, artist: &str, year: i64) -> Value {
    json!({
        "num_songs": 1,
        "song_id": id,
        "title": title,
        "artist_id": artist,
        "year": year,
        "duration": 200.25,
        "artist_name": format!("Artist {artist}"),
        "artist_location": "Lisbon",
        "artist_latitude": 38.7,
        "artist_longitude": -9.1
    })
}

pub fn event(user: &str, title: Option<&str>, ts: i64) -> Value {
    let page = if title.is_some() { "NextSong" } else { "Home" };
    json!({
        "ts": ts,
        "userId": user,
        "firstName": "Jacob",
        "lastName": "Klein",
        "gender": "M",
        "level": "paid",
        "sessionId": 954,
        "location": "Tampa-St. Petersburg-Clearwater, FL",
        "userAgent": "Mozilla/5.0 (Macintosh)",
        "song": title,
        "page": page
    })
}

fn write_lines(path: &Path, records: &[Value]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body: String = records.iter().map(|r| format!("{}\n", r)).collect();
    fs::write(path, body)?;
    Ok(())
}

/// Writes one catalog file per record, laid out like the song dataset.
pub fn write_catalog(root: &Path, records: &[Value]) -> Result<()> {
    for (i, record) in records.iter().enumerate() {
        write_lines(
            &root.join(format!("song_data/A/B/C/TR{:05}.json", i)),
            std::slice::from_ref(record),
        )?;
    }
    Ok(())
}

pub fn write_events(root: &Path, day: &str, records: &[Value]) -> Result<()> {
    write_lines(
        &root.join(format!("log_data/2018/11/{}-events.json", day)),
        records,
    )
}

pub fn settings(input: &Path, output: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.pipeline.input_root = input.display().to_string();
    settings.pipeline.output_root = output.display().to_string();
    settings
}

/// Reads a written table back, restoring its partition columns as strings.
pub async fn read_table(output: &Path, table: &str, partitions: &[&str]) -> Result<DataFrame> {
    let ctx = SessionContext::new();
    let options = ParquetReadOptions::default().table_partition_cols(
        partitions
            .iter()
            .map(|p| (p.to_string(), DataType::Utf8))
            .collect(),
    );
    let location = format!("{}/", output.join(format!("{}.parquet", table)).display());
    Ok(ctx.read_parquet(location, options).await?)
}

/// Renders the named columns of every row, sorted.
pub async fn rows(df: DataFrame, columns: &[&str]) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    for batch in df.collect().await? {
        let indices = columns
            .iter()
            .map(|name| batch.schema().index_of(name))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for row in 0..batch.num_rows() {
            rows.push(
                indices
                    .iter()
                    .map(|&i| array_value_to_string(batch.column(i), row))
                    .collect::<std::result::Result<Vec<_>, _>>()?,
            );
        }
    }
    rows.sort();
    Ok(rows)
}
