mod support;

use anyhow::Result;
use support::{event, read_table, rows, settings, song, write_catalog, write_events};
use etl::run_with_settings;
use etl::schema::TableKind;
use std::collections::HashSet;
use std::fs;

#[tokio::test]
async fn test_example_scenario() -> Result<()> {
    let input = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    let record = song("T1", "Song A", "P1", 2000);
    write_catalog(input.path(), &[record.clone(), record])?;
    write_events(
        input.path(),
        "2001-09-09",
        &[event("26", Some("Song A"), 1_000_000_000_000)],
    )?;

    let summary = run_with_settings(&settings(input.path(), output.path())).await?;

    assert_eq!(summary.rows_written(TableKind::Tracks), Some(1));
    assert_eq!(summary.rows_written(TableKind::Songplays), Some(1));

    let tracks = read_table(output.path(), "tracks", &["year", "publisher_id"]).await?;
    assert_eq!(
        rows(tracks, &["track_id", "title", "year", "publisher_id"]).await?,
        vec![vec!["T1", "Song A", "2000", "P1"]]
    );

    let songplays = read_table(output.path(), "songplays", &["year", "month"]).await?;
    let columns = ["instant", "track_id", "publisher_id", "user_id", "year", "month"];
    assert_eq!(
        rows(songplays, &columns).await?,
        vec![vec!["2001-09-09T01:46:40", "T1", "P1", "26", "2001", "9"]]
    );

    let songplays_dir = output.path().join("songplays.parquet");
    assert!(songplays_dir.join("year=2001/month=9").is_dir());
    assert!(output.path().join("tracks.parquet/year=2000/publisher_id=P1").is_dir());
    Ok(())
}

#[tokio::test]
async fn test_facts_reference_written_dimensions() -> Result<()> {
    let input = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    write_catalog(
        input.path(),
        &[
            song("T1", "Intro", "P1", 1999),
            song("T2", "Outro", "P2", 0),
            song("T3", "Interlude", "P1", 2004),
        ],
    )?;
    write_events(
        input.path(),
        "2018-11-11",
        &[
            event("26", Some("Intro"), 1_541_903_636_796),
            event("26", Some("Outro"), 1_541_903_700_000),
            event("8", Some("Not In Catalog"), 1_541_903_800_000),
            event("8", None, 1_541_903_900_000),
            event("97", Some("Interlude"), 1_543_622_400_000),
        ],
    )?;

    run_with_settings(&settings(input.path(), output.path())).await?;

    let songplays = read_table(output.path(), "songplays", &["year", "month"]).await?;
    let facts = rows(songplays, &["track_id", "publisher_id", "instant", "year", "month"]).await?;
    assert_eq!(facts.len(), 3);

    let tracks = read_table(output.path(), "tracks", &["year", "publisher_id"]).await?;
    let track_ids: HashSet<String> =
        rows(tracks, &["track_id"]).await?.into_iter().flatten().collect();
    let publishers = read_table(output.path(), "publishers", &[]).await?;
    let publisher_ids: HashSet<String> =
        rows(publishers, &["publisher_id"]).await?.into_iter().flatten().collect();

    for fact in &facts {
        assert!(track_ids.contains(&fact[0]), "unknown track {}", fact[0]);
        assert!(publisher_ids.contains(&fact[1]), "unknown publisher {}", fact[1]);
    }

    // Every fact's partition keys agree with the calendar row for its instant.
    let calendar = read_table(output.path(), "calendar", &["year", "month"]).await?;
    let calendar_keys: HashSet<Vec<String>> =
        rows(calendar, &["instant", "year", "month"]).await?.into_iter().collect();
    assert_eq!(calendar_keys.len(), 5);
    for fact in &facts {
        assert!(calendar_keys.contains(&fact[2..].to_vec()), "no calendar row for {fact:?}");
    }

    // 2018-12-01T00:00:00Z lands in the December partition.
    assert!(output.path().join("songplays.parquet/year=2018/month=12").is_dir());
    Ok(())
}

#[tokio::test]
async fn test_rerun_replaces_previous_output() -> Result<()> {
    let input = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    write_catalog(
        input.path(),
        &[song("T1", "Song A", "P1", 2000), song("T2", "Song B", "P2", 2001)],
    )?;
    write_events(
        input.path(),
        "2018-11-11",
        &[
            event("26", Some("Song A"), 1_541_903_636_796),
            event("26", Some("Song B"), 1_541_903_700_000),
        ],
    )?;
    let settings = settings(input.path(), output.path());
    run_with_settings(&settings).await?;

    fs::remove_dir_all(input.path().join("song_data"))?;
    fs::remove_dir_all(input.path().join("log_data"))?;
    write_catalog(input.path(), &[song("T9", "Song Z", "P9", 2010)])?;
    write_events(
        input.path(),
        "2018-11-12",
        &[event("44", Some("Song Z"), 1_541_990_400_000)],
    )?;
    run_with_settings(&settings).await?;

    let tracks = read_table(output.path(), "tracks", &["year", "publisher_id"]).await?;
    assert_eq!(rows(tracks, &["track_id"]).await?, vec![vec!["T9"]]);

    let users = read_table(output.path(), "users", &[]).await?;
    assert_eq!(rows(users, &["user_id"]).await?, vec![vec!["44"]]);

    let songplays = read_table(output.path(), "songplays", &["year", "month"]).await?;
    assert_eq!(rows(songplays, &["track_id"]).await?, vec![vec!["T9"]]);
    Ok(())
}

#[tokio::test]
async fn test_duplicated_catalog_gives_identical_dimensions() -> Result<()> {
    let catalog = [song("T1", "Song A", "P1", 2000), song("T2", "Song B", "P1", 2000)];
    let events = [event("26", Some("Song A"), 1_541_903_636_796)];

    let mut results = Vec::new();
    for copies in [1, 3] {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        let records: Vec<_> = catalog
            .iter()
            .cycle()
            .take(catalog.len() * copies)
            .cloned()
            .collect();
        write_catalog(input.path(), &records)?;
        write_events(input.path(), "2018-11-11", &events)?;

        run_with_settings(&settings(input.path(), output.path())).await?;

        let tracks = read_table(output.path(), "tracks", &["year", "publisher_id"]).await?;
        let publishers = read_table(output.path(), "publishers", &[]).await?;
        results.push((
            rows(tracks, &["track_id", "title", "year", "publisher_id"]).await?,
            rows(publishers, &["publisher_id", "name", "location"]).await?,
        ));
    }

    assert_eq!(results[0], results[1]);
    assert_eq!(results[0].0.len(), 2);
    assert_eq!(results[0].1.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_missing_catalog_column_fails_run() -> Result<()> {
    let input = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    let mut record = song("T1", "Song A", "P1", 2000);
    if let Some(fields) = record.as_object_mut() {
        fields.remove("artist_id");
    }
    write_catalog(input.path(), &[record])?;
    write_events(input.path(), "2018-11-11", &[event("26", Some("Song A"), 1)])?;

    let err = run_with_settings(&settings(input.path(), output.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, common::Error::Schema(_)), "got {err:?}");
    assert!(err.to_string().contains("artist_id"));
    assert!(!output.path().join("tracks.parquet").exists());
    Ok(())
}
