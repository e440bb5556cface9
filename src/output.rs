//! Output formatting and persistence for weekly reports and event rows.
//!
//! Supports pretty-printing, JSON serialization, and CSV append.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::types::WeeklyReport;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Logs a weekly report as one structured line per summary.
pub fn print_pretty(report: &WeeklyReport) {
    info!(
        child_id = %report.child_id,
        window_start = %report.window_start,
        right_breast_hours_per_day = report.feeds.right_breast_average,
        left_breast_hours_per_day = report.feeds.left_breast_average,
        bottle_volume_per_day = report.feeds.bottle_average,
        "Feeds"
    );
    info!(
        child_id = %report.child_id,
        dirty_per_day = report.changes.dirty_average,
        wet_per_day = report.changes.wet_average,
        "Changes"
    );
    info!(
        child_id = %report.child_id,
        sleep_hours_per_day = report.sleeps.daily_average,
        awake_window_hours = ?report.sleeps.window,
        "Sleeps"
    );
    debug!("{:#?}", report);
}

/// Logs a weekly report as pretty-printed JSON.
pub fn print_json(report: &WeeklyReport) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Appends a record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record<T: Serialize>(path: &str, record: &T) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::{ChangeAverages, FeedAverages, SleepAverages};
    use crate::store::SleepRow;
    use crate::records::SleepLocation;
    use chrono::{TimeZone, Utc};
    use std::env;
    use std::fs;
    use uuid::Uuid;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn report() -> WeeklyReport {
        WeeklyReport {
            child_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            window_start: Utc::now(),
            feeds: FeedAverages::default(),
            changes: ChangeAverages::default(),
            sleeps: SleepAverages::default(),
        }
    }

    fn row() -> SleepRow {
        SleepRow {
            id: None,
            start_time: Utc.with_ymd_and_hms(2024, 1, 14, 20, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 1, 15, 4, 0, 0).unwrap(),
            location: SleepLocation::Crib,
        }
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&report());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&report()).unwrap();
    }

    #[test]
    fn test_append_record_creates_file() {
        let path = temp_path("nursery_log_test_create.csv");
        let _ = fs::remove_file(&path); // clean up any prior run

        append_record(&path, &row()).unwrap();

        assert!(Path::new(&path).exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("Crib"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let path = temp_path("nursery_log_test_header.csv");
        let _ = fs::remove_file(&path);

        append_record(&path, &row()).unwrap();
        append_record(&path, &row()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        let header_count = lines.iter().filter(|l| l.contains("start_time")).count();
        assert_eq!(header_count, 1);

        fs::remove_file(&path).unwrap();
    }
}
