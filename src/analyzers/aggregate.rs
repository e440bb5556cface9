use crate::analyzers::types::{ChangeAverages, FeedAverages, SleepAverages};
use crate::analyzers::utility::{WINDOW_DAYS, mean, ms_to_hours};
use crate::records::{ChangeRecord, FeedRecord, SleepRecord};

const DAYS: f64 = WINDOW_DAYS as f64;

/// Reduces a week of feeds into per-day averages.
///
/// Breast durations are logged in minutes and reported in hours. The divisor
/// is always the full week, however many days actually have feeds.
pub fn aggregate_feeds(feeds: &[FeedRecord]) -> FeedAverages {
    let mut right_minutes = 0.0;
    let mut left_minutes = 0.0;
    let mut bottle_volume = 0.0;

    for feed in feeds {
        right_minutes += feed.right_breast_minutes();
        left_minutes += feed.left_breast_minutes();
        bottle_volume += feed.bottle_volume();
    }

    FeedAverages {
        right_breast_average: right_minutes / 60.0 / DAYS,
        left_breast_average: left_minutes / 60.0 / DAYS,
        bottle_average: bottle_volume / DAYS,
    }
}

/// Reduces a week of diaper changes into dirty and wet counts per day.
/// A `both` change counts toward each.
pub fn aggregate_changes(changes: &[ChangeRecord]) -> ChangeAverages {
    let dirty = changes.iter().filter(|c| c.kind.is_dirty()).count();
    let wet = changes.iter().filter(|c| c.kind.is_wet()).count();

    ChangeAverages {
        dirty_average: dirty as f64 / DAYS,
        wet_average: wet as f64 / DAYS,
    }
}

/// Reduces a week of sleeps into hours slept per day plus the mean gap
/// between sessions.
///
/// `sleeps` must be ordered newest first by start time.
pub fn aggregate_sleeps(sleeps: &[SleepRecord]) -> SleepAverages {
    let total_hours: f64 = sleeps.iter().map(SleepRecord::duration).sum();

    SleepAverages {
        daily_average: total_hours / DAYS,
        window: average_sleep_gap(sleeps),
    }
}

/// Mean time in hours between the end of each sleep and the start of the
/// next more recent one.
///
/// `sleeps` must be ordered newest first by start time. Overlapping sessions
/// produce negative gaps, which are averaged as-is. Returns `None` when there
/// are fewer than two sleeps.
pub fn average_sleep_gap(sleeps: &[SleepRecord]) -> Option<f64> {
    let gaps: Vec<f64> = sleeps
        .windows(2)
        .map(|pair| ms_to_hours((pair[0].start_time() - pair[1].end_time()).num_milliseconds()))
        .collect();

    mean(&gaps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ChangeKind, FeedKind, SleepLocation};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 14, 20, 0, 0).unwrap()
    }

    fn breast(right: f64, left: f64) -> FeedRecord {
        FeedRecord::new(
            t0(),
            FeedKind::Breast {
                right_minutes: right,
                left_minutes: left,
            },
            None,
        )
    }

    fn bottle(volume: f64) -> FeedRecord {
        FeedRecord::new(t0(), FeedKind::Bottle { volume }, None)
    }

    fn change(kind: ChangeKind) -> ChangeRecord {
        ChangeRecord::new(t0(), kind, "normal".to_string())
    }

    /// Builds a sleep starting `start_h` hours after t0 and lasting `hours`.
    fn sleep(start_h: i64, hours: i64) -> SleepRecord {
        let start = t0() + Duration::hours(start_h);
        SleepRecord::new(start, start + Duration::hours(hours), SleepLocation::Crib)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_feeds_empty_is_zero() {
        assert_eq!(aggregate_feeds(&[]), FeedAverages::default());
    }

    #[test]
    fn test_feeds_right_breast_only() {
        let avg = aggregate_feeds(&[breast(20.0, 0.0), breast(15.0, 0.0)]);

        assert!(approx(avg.right_breast_average, 35.0 / 60.0 / 7.0));
        assert!((avg.right_breast_average - 0.0833).abs() < 1e-4);
        assert_eq!(avg.left_breast_average, 0.0);
        assert_eq!(avg.bottle_average, 0.0);
    }

    #[test]
    fn test_feeds_mixed_kinds() {
        let avg = aggregate_feeds(&[
            breast(10.0, 25.0),
            bottle(120.0),
            bottle(90.0),
            breast(0.0, 17.0),
        ]);

        assert!(approx(avg.right_breast_average, 10.0 / 60.0 / 7.0));
        assert!(approx(avg.left_breast_average, 42.0 / 60.0 / 7.0));
        assert!(approx(avg.bottle_average, 30.0));
    }

    #[test]
    fn test_changes_both_counts_twice() {
        let avg = aggregate_changes(&[
            change(ChangeKind::Both),
            change(ChangeKind::Wet),
            change(ChangeKind::Dirty),
            change(ChangeKind::Nothing),
        ]);

        assert!(approx(avg.dirty_average, 2.0 / 7.0));
        assert!(approx(avg.wet_average, 2.0 / 7.0));
        assert!(avg.dirty_average + avg.wet_average >= 1.0 / 7.0);
    }

    #[test]
    fn test_changes_empty_is_zero() {
        assert_eq!(aggregate_changes(&[]), ChangeAverages::default());
    }

    #[test]
    fn test_sleeps_daily_average() {
        let start = t0();
        let records = vec![
            SleepRecord::new(start, start + Duration::minutes(480), SleepLocation::Crib),
            SleepRecord::new(
                start - Duration::hours(24),
                start - Duration::hours(24) + Duration::minutes(450),
                SleepLocation::Crib,
            ),
            SleepRecord::new(
                start - Duration::hours(48),
                start - Duration::hours(48) + Duration::minutes(360),
                SleepLocation::Car,
            ),
        ];

        let avg = aggregate_sleeps(&records);
        assert!(approx(avg.daily_average, (8.0 + 7.5 + 6.0) / 7.0));
        assert!((avg.daily_average - 3.0714).abs() < 1e-4);
    }

    #[test]
    fn test_sleep_gap_two_records() {
        // older: 0h..2h, newer: 5h..6h -> gap of 3 hours
        let records = vec![sleep(5, 1), sleep(0, 2)];
        assert_eq!(average_sleep_gap(&records), Some(3.0));
    }

    #[test]
    fn test_sleep_gap_averages_pairs() {
        // gaps: 10 - 7 = 3, 4 - 2 = 2
        let records = vec![sleep(10, 1), sleep(4, 3), sleep(0, 2)];
        assert_eq!(average_sleep_gap(&records), Some(2.5));
    }

    #[test]
    fn test_sleep_gap_overlap_is_negative() {
        // newer starts one hour before the older one ended
        let records = vec![sleep(2, 1), sleep(0, 3)];
        assert_eq!(average_sleep_gap(&records), Some(-1.0));
    }

    #[test]
    fn test_sleep_gap_undefined_below_two_records() {
        assert_eq!(average_sleep_gap(&[]), None);
        assert_eq!(average_sleep_gap(&[sleep(0, 2)]), None);

        let avg = aggregate_sleeps(&[]);
        assert_eq!(avg.daily_average, 0.0);
        assert_eq!(avg.window, None);
    }

    #[test]
    fn test_sleep_window_serializes_as_null() {
        let json = serde_json::to_value(aggregate_sleeps(&[sleep(0, 2)])).unwrap();
        assert!(json["window"].is_null());
        assert!(json["dailyAverage"].is_number());
    }
}
