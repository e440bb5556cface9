use chrono::{DateTime, Duration, Utc};

/// Length of the trailing averaging window, and the fixed divisor applied to
/// every weekly sum.
pub const WINDOW_DAYS: i64 = 7;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Elapsed hours between `start` and `end`, truncated toward zero to one
/// decimal place. `end` before `start` gives a negative result.
pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let ms = (end - start).num_milliseconds() as f64;
    ((ms / 1000.0 / 60.0 / 60.0) * 10.0).trunc() / 10.0
}

/// Exclusive lower bound of the trailing week ending at `now`.
pub fn one_week_ago(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(WINDOW_DAYS)
}

/// Converts a millisecond span to fractional hours without truncation.
pub fn ms_to_hours(ms: i64) -> f64 {
    ms as f64 / MS_PER_HOUR
}

/// Arithmetic mean of a slice of values. Returns `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
