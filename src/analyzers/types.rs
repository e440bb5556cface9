//! Result types produced by the weekly aggregation pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::records::ChildId;

/// Average breast-feeding hours per day for each side and average bottle
/// volume per day over the trailing week.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedAverages {
    pub right_breast_average: f64,
    pub left_breast_average: f64,
    pub bottle_average: f64,
}

/// Dirty and wet diapers per day over the trailing week.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeAverages {
    pub dirty_average: f64,
    pub wet_average: f64,
}

/// Hours slept per day and the mean awake gap between consecutive sleeps.
///
/// `window` is `None` (serialized as `null`) when fewer than two sleeps fall
/// inside the week, since there is no gap to average.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepAverages {
    pub daily_average: f64,
    pub window: Option<f64>,
}

/// All three summaries for one child, as printed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub child_id: ChildId,
    pub generated_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub feeds: FeedAverages,
    pub changes: ChangeAverages,
    pub sleeps: SleepAverages,
}
