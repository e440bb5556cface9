use anyhow::Result;
use chrono::Utc;
use tracing::info;

use super::{HttpClient, fetch_json};
use crate::analyzers::types::{ChangeAverages, FeedAverages, SleepAverages, WeeklyReport};
use crate::analyzers::utility::one_week_ago;
use crate::records::ChildId;

/// Pulls the three weekly averages for `child_id` from a running server.
///
/// `client` must identify the parent, usually through
/// [`ParentHeader`](super::auth::ParentHeader).
#[tracing::instrument(skip(client), fields(child_id = %child_id))]
pub async fn fetch_weekly_report<C: HttpClient>(
    client: &C,
    server_url: &str,
    child_id: ChildId,
) -> Result<WeeklyReport> {
    let base = server_url.trim_end_matches('/');
    let generated_at = Utc::now();

    let feeds_url = format!("{base}/api/feeds/average/{child_id}");
    let changes_url = format!("{base}/api/changes/average/{child_id}");
    let sleeps_url = format!("{base}/api/sleeps/average/{child_id}");

    let (feeds, changes, sleeps) = tokio::try_join!(
        fetch_json::<C, FeedAverages>(client, &feeds_url),
        fetch_json::<C, ChangeAverages>(client, &changes_url),
        fetch_json::<C, SleepAverages>(client, &sleeps_url),
    )?;
    info!("Weekly report fetched");

    Ok(WeeklyReport {
        child_id,
        generated_at,
        window_start: one_week_ago(generated_at),
        feeds,
        changes,
        sleeps,
    })
}
