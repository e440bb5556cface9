//! Weekly averaging pipeline: pick the window, fetch a snapshot from the
//! store, reduce it.
//!
//! The `*_at` variants take "now" explicitly; the plain variants read the
//! wall clock on every call.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::analyzers::aggregate::{aggregate_changes, aggregate_feeds, aggregate_sleeps};
use crate::analyzers::types::{ChangeAverages, FeedAverages, SleepAverages, WeeklyReport};
use crate::analyzers::utility::one_week_ago;
use crate::records::ChildId;
use crate::store::EventStore;

pub async fn feed_averages(store: &dyn EventStore, child_id: ChildId) -> Result<FeedAverages> {
    feed_averages_at(store, child_id, Utc::now()).await
}

pub async fn change_averages(store: &dyn EventStore, child_id: ChildId) -> Result<ChangeAverages> {
    change_averages_at(store, child_id, Utc::now()).await
}

pub async fn sleep_averages(store: &dyn EventStore, child_id: ChildId) -> Result<SleepAverages> {
    sleep_averages_at(store, child_id, Utc::now()).await
}

#[tracing::instrument(skip(store), fields(child_id = %child_id))]
pub async fn feed_averages_at(
    store: &dyn EventStore,
    child_id: ChildId,
    now: DateTime<Utc>,
) -> Result<FeedAverages> {
    let since = one_week_ago(now);
    let feeds = store.feeds_since(child_id, since).await?;
    debug!(records = feeds.len(), %since, "Feeds in window");
    Ok(aggregate_feeds(&feeds))
}

#[tracing::instrument(skip(store), fields(child_id = %child_id))]
pub async fn change_averages_at(
    store: &dyn EventStore,
    child_id: ChildId,
    now: DateTime<Utc>,
) -> Result<ChangeAverages> {
    let since = one_week_ago(now);
    let changes = store.changes_since(child_id, since).await?;
    debug!(records = changes.len(), %since, "Changes in window");
    Ok(aggregate_changes(&changes))
}

#[tracing::instrument(skip(store), fields(child_id = %child_id))]
pub async fn sleep_averages_at(
    store: &dyn EventStore,
    child_id: ChildId,
    now: DateTime<Utc>,
) -> Result<SleepAverages> {
    let since = one_week_ago(now);
    let sleeps = store.sleeps_since(child_id, since).await?;
    debug!(records = sleeps.len(), %since, "Sleeps in window");
    Ok(aggregate_sleeps(&sleeps))
}

/// Computes all three summaries for one child against the same "now".
pub async fn weekly_report_at(
    store: &dyn EventStore,
    child_id: ChildId,
    now: DateTime<Utc>,
) -> Result<WeeklyReport> {
    let (feeds, changes, sleeps) = tokio::try_join!(
        feed_averages_at(store, child_id, now),
        change_averages_at(store, child_id, now),
        sleep_averages_at(store, child_id, now),
    )?;

    Ok(WeeklyReport {
        child_id,
        generated_at: now,
        window_start: one_week_ago(now),
        feeds,
        changes,
        sleeps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{
        ChangeKind, ChangeRecord, Child, FeedKind, FeedRecord, SleepLocation, SleepRecord,
    };
    use crate::store::{Listing, MemoryStore, Page};
    use anyhow::anyhow;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
    }

    async fn seeded() -> (MemoryStore, ChildId) {
        let store = MemoryStore::new();
        let child_id = store
            .insert_child(Uuid::new_v4(), Child::new("Ada", None))
            .await
            .unwrap()
            .id;

        let feeds = [
            (Duration::hours(3), 20.0),
            (Duration::days(2), 15.0),
            // outside the window
            (Duration::days(8), 60.0),
        ];
        for (ago, right) in feeds {
            let feed = FeedRecord::new(
                now() - ago,
                FeedKind::Breast {
                    right_minutes: right,
                    left_minutes: 0.0,
                },
                None,
            );
            store.put_feed(child_id, feed).await.unwrap();
        }

        for (ago, kind) in [(1, ChangeKind::Both), (2, ChangeKind::Wet), (200, ChangeKind::Dirty)] {
            let change = ChangeRecord::new(now() - Duration::hours(ago), kind, "soft".into());
            store.put_change(child_id, change).await.unwrap();
        }

        (store, child_id)
    }

    #[tokio::test]
    async fn test_feed_averages_use_window() {
        let (store, child_id) = seeded().await;
        let avg = feed_averages_at(&store, child_id, now()).await.unwrap();

        assert!((avg.right_breast_average - 35.0 / 60.0 / 7.0).abs() < 1e-12);
        assert_eq!(avg.bottle_average, 0.0);
    }

    #[tokio::test]
    async fn test_change_averages_use_window() {
        let (store, child_id) = seeded().await;
        let avg = change_averages_at(&store, child_id, now()).await.unwrap();

        assert_eq!(avg.wet_average, 2.0 / 7.0);
        assert_eq!(avg.dirty_average, 1.0 / 7.0);
    }

    #[tokio::test]
    async fn test_record_exactly_at_bound_is_excluded() {
        let (store, child_id) = seeded().await;
        let feed = FeedRecord::new(one_week_ago(now()), FeedKind::Bottle { volume: 700.0 }, None);
        store.put_feed(child_id, feed).await.unwrap();

        let avg = feed_averages_at(&store, child_id, now()).await.unwrap();
        assert_eq!(avg.bottle_average, 0.0);
    }

    #[tokio::test]
    async fn test_sleep_averages_end_to_end() {
        let (store, child_id) = seeded().await;
        // three nights, inserted out of order
        let nights = [(3, 360), (1, 480), (2, 450)];
        for (days_ago, minutes) in nights {
            let start = now() - Duration::days(days_ago) + Duration::hours(20);
            let sleep = SleepRecord::new(start, start + Duration::minutes(minutes), SleepLocation::Crib);
            store.put_sleep(child_id, sleep).await.unwrap();
        }

        let avg = sleep_averages_at(&store, child_id, now()).await.unwrap();
        assert!((avg.daily_average - 21.5 / 7.0).abs() < 1e-12);
        // gaps: (20:00 - 03:30) = 16.5h, (20:00 - 02:00) = 18h
        assert_eq!(avg.window, Some(17.25));
    }

    #[tokio::test]
    async fn test_weekly_report_without_records() {
        let store = MemoryStore::new();
        let child_id = Uuid::new_v4();
        let report = weekly_report_at(&store, child_id, now()).await.unwrap();

        assert_eq!(report.window_start, one_week_ago(now()));
        assert_eq!(report.feeds, FeedAverages::default());
        assert_eq!(report.changes, ChangeAverages::default());
        assert_eq!(report.sleeps.window, None);
    }

    /// Store whose every read fails, to check errors are passed through.
    struct Unreachable;

    #[async_trait::async_trait]
    impl EventStore for Unreachable {
        async fn parent(&self, _: Uuid) -> Result<Option<crate::records::Parent>> {
            Err(anyhow!("store unreachable"))
        }
        async fn child(&self, _: ChildId) -> Result<Option<Child>> {
            Err(anyhow!("store unreachable"))
        }
        async fn is_linked(&self, _: Uuid, _: ChildId) -> Result<bool> {
            Err(anyhow!("store unreachable"))
        }
        async fn children_of(&self, _: Uuid) -> Result<Vec<Child>> {
            Err(anyhow!("store unreachable"))
        }
        async fn insert_child(&self, _: Uuid, _: Child) -> Result<Child> {
            Err(anyhow!("store unreachable"))
        }
        async fn update_child(&self, _: Child) -> Result<Child> {
            Err(anyhow!("store unreachable"))
        }
        async fn remove_child(&self, _: Uuid, _: ChildId) -> Result<bool> {
            Err(anyhow!("store unreachable"))
        }
        async fn feeds_since(&self, _: ChildId, _: DateTime<Utc>) -> Result<Vec<FeedRecord>> {
            Err(anyhow!("store unreachable"))
        }
        async fn changes_since(&self, _: ChildId, _: DateTime<Utc>) -> Result<Vec<ChangeRecord>> {
            Err(anyhow!("store unreachable"))
        }
        async fn sleeps_since(&self, _: ChildId, _: DateTime<Utc>) -> Result<Vec<SleepRecord>> {
            Err(anyhow!("store unreachable"))
        }
        async fn feeds_page(&self, _: ChildId, _: Page) -> Result<Listing<FeedRecord>> {
            Err(anyhow!("store unreachable"))
        }
        async fn changes_page(&self, _: ChildId, _: Page) -> Result<Listing<ChangeRecord>> {
            Err(anyhow!("store unreachable"))
        }
        async fn sleeps_page(&self, _: ChildId, _: Page) -> Result<Listing<SleepRecord>> {
            Err(anyhow!("store unreachable"))
        }
        async fn feed(&self, _: ChildId, _: Uuid) -> Result<Option<FeedRecord>> {
            Err(anyhow!("store unreachable"))
        }
        async fn change(&self, _: ChildId, _: Uuid) -> Result<Option<ChangeRecord>> {
            Err(anyhow!("store unreachable"))
        }
        async fn sleep(&self, _: ChildId, _: Uuid) -> Result<Option<SleepRecord>> {
            Err(anyhow!("store unreachable"))
        }
        async fn put_feed(&self, _: ChildId, _: FeedRecord) -> Result<()> {
            Err(anyhow!("store unreachable"))
        }
        async fn put_change(&self, _: ChildId, _: ChangeRecord) -> Result<()> {
            Err(anyhow!("store unreachable"))
        }
        async fn put_sleep(&self, _: ChildId, _: SleepRecord) -> Result<()> {
            Err(anyhow!("store unreachable"))
        }
        async fn delete(&self, _: ChildId, _: crate::records::EventKind, _: Uuid) -> Result<bool> {
            Err(anyhow!("store unreachable"))
        }
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let err = sleep_averages_at(&Unreachable, Uuid::new_v4(), now())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "store unreachable");
        assert!(weekly_report_at(&Unreachable, Uuid::new_v4(), now()).await.is_err());
    }
}
