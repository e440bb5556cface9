//! Event storage.
//!
//! [`EventStore`] is the async trait the averaging pipeline and the HTTP
//! handlers read and write through. [`MemoryStore`] keeps everything in
//! process behind a read/write lock, and [`load_data_dir`] seeds one from a
//! directory of CSV files.

mod csv_dir;
mod memory;

pub use csv_dir::{ChangeRow, EventRow, FeedRow, SleepRow, append_event_row, load_data_dir};
pub use memory::MemoryStore;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::num::IntErrorKind;

use crate::records::{
    ChangeRecord, Child, ChildId, EventKind, FeedRecord, Parent, ParentId, RecordId, SleepRecord,
};

/// Number of records returned per listing page.
pub const PAGE_SIZE: usize = 10;

/// A 1-based listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page(u32);

impl Page {
    pub fn new(page: u32) -> Self {
        Self(page.max(1))
    }

    /// Parses a `page` query value. Absent, non-numeric or zero values fall
    /// back to the first page; numbers too large for a page saturate.
    pub fn from_query(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        match raw.trim().parse::<u64>() {
            Ok(page) => Self::new(u32::try_from(page).unwrap_or(u32::MAX)),
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => Self::new(u32::MAX),
            Err(_) => Self::default(),
        }
    }

    pub fn number(self) -> u32 {
        self.0
    }

    pub fn skip(self) -> usize {
        (self.0 as usize - 1).saturating_mul(PAGE_SIZE)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self(1)
    }
}

/// One page of a child's records together with the total count of that kind.
#[derive(Debug, Clone, Serialize)]
pub struct Listing<T> {
    pub total: usize,
    pub items: Vec<T>,
}

/// Storage for parents, children and the per-child event logs.
///
/// Reads return owned snapshots. Queries for a child that does not exist
/// return empty results rather than errors; callers check existence with
/// [`EventStore::child`] first.
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// The parent with `children` filled from its links.
    async fn parent(&self, parent_id: ParentId) -> Result<Option<Parent>>;

    async fn child(&self, child_id: ChildId) -> Result<Option<Child>>;

    /// Returns `true` when the parent holds a link to `child_id`. The link is
    /// kept on the parent side, so it can name a child that was since removed.
    async fn is_linked(&self, parent_id: ParentId, child_id: ChildId) -> Result<bool>;

    /// The parent's existing children, in linking order.
    async fn children_of(&self, parent_id: ParentId) -> Result<Vec<Child>>;

    /// Stores a new child linked to `parent_id`.
    async fn insert_child(&self, parent_id: ParentId, child: Child) -> Result<Child>;

    /// Overwrites the profile fields of an existing child. Parent links and
    /// event ids are left as stored.
    async fn update_child(&self, child: Child) -> Result<Child>;

    /// Removes the child and its events, and `parent_id`'s link to it.
    /// Returns `false` when the child does not exist.
    async fn remove_child(&self, parent_id: ParentId, child_id: ChildId) -> Result<bool>;

    /// Feeds with `date_and_time > since`, newest first.
    async fn feeds_since(&self, child_id: ChildId, since: DateTime<Utc>) -> Result<Vec<FeedRecord>>;

    /// Changes with `date_and_time > since`, newest first.
    async fn changes_since(
        &self,
        child_id: ChildId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ChangeRecord>>;

    /// Sleeps with `start_time > since`, ordered by start time descending.
    async fn sleeps_since(
        &self,
        child_id: ChildId,
        since: DateTime<Utc>,
    ) -> Result<Vec<SleepRecord>>;

    async fn feeds_page(&self, child_id: ChildId, page: Page) -> Result<Listing<FeedRecord>>;
    async fn changes_page(&self, child_id: ChildId, page: Page) -> Result<Listing<ChangeRecord>>;
    async fn sleeps_page(&self, child_id: ChildId, page: Page) -> Result<Listing<SleepRecord>>;

    async fn feed(&self, child_id: ChildId, id: RecordId) -> Result<Option<FeedRecord>>;
    async fn change(&self, child_id: ChildId, id: RecordId) -> Result<Option<ChangeRecord>>;
    async fn sleep(&self, child_id: ChildId, id: RecordId) -> Result<Option<SleepRecord>>;

    /// Inserts a feed, or replaces the one with the same id.
    async fn put_feed(&self, child_id: ChildId, feed: FeedRecord) -> Result<()>;
    async fn put_change(&self, child_id: ChildId, change: ChangeRecord) -> Result<()>;
    async fn put_sleep(&self, child_id: ChildId, sleep: SleepRecord) -> Result<()>;

    /// Removes a record and unlinks it from the child. Returns `false` when
    /// the child has no such record.
    async fn delete(&self, child_id: ChildId, kind: EventKind, id: RecordId) -> Result<bool>;
}
