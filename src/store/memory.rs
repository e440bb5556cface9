use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{EventStore, Listing, PAGE_SIZE, Page};
use crate::records::{
    ChangeRecord, Child, ChildId, EventKind, FeedRecord, Parent, ParentId, RecordId, SleepRecord,
};

/// In-process [`EventStore`].
///
/// All tables sit behind one `RwLock`; reads clone the matching records out
/// so callers always reduce over a consistent snapshot.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
pub(crate) struct Tables {
    parents: HashMap<ParentId, Parent>,
    children: HashMap<ChildId, Child>,
    /// Parent-side links, in linking order. A link may outlive the child it
    /// names when another parent removes that child.
    links: HashMap<ParentId, Vec<ChildId>>,
    feeds: HashMap<RecordId, FeedRecord>,
    changes: HashMap<RecordId, ChangeRecord>,
    sleeps: HashMap<RecordId, SleepRecord>,
}

/// A record type with its own table and a timestamp to order it by.
trait Logged: Clone {
    const KIND: EventKind;
    fn id(&self) -> RecordId;
    fn logged_at(&self) -> DateTime<Utc>;
    fn table(tables: &Tables) -> &HashMap<RecordId, Self>;
    fn table_mut(tables: &mut Tables) -> &mut HashMap<RecordId, Self>;
}

impl Logged for FeedRecord {
    const KIND: EventKind = EventKind::Feed;
    fn id(&self) -> RecordId {
        self.id
    }
    fn logged_at(&self) -> DateTime<Utc> {
        self.date_and_time
    }
    fn table(tables: &Tables) -> &HashMap<RecordId, Self> {
        &tables.feeds
    }
    fn table_mut(tables: &mut Tables) -> &mut HashMap<RecordId, Self> {
        &mut tables.feeds
    }
}

impl Logged for ChangeRecord {
    const KIND: EventKind = EventKind::Change;
    fn id(&self) -> RecordId {
        self.id
    }
    fn logged_at(&self) -> DateTime<Utc> {
        self.date_and_time
    }
    fn table(tables: &Tables) -> &HashMap<RecordId, Self> {
        &tables.changes
    }
    fn table_mut(tables: &mut Tables) -> &mut HashMap<RecordId, Self> {
        &mut tables.changes
    }
}

impl Logged for SleepRecord {
    const KIND: EventKind = EventKind::Sleep;
    fn id(&self) -> RecordId {
        self.id
    }
    fn logged_at(&self) -> DateTime<Utc> {
        self.start_time()
    }
    fn table(tables: &Tables) -> &HashMap<RecordId, Self> {
        &tables.sleeps
    }
    fn table_mut(tables: &mut Tables) -> &mut HashMap<RecordId, Self> {
        &mut tables.sleeps
    }
}

impl Tables {
    pub(crate) fn add_parent(&mut self, parent: Parent) {
        self.parents.insert(parent.id, parent);
    }

    pub(crate) fn add_child(&mut self, child: Child) {
        self.children.insert(child.id, child);
    }

    pub(crate) fn link(&mut self, parent_id: ParentId, child_id: ChildId) -> Result<()> {
        let Some(child) = self.children.get_mut(&child_id) else {
            bail!("cannot link parent {parent_id}: child {child_id} not found");
        };
        if !child.parents.contains(&parent_id) {
            child.parents.push(parent_id);
        }
        let linked = self.links.entry(parent_id).or_default();
        if !linked.contains(&child_id) {
            linked.push(child_id);
        }
        Ok(())
    }

    fn is_linked(&self, parent_id: ParentId, child_id: ChildId) -> bool {
        self.links
            .get(&parent_id)
            .is_some_and(|linked| linked.contains(&child_id))
    }

    /// Drops the child with all of its events. Only `parent_id`'s link is
    /// removed; other parents keep a link to a child that no longer exists.
    fn remove_child(&mut self, parent_id: ParentId, child_id: ChildId) -> bool {
        if let Some(linked) = self.links.get_mut(&parent_id) {
            linked.retain(|id| *id != child_id);
        }
        let Some(child) = self.children.remove(&child_id) else {
            return false;
        };
        for id in &child.feeds {
            self.feeds.remove(id);
        }
        for id in &child.changes {
            self.changes.remove(id);
        }
        for id in &child.sleeps {
            self.sleeps.remove(id);
        }
        true
    }

    pub(crate) fn put_feed(&mut self, child_id: ChildId, feed: FeedRecord) -> Result<()> {
        self.put(child_id, feed)
    }

    pub(crate) fn put_change(&mut self, child_id: ChildId, change: ChangeRecord) -> Result<()> {
        self.put(child_id, change)
    }

    pub(crate) fn put_sleep(&mut self, child_id: ChildId, sleep: SleepRecord) -> Result<()> {
        self.put(child_id, sleep)
    }

    fn put<E: Logged>(&mut self, child_id: ChildId, record: E) -> Result<()> {
        let id = record.id();
        let owned_elsewhere = self
            .children
            .values()
            .any(|c| c.id != child_id && c.record_ids(E::KIND).contains(&id));
        if owned_elsewhere {
            bail!("{} {id} already belongs to another child", E::KIND);
        }

        let Some(child) = self.children.get_mut(&child_id) else {
            bail!("child {child_id} not found");
        };
        let ids = child.record_ids_mut(E::KIND);
        if !ids.contains(&id) {
            ids.push(id);
        }
        E::table_mut(self).insert(id, record);
        Ok(())
    }

    /// The child's records of one kind, newest first.
    fn owned<E: Logged>(&self, child_id: ChildId) -> Vec<E> {
        let Some(child) = self.children.get(&child_id) else {
            return Vec::new();
        };
        let table = E::table(self);
        let mut records: Vec<E> = child
            .record_ids(E::KIND)
            .iter()
            .filter_map(|id| table.get(id).cloned())
            .collect();
        records.sort_by(|a, b| b.logged_at().cmp(&a.logged_at()));
        records
    }

    fn since<E: Logged>(&self, child_id: ChildId, since: DateTime<Utc>) -> Vec<E> {
        self.owned::<E>(child_id)
            .into_iter()
            .filter(|r| r.logged_at() > since)
            .collect()
    }

    fn page<E: Logged>(&self, child_id: ChildId, page: Page) -> Listing<E> {
        let total = self
            .children
            .get(&child_id)
            .map_or(0, |c| c.record_ids(E::KIND).len());
        let items = self
            .owned::<E>(child_id)
            .into_iter()
            .skip(page.skip())
            .take(PAGE_SIZE)
            .collect();
        Listing { total, items }
    }

    fn get<E: Logged>(&self, child_id: ChildId, id: RecordId) -> Option<E> {
        let child = self.children.get(&child_id)?;
        if !child.record_ids(E::KIND).contains(&id) {
            return None;
        }
        E::table(self).get(&id).cloned()
    }

    fn remove<E: Logged>(&mut self, child_id: ChildId, id: RecordId) -> bool {
        let Some(child) = self.children.get_mut(&child_id) else {
            return false;
        };
        let ids = child.record_ids_mut(E::KIND);
        let before = ids.len();
        ids.retain(|r| *r != id);
        if ids.len() == before {
            return false;
        }
        E::table_mut(self).remove(&id);
        true
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_tables(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Registers a parent account. Authentication itself lives outside this
    /// crate; a registered id is what the `X-Parent-Id` header carries.
    pub async fn add_parent(&self, parent: Parent) {
        self.tables.write().await.add_parent(parent);
    }

    /// Links an existing child to another parent.
    pub async fn link(&self, parent_id: ParentId, child_id: ChildId) -> Result<()> {
        self.tables.write().await.link(parent_id, child_id)
    }
}

#[async_trait::async_trait]
impl EventStore for MemoryStore {
    async fn child(&self, child_id: ChildId) -> Result<Option<Child>> {
        Ok(self.tables.read().await.children.get(&child_id).cloned())
    }

    async fn parent(&self, parent_id: ParentId) -> Result<Option<Parent>> {
        let tables = self.tables.read().await;
        Ok(tables.parents.get(&parent_id).map(|parent| Parent {
            children: tables.links.get(&parent_id).cloned().unwrap_or_default(),
            ..parent.clone()
        }))
    }

    async fn is_linked(&self, parent_id: ParentId, child_id: ChildId) -> Result<bool> {
        Ok(self.tables.read().await.is_linked(parent_id, child_id))
    }

    async fn children_of(&self, parent_id: ParentId) -> Result<Vec<Child>> {
        let tables = self.tables.read().await;
        let Some(linked) = tables.links.get(&parent_id) else {
            return Ok(Vec::new());
        };
        Ok(linked
            .iter()
            .filter_map(|id| tables.children.get(id).cloned())
            .collect())
    }

    async fn insert_child(&self, parent_id: ParentId, child: Child) -> Result<Child> {
        let mut tables = self.tables.write().await;
        let child_id = child.id;
        tables.add_child(child);
        tables.link(parent_id, child_id)?;
        Ok(tables.children[&child_id].clone())
    }

    async fn update_child(&self, child: Child) -> Result<Child> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.children.get_mut(&child.id) else {
            bail!("child {} not found", child.id);
        };
        stored.name = child.name;
        stored.date_of_birth = child.date_of_birth;
        stored.gender = child.gender;
        stored.weight_at_birth = child.weight_at_birth;
        stored.size_at_birth = child.size_at_birth;
        stored.picture_url = child.picture_url;
        Ok(stored.clone())
    }

    async fn remove_child(&self, parent_id: ParentId, child_id: ChildId) -> Result<bool> {
        Ok(self.tables.write().await.remove_child(parent_id, child_id))
    }

    async fn feeds_since(&self, child_id: ChildId, since: DateTime<Utc>) -> Result<Vec<FeedRecord>> {
        Ok(self.tables.read().await.since(child_id, since))
    }

    async fn changes_since(
        &self,
        child_id: ChildId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ChangeRecord>> {
        Ok(self.tables.read().await.since(child_id, since))
    }

    async fn sleeps_since(
        &self,
        child_id: ChildId,
        since: DateTime<Utc>,
    ) -> Result<Vec<SleepRecord>> {
        Ok(self.tables.read().await.since(child_id, since))
    }

    async fn feeds_page(&self, child_id: ChildId, page: Page) -> Result<Listing<FeedRecord>> {
        Ok(self.tables.read().await.page(child_id, page))
    }

    async fn changes_page(&self, child_id: ChildId, page: Page) -> Result<Listing<ChangeRecord>> {
        Ok(self.tables.read().await.page(child_id, page))
    }

    async fn sleeps_page(&self, child_id: ChildId, page: Page) -> Result<Listing<SleepRecord>> {
        Ok(self.tables.read().await.page(child_id, page))
    }

    async fn feed(&self, child_id: ChildId, id: RecordId) -> Result<Option<FeedRecord>> {
        Ok(self.tables.read().await.get(child_id, id))
    }

    async fn change(&self, child_id: ChildId, id: RecordId) -> Result<Option<ChangeRecord>> {
        Ok(self.tables.read().await.get(child_id, id))
    }

    async fn sleep(&self, child_id: ChildId, id: RecordId) -> Result<Option<SleepRecord>> {
        Ok(self.tables.read().await.get(child_id, id))
    }

    async fn put_feed(&self, child_id: ChildId, feed: FeedRecord) -> Result<()> {
        self.tables.write().await.put_feed(child_id, feed)
    }

    async fn put_change(&self, child_id: ChildId, change: ChangeRecord) -> Result<()> {
        self.tables.write().await.put_change(child_id, change)
    }

    async fn put_sleep(&self, child_id: ChildId, sleep: SleepRecord) -> Result<()> {
        self.tables.write().await.put_sleep(child_id, sleep)
    }

    async fn delete(&self, child_id: ChildId, kind: EventKind, id: RecordId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        Ok(match kind {
            EventKind::Feed => tables.remove::<FeedRecord>(child_id, id),
            EventKind::Change => tables.remove::<ChangeRecord>(child_id, id),
            EventKind::Sleep => tables.remove::<SleepRecord>(child_id, id),
        })
    }
}
