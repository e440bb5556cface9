//! CSV data directory.
//!
//! ```text
//! <data_dir>/parents.csv                id,email,name
//! <data_dir>/children.csv               id,name,date_of_birth[,gender,weight_at_birth,size_at_birth,picture_url]
//! <data_dir>/links.csv                  parent_id,child_id
//! <data_dir>/child_id=<id>/feeds.csv    id,date_and_time,kind,right_breast_duration,...
//! <data_dir>/child_id=<id>/changes.csv  id,date_and_time,kind,consistency
//! <data_dir>/child_id=<id>/sleeps.csv   id,start_time,end_time,location
//! ```
//!
//! Missing files read as empty. Sleep durations are never stored; they are
//! recomputed from the start and end times on load.

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use super::MemoryStore;
use super::memory::Tables;
use crate::output::append_record;
use crate::records::{
    ChangeKind, ChangeRecord, Child, ChildId, FeedKind, FeedRecord, Parent, ParentId, RecordId,
    SleepLocation, SleepRecord,
};

const CHILD_DIR_PREFIX: &str = "child_id=";

#[derive(Debug, Deserialize)]
struct ParentRow {
    id: ParentId,
    email: String,
    name: String,
}

/// Birth details and picture are optional columns.
#[derive(Debug, Deserialize)]
struct ChildRow {
    id: ChildId,
    name: String,
    date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    weight_at_birth: Option<String>,
    #[serde(default)]
    size_at_birth: Option<String>,
    #[serde(default)]
    picture_url: Option<String>,
}

impl From<ChildRow> for Child {
    fn from(row: ChildRow) -> Self {
        let mut child = Child::with_id(row.id, row.name, row.date_of_birth);
        child.gender = row.gender.unwrap_or_default();
        child.weight_at_birth = row.weight_at_birth.unwrap_or_default();
        child.size_at_birth = row.size_at_birth.unwrap_or_default();
        child.picture_url = row.picture_url.filter(|url| !url.is_empty());
        child
    }
}

#[derive(Debug, Deserialize)]
struct LinkRow {
    parent_id: ParentId,
    child_id: ChildId,
}

/// A row of a per-child event file.
pub trait EventRow: Serialize {
    const FILE_NAME: &'static str;
}

/// Flat CSV form of a [`FeedRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedRow {
    pub id: Option<RecordId>,
    pub date_and_time: DateTime<Utc>,
    pub kind: String,
    pub right_breast_duration: Option<f64>,
    pub left_breast_duration: Option<f64>,
    pub bottle_volume: Option<f64>,
    pub throw_up: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRow {
    pub id: Option<RecordId>,
    pub date_and_time: DateTime<Utc>,
    pub kind: ChangeKind,
    pub consistency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepRow {
    pub id: Option<RecordId>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: SleepLocation,
}

impl EventRow for FeedRow {
    const FILE_NAME: &'static str = "feeds.csv";
}

impl EventRow for ChangeRow {
    const FILE_NAME: &'static str = "changes.csv";
}

impl EventRow for SleepRow {
    const FILE_NAME: &'static str = "sleeps.csv";
}

impl TryFrom<FeedRow> for FeedRecord {
    type Error = anyhow::Error;

    fn try_from(row: FeedRow) -> Result<Self> {
        let kind = match row.kind.trim() {
            "breast" => FeedKind::Breast {
                right_minutes: row.right_breast_duration.unwrap_or(0.0),
                left_minutes: row.left_breast_duration.unwrap_or(0.0),
            },
            "bottle" => FeedKind::Bottle {
                volume: row.bottle_volume.unwrap_or(0.0),
            },
            other => bail!("unknown feed kind '{other}'"),
        };
        Ok(FeedRecord {
            id: row.id.unwrap_or_else(Uuid::new_v4),
            date_and_time: row.date_and_time,
            kind,
            throw_up: row.throw_up,
        })
    }
}

impl From<&FeedRecord> for FeedRow {
    fn from(feed: &FeedRecord) -> Self {
        let (kind, right, left, volume) = match feed.kind {
            FeedKind::Breast {
                right_minutes,
                left_minutes,
            } => ("breast", Some(right_minutes), Some(left_minutes), None),
            FeedKind::Bottle { volume } => ("bottle", None, None, Some(volume)),
        };
        FeedRow {
            id: Some(feed.id),
            date_and_time: feed.date_and_time,
            kind: kind.to_string(),
            right_breast_duration: right,
            left_breast_duration: left,
            bottle_volume: volume,
            throw_up: feed.throw_up,
        }
    }
}

impl From<ChangeRow> for ChangeRecord {
    fn from(row: ChangeRow) -> Self {
        ChangeRecord {
            id: row.id.unwrap_or_else(Uuid::new_v4),
            date_and_time: row.date_and_time,
            kind: row.kind,
            consistency: row.consistency,
        }
    }
}

impl From<SleepRow> for SleepRecord {
    fn from(row: SleepRow) -> Self {
        SleepRecord::with_id(
            row.id.unwrap_or_else(Uuid::new_v4),
            row.start_time,
            row.end_time,
            row.location,
        )
    }
}

/// Builds a [`MemoryStore`] from a data directory.
pub fn load_data_dir(base_dir: &Path) -> Result<MemoryStore> {
    let mut tables = Tables::default();

    let parents: Vec<ParentRow> = read_rows(&base_dir.join("parents.csv"))?;
    let parent_count = parents.len();
    for row in parents {
        tables.add_parent(Parent::new(row.id, row.email, row.name));
    }

    let children: Vec<ChildRow> = read_rows(&base_dir.join("children.csv"))?;
    let child_count = children.len();
    for row in children {
        tables.add_child(row.into());
    }

    let links: Vec<LinkRow> = read_rows(&base_dir.join("links.csv"))?;
    for link in links {
        tables.link(link.parent_id, link.child_id)?;
    }

    for (child_id, child_dir) in load_child_dirs(base_dir)? {
        let feeds: Vec<FeedRow> = read_rows(&child_dir.join(FeedRow::FILE_NAME))?;
        let changes: Vec<ChangeRow> = read_rows(&child_dir.join(ChangeRow::FILE_NAME))?;
        let sleeps: Vec<SleepRow> = read_rows(&child_dir.join(SleepRow::FILE_NAME))?;
        debug!(
            %child_id,
            feeds = feeds.len(),
            changes = changes.len(),
            sleeps = sleeps.len(),
            "Loading child events"
        );

        for row in feeds {
            let feed = FeedRecord::try_from(row)
                .with_context(|| format!("invalid feed row for child {child_id}"))?;
            tables.put_feed(child_id, feed)?;
        }
        for row in changes {
            tables.put_change(child_id, row.into())?;
        }
        for row in sleeps {
            tables.put_sleep(child_id, row.into())?;
        }
    }

    info!(
        dir = %base_dir.display(),
        parents = parent_count,
        children = child_count,
        "Data directory loaded"
    );
    Ok(MemoryStore::from_tables(tables))
}

/// Appends one event row to the child's file, creating the directory and
/// header row when needed.
pub fn append_event_row<R: EventRow>(base_dir: &Path, child_id: ChildId, row: &R) -> Result<()> {
    let child_dir = base_dir.join(format!("{CHILD_DIR_PREFIX}{child_id}"));
    fs::create_dir_all(&child_dir)
        .with_context(|| format!("failed to create {}", child_dir.display()))?;

    let path = child_dir.join(R::FILE_NAME);
    let path = path
        .to_str()
        .ok_or_else(|| anyhow!("non UTF-8 path {}", path.display()))?;
    append_record(path, row)
}

fn load_child_dirs(base_dir: &Path) -> Result<Vec<(ChildId, PathBuf)>> {
    let mut dirs = Vec::new();
    if !base_dir.exists() {
        return Ok(dirs);
    }

    for entry in fs::read_dir(base_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(dir_name) = entry.file_name().to_str() {
            if let Some(raw_id) = dir_name.strip_prefix(CHILD_DIR_PREFIX) {
                let child_id: ChildId = raw_id
                    .parse()
                    .with_context(|| format!("invalid child id in directory '{dir_name}'"))?;
                dirs.push((child_id, entry.path()));
            }
        }
    }

    Ok(dirs)
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: T = result.with_context(|| format!("malformed row in {}", path.display()))?;
        rows.push(row);
    }

    Ok(rows)
}
