//! Event records logged per child: feeds, diaper changes and sleeps.
//!
//! Records are plain value types. The store hands out clones of them, so the
//! aggregation code always works on a snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::analyzers::utility::hours_between;

pub type ParentId = Uuid;
pub type ChildId = Uuid;
pub type RecordId = Uuid;

/// The three kinds of events a child's log holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Feed,
    Change,
    Sleep,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Feed => "feed",
            EventKind::Change => "change",
            EventKind::Sleep => "sleep",
        };
        f.write_str(name)
    }
}

/// What was fed. Breast durations are minutes per side; a side that was not
/// used is 0. Bottle volume carries no unit conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FeedKind {
    Breast {
        #[serde(rename = "rightBreastDuration", default)]
        right_minutes: f64,
        #[serde(rename = "leftBreastDuration", default)]
        left_minutes: f64,
    },
    Bottle {
        #[serde(rename = "bottleVolume", default)]
        volume: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedRecord {
    pub id: RecordId,
    pub date_and_time: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: FeedKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throw_up: Option<bool>,
}

impl FeedRecord {
    pub fn new(date_and_time: DateTime<Utc>, kind: FeedKind, throw_up: Option<bool>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date_and_time,
            kind,
            throw_up,
        }
    }

    pub fn right_breast_minutes(&self) -> f64 {
        match self.kind {
            FeedKind::Breast { right_minutes, .. } => right_minutes,
            FeedKind::Bottle { .. } => 0.0,
        }
    }

    pub fn left_breast_minutes(&self) -> f64 {
        match self.kind {
            FeedKind::Breast { left_minutes, .. } => left_minutes,
            FeedKind::Bottle { .. } => 0.0,
        }
    }

    pub fn bottle_volume(&self) -> f64 {
        match self.kind {
            FeedKind::Bottle { volume } => volume,
            FeedKind::Breast { .. } => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Wet,
    Dirty,
    Both,
    Nothing,
}

impl ChangeKind {
    pub fn is_wet(self) -> bool {
        matches!(self, ChangeKind::Wet | ChangeKind::Both)
    }

    pub fn is_dirty(self) -> bool {
        matches!(self, ChangeKind::Dirty | ChangeKind::Both)
    }
}

impl FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "wet" => Ok(ChangeKind::Wet),
            "dirty" => Ok(ChangeKind::Dirty),
            "both" => Ok(ChangeKind::Both),
            "nothing" => Ok(ChangeKind::Nothing),
            other => Err(format!(
                "unknown change kind '{other}', expected wet, dirty, both or nothing"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub id: RecordId,
    pub date_and_time: DateTime<Utc>,
    pub kind: ChangeKind,
    pub consistency: String,
}

impl ChangeRecord {
    pub fn new(date_and_time: DateTime<Utc>, kind: ChangeKind, consistency: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            date_and_time,
            kind,
            consistency,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SleepLocation {
    #[serde(rename = "Parents Bed")]
    ParentsBed,
    Crib,
    Stroller,
    Car,
}

impl FromStr for SleepLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Parents Bed" => Ok(SleepLocation::ParentsBed),
            "Crib" => Ok(SleepLocation::Crib),
            "Stroller" => Ok(SleepLocation::Stroller),
            "Car" => Ok(SleepLocation::Car),
            other => Err(format!(
                "unknown sleep location '{other}', expected Parents Bed, Crib, Stroller or Car"
            )),
        }
    }
}

/// A sleep session. `duration` (hours) is derived from the start and end
/// times and is only ever written by [`SleepRecord::new`] and
/// [`SleepRecord::set_times`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "SleepWire")]
pub struct SleepRecord {
    pub id: RecordId,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration: f64,
    pub location: SleepLocation,
}

/// Incoming JSON shape of a sleep. Any `duration` sent along is ignored.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SleepWire {
    id: RecordId,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    location: SleepLocation,
}

impl From<SleepWire> for SleepRecord {
    fn from(wire: SleepWire) -> Self {
        SleepRecord::with_id(wire.id, wire.start_time, wire.end_time, wire.location)
    }
}

impl SleepRecord {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>, location: SleepLocation) -> Self {
        Self::with_id(Uuid::new_v4(), start_time, end_time, location)
    }

    pub fn with_id(
        id: RecordId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        location: SleepLocation,
    ) -> Self {
        Self {
            id,
            start_time,
            end_time,
            duration: hours_between(start_time, end_time),
            location,
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    /// Duration in hours, truncated to one decimal place.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Moves either end of the session and recomputes the duration.
    pub fn set_times(&mut self, start_time: Option<DateTime<Utc>>, end_time: Option<DateTime<Utc>>) {
        if start_time.is_none() && end_time.is_none() {
            return;
        }
        if let Some(start) = start_time {
            self.start_time = start;
        }
        if let Some(end) = end_time {
            self.end_time = end;
        }
        self.duration = hours_between(self.start_time, self.end_time);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parent {
    pub id: ParentId,
    pub email: String,
    pub name: String,
    /// Children this parent is linked to, in linking order. Filled in by the
    /// store on read.
    #[serde(default)]
    pub children: Vec<ChildId>,
}

impl Parent {
    pub fn new(id: ParentId, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into().trim().to_lowercase(),
            name: name.into(),
            children: Vec::new(),
        }
    }
}

/// A child profile together with the ordered ids of its logged events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub id: ChildId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub weight_at_birth: String,
    #[serde(default)]
    pub size_at_birth: String,
    #[serde(rename = "pictureURL", default, skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub parents: Vec<ParentId>,
    #[serde(default)]
    pub feeds: Vec<RecordId>,
    #[serde(default)]
    pub changes: Vec<RecordId>,
    #[serde(default)]
    pub sleeps: Vec<RecordId>,
}

impl Child {
    pub fn new(name: impl Into<String>, date_of_birth: Option<NaiveDate>) -> Self {
        Self::with_id(Uuid::new_v4(), name, date_of_birth)
    }

    pub fn with_id(id: ChildId, name: impl Into<String>, date_of_birth: Option<NaiveDate>) -> Self {
        Self {
            id,
            name: normalize_name(&name.into()),
            date_of_birth,
            gender: String::new(),
            weight_at_birth: String::new(),
            size_at_birth: String::new(),
            picture_url: None,
            parents: Vec::new(),
            feeds: Vec::new(),
            changes: Vec::new(),
            sleeps: Vec::new(),
        }
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = normalize_name(name);
    }

    pub fn record_ids(&self, kind: EventKind) -> &[RecordId] {
        match kind {
            EventKind::Feed => &self.feeds,
            EventKind::Change => &self.changes,
            EventKind::Sleep => &self.sleeps,
        }
    }

    pub(crate) fn record_ids_mut(&mut self, kind: EventKind) -> &mut Vec<RecordId> {
        match kind {
            EventKind::Feed => &mut self.feeds,
            EventKind::Change => &mut self.changes,
            EventKind::Sleep => &mut self.sleeps,
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
