//! Route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use super::auth::{LoggedParent, authorize_child};
use crate::analyzers::{self, ChangeAverages, FeedAverages, SleepAverages};
use crate::error::ApiError;
use crate::records::{
    ChangeKind, ChangeRecord, Child, EventKind, FeedKind, FeedRecord, Parent, RecordId,
    SleepLocation, SleepRecord,
};
use crate::store::{EventStore, Page};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    fn page(&self) -> Page {
        Page::from_query(self.page.as_deref())
    }
}

/// Create/patch body for feeds. Every field is optional so that validation
/// can answer with a message instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedInput {
    date_and_time: Option<DateTime<Utc>>,
    kind: Option<String>,
    right_breast_duration: Option<f64>,
    left_breast_duration: Option<f64>,
    bottle_volume: Option<f64>,
    throw_up: Option<bool>,
}

impl FeedInput {
    /// Builds the feed payload, starting from `current` when patching. A
    /// kind switch drops the previous kind's fields.
    fn feed_kind(&self, current: Option<&FeedKind>) -> Result<FeedKind, ApiError> {
        let kind_name = match (&self.kind, current) {
            (Some(kind), _) => kind.trim(),
            (None, Some(FeedKind::Breast { .. })) => "breast",
            (None, Some(FeedKind::Bottle { .. })) => "bottle",
            (None, None) => {
                return Err(ApiError::BadRequest(
                    "date and kind fields must be provided".into(),
                ));
            }
        };

        match kind_name {
            "breast" => {
                let (right, left) = match current {
                    Some(FeedKind::Breast {
                        right_minutes,
                        left_minutes,
                    }) => (*right_minutes, *left_minutes),
                    _ => (0.0, 0.0),
                };
                Ok(FeedKind::Breast {
                    right_minutes: self.right_breast_duration.unwrap_or(right),
                    left_minutes: self.left_breast_duration.unwrap_or(left),
                })
            }
            "bottle" => {
                let volume = match current {
                    Some(FeedKind::Bottle { volume }) => *volume,
                    _ => 0.0,
                };
                Ok(FeedKind::Bottle {
                    volume: self.bottle_volume.unwrap_or(volume),
                })
            }
            other => Err(ApiError::BadRequest(format!(
                "unknown feed kind '{other}', expected breast or bottle"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeInput {
    date_and_time: Option<DateTime<Utc>>,
    kind: Option<String>,
    consistency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepInput {
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    location: Option<String>,
}

/// Create/patch body for a child profile. Values stay strings until
/// validated so an empty string answers 400 rather than a rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildInput {
    name: Option<String>,
    date_of_birth: Option<String>,
    gender: Option<String>,
    weight_at_birth: Option<String>,
    size_at_birth: Option<String>,
    #[serde(rename = "pictureURL")]
    picture_url: Option<String>,
}

impl ChildInput {
    fn required(&self) -> [&Option<String>; 5] {
        [
            &self.name,
            &self.date_of_birth,
            &self.gender,
            &self.weight_at_birth,
            &self.size_at_birth,
        ]
    }

    fn has_empty_field(&self) -> bool {
        self.required()
            .iter()
            .any(|field| field.as_deref().is_some_and(|v| v.trim().is_empty()))
    }

    fn date_of_birth(&self) -> Result<Option<NaiveDate>, ApiError> {
        self.date_of_birth
            .as_deref()
            .map(|raw| {
                raw.trim().parse().map_err(|_| {
                    ApiError::BadRequest(format!("invalid date of birth '{raw}', expected YYYY-MM-DD"))
                })
            })
            .transpose()
    }

    /// Writes every provided field onto `child`.
    fn apply(&self, child: &mut Child) -> Result<(), ApiError> {
        if let Some(name) = non_empty(&self.name) {
            child.set_name(name);
        }
        if let Some(date_of_birth) = self.date_of_birth()? {
            child.date_of_birth = Some(date_of_birth);
        }
        if let Some(gender) = non_empty(&self.gender) {
            child.gender = gender.to_string();
        }
        if let Some(weight) = non_empty(&self.weight_at_birth) {
            child.weight_at_birth = weight.to_string();
        }
        if let Some(size) = non_empty(&self.size_at_birth) {
            child.size_at_birth = size.to_string();
        }
        if let Some(url) = &self.picture_url {
            child.picture_url = Some(url.trim().to_string()).filter(|u| !u.is_empty());
        }
        Ok(())
    }
}

fn parse_record_id(raw: &str, kind: EventKind) -> Result<RecordId, ApiError> {
    raw.parse().map_err(|_| ApiError::RecordNotFound(kind))
}

fn parse_change_kind(raw: &str) -> Result<ChangeKind, ApiError> {
    raw.parse().map_err(ApiError::BadRequest)
}

fn parse_location(raw: &str) -> Result<SleepLocation, ApiError> {
    raw.parse().map_err(ApiError::BadRequest)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn fallback() -> ApiError {
    ApiError::RouteNotFound
}

// Averages

pub async fn feed_average(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path(child_id): Path<String>,
) -> Result<Json<FeedAverages>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    let averages = analyzers::feed_averages(state.store.as_ref(), child.id).await?;
    Ok(Json(averages))
}

pub async fn change_average(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path(child_id): Path<String>,
) -> Result<Json<ChangeAverages>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    let averages = analyzers::change_averages(state.store.as_ref(), child.id).await?;
    Ok(Json(averages))
}

pub async fn sleep_average(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path(child_id): Path<String>,
) -> Result<Json<SleepAverages>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    let averages = analyzers::sleep_averages(state.store.as_ref(), child.id).await?;
    Ok(Json(averages))
}

// Listings

pub async fn list_feeds(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path(child_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    let listing = state.store.feeds_page(child.id, query.page()).await?;
    Ok(Json(json!({ "noOfItems": listing.total, "feeds": listing.items })))
}

pub async fn list_changes(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path(child_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    let listing = state.store.changes_page(child.id, query.page()).await?;
    Ok(Json(json!({ "noOfItems": listing.total, "changes": listing.items })))
}

pub async fn list_sleeps(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path(child_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    let listing = state.store.sleeps_page(child.id, query.page()).await?;
    Ok(Json(json!({ "noOfItems": listing.total, "sleeps": listing.items })))
}

// Feeds

pub async fn create_feed(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path(child_id): Path<String>,
    Json(input): Json<FeedInput>,
) -> Result<Json<FeedRecord>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    let Some(date_and_time) = input.date_and_time else {
        return Err(ApiError::BadRequest(
            "date and kind fields must be provided".into(),
        ));
    };
    let kind = input.feed_kind(None)?;

    let feed = FeedRecord::new(date_and_time, kind, input.throw_up);
    state.store.put_feed(child.id, feed.clone()).await?;
    info!(child_id = %child.id, feed_id = %feed.id, "Feed logged");
    Ok(Json(feed))
}

pub async fn get_feed(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path((child_id, feed_id)): Path<(String, String)>,
) -> Result<Json<FeedRecord>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    let feed_id = parse_record_id(&feed_id, EventKind::Feed)?;
    let feed = state
        .store
        .feed(child.id, feed_id)
        .await?
        .ok_or(ApiError::RecordNotFound(EventKind::Feed))?;
    Ok(Json(feed))
}

pub async fn patch_feed(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path((child_id, feed_id)): Path<(String, String)>,
    Json(input): Json<FeedInput>,
) -> Result<Json<FeedRecord>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    let feed_id = parse_record_id(&feed_id, EventKind::Feed)?;
    let mut feed = state
        .store
        .feed(child.id, feed_id)
        .await?
        .ok_or(ApiError::RecordNotFound(EventKind::Feed))?;

    feed.kind = input.feed_kind(Some(&feed.kind))?;
    if let Some(date_and_time) = input.date_and_time {
        feed.date_and_time = date_and_time;
    }
    if input.throw_up.is_some() {
        feed.throw_up = input.throw_up;
    }

    state.store.put_feed(child.id, feed.clone()).await?;
    Ok(Json(feed))
}

pub async fn delete_feed(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path((child_id, feed_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    delete_event(&state, parent, &child_id, &feed_id, EventKind::Feed).await
}

// Changes

pub async fn create_change(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path(child_id): Path<String>,
    Json(input): Json<ChangeInput>,
) -> Result<Json<ChangeRecord>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    let (Some(date_and_time), Some(kind), Some(consistency)) = (
        input.date_and_time,
        non_empty(&input.kind),
        non_empty(&input.consistency),
    ) else {
        return Err(ApiError::BadRequest("All fields must be provided".into()));
    };
    let kind = parse_change_kind(kind)?;

    let change = ChangeRecord::new(date_and_time, kind, consistency.to_string());
    state.store.put_change(child.id, change.clone()).await?;
    info!(child_id = %child.id, change_id = %change.id, "Change logged");
    Ok(Json(change))
}

pub async fn get_change(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path((child_id, change_id)): Path<(String, String)>,
) -> Result<Json<ChangeRecord>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    let change_id = parse_record_id(&change_id, EventKind::Change)?;
    let change = state
        .store
        .change(child.id, change_id)
        .await?
        .ok_or(ApiError::RecordNotFound(EventKind::Change))?;
    Ok(Json(change))
}

pub async fn patch_change(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path((child_id, change_id)): Path<(String, String)>,
    Json(input): Json<ChangeInput>,
) -> Result<Json<ChangeRecord>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    let change_id = parse_record_id(&change_id, EventKind::Change)?;
    let mut change = state
        .store
        .change(child.id, change_id)
        .await?
        .ok_or(ApiError::RecordNotFound(EventKind::Change))?;

    if let Some(date_and_time) = input.date_and_time {
        change.date_and_time = date_and_time;
    }
    if let Some(kind) = non_empty(&input.kind) {
        change.kind = parse_change_kind(kind)?;
    }
    if let Some(consistency) = non_empty(&input.consistency) {
        change.consistency = consistency.to_string();
    }

    state.store.put_change(child.id, change.clone()).await?;
    Ok(Json(change))
}

pub async fn delete_change(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path((child_id, change_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    delete_event(&state, parent, &child_id, &change_id, EventKind::Change).await
}

// Sleeps

pub async fn create_sleep(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path(child_id): Path<String>,
    Json(input): Json<SleepInput>,
) -> Result<Json<SleepRecord>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    let (Some(start_time), Some(end_time), Some(location)) =
        (input.start_time, input.end_time, non_empty(&input.location))
    else {
        return Err(ApiError::BadRequest("All fields must be provided".into()));
    };
    let location = parse_location(location)?;

    let sleep = SleepRecord::new(start_time, end_time, location);
    state.store.put_sleep(child.id, sleep.clone()).await?;
    info!(
        child_id = %child.id,
        sleep_id = %sleep.id,
        duration = sleep.duration(),
        "Sleep logged"
    );
    Ok(Json(sleep))
}

pub async fn get_sleep(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path((child_id, sleep_id)): Path<(String, String)>,
) -> Result<Json<SleepRecord>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    let sleep_id = parse_record_id(&sleep_id, EventKind::Sleep)?;
    let sleep = state
        .store
        .sleep(child.id, sleep_id)
        .await?
        .ok_or(ApiError::RecordNotFound(EventKind::Sleep))?;
    Ok(Json(sleep))
}

pub async fn patch_sleep(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path((child_id, sleep_id)): Path<(String, String)>,
    Json(input): Json<SleepInput>,
) -> Result<Json<SleepRecord>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    let sleep_id = parse_record_id(&sleep_id, EventKind::Sleep)?;
    let mut sleep = state
        .store
        .sleep(child.id, sleep_id)
        .await?
        .ok_or(ApiError::RecordNotFound(EventKind::Sleep))?;

    sleep.set_times(input.start_time, input.end_time);
    if let Some(location) = non_empty(&input.location) {
        sleep.location = parse_location(location)?;
    }

    state.store.put_sleep(child.id, sleep.clone()).await?;
    Ok(Json(sleep))
}

pub async fn delete_sleep(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path((child_id, sleep_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    delete_event(&state, parent, &child_id, &sleep_id, EventKind::Sleep).await
}

async fn delete_event(
    state: &AppState,
    parent: LoggedParent,
    child_id: &str,
    record_id: &str,
    kind: EventKind,
) -> Result<Json<Value>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, child_id).await?;
    let record_id = parse_record_id(record_id, kind)?;
    if !state.store.delete(child.id, kind, record_id).await? {
        return Err(ApiError::RecordNotFound(kind));
    }
    info!(child_id = %child.id, %record_id, %kind, "Record removed");
    Ok(Json(json!({ "message": format!("{kind} removed successfully") })))
}

// Children

pub async fn create_child(
    State(state): State<AppState>,
    parent: LoggedParent,
    Json(input): Json<ChildInput>,
) -> Result<(StatusCode, Json<Child>), ApiError> {
    if input.required().iter().any(|field| non_empty(field).is_none()) {
        return Err(ApiError::BadRequest("All fields must be provided".into()));
    }

    let mut child = Child::new("", None);
    input.apply(&mut child)?;
    let child = state.store.insert_child(parent.0, child).await?;
    info!(parent_id = %parent.0, child_id = %child.id, "Child created");
    Ok((StatusCode::CREATED, Json(child)))
}

pub async fn list_children(
    State(state): State<AppState>,
    parent: LoggedParent,
) -> Result<Json<Vec<Child>>, ApiError> {
    Ok(Json(state.store.children_of(parent.0).await?))
}

pub async fn get_child(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path(child_id): Path<String>,
) -> Result<Json<Child>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    Ok(Json(child))
}

pub async fn patch_child(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path(child_id): Path<String>,
    Json(input): Json<ChildInput>,
) -> Result<Json<Child>, ApiError> {
    let mut child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    if input.has_empty_field() {
        return Err(ApiError::BadRequest("All fields must be provided".into()));
    }

    input.apply(&mut child)?;
    Ok(Json(state.store.update_child(child).await?))
}

pub async fn delete_child(
    State(state): State<AppState>,
    parent: LoggedParent,
    Path(child_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let child = authorize_child(state.store.as_ref(), parent, &child_id).await?;
    if !state.store.remove_child(parent.0, child.id).await? {
        return Err(ApiError::ChildNotFound);
    }
    info!(parent_id = %parent.0, child_id = %child.id, "Child removed");
    Ok(Json(json!({ "message": "Child removed successfully" })))
}

// Parent

pub async fn get_parent(
    State(state): State<AppState>,
    parent: LoggedParent,
) -> Result<Json<Parent>, ApiError> {
    state
        .store
        .parent(parent.0)
        .await?
        .map(Json)
        .ok_or(ApiError::Unauthorized)
}
