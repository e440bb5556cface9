//! Requesting-parent identity.
//!
//! Authentication happens upstream; by the time a request reaches this
//! service the caller's parent id travels in the `X-Parent-Id` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::records::{Child, ParentId};
use crate::store::EventStore;

pub const PARENT_HEADER: &str = "x-parent-id";

/// Extracts the requesting parent's id. Missing or malformed headers are
/// rejected with 401.
#[derive(Debug, Clone, Copy)]
pub struct LoggedParent(pub ParentId);

impl<S: Send + Sync> FromRequestParts<S> for LoggedParent {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(PARENT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .map(LoggedParent)
            .ok_or(ApiError::Unauthorized)
    }
}

/// Checks that `parent` is linked to the child named in the path and loads
/// the child. Unlinked (or unparsable) ids are 401; a linked id whose child
/// is gone is 404.
pub async fn authorize_child(
    store: &dyn EventStore,
    parent: LoggedParent,
    raw_child_id: &str,
) -> Result<Child, ApiError> {
    let child_id = raw_child_id.parse().map_err(|_| ApiError::Unauthorized)?;
    if !store.is_linked(parent.0, child_id).await? {
        return Err(ApiError::Unauthorized);
    }
    store.child(child_id).await?.ok_or(ApiError::ChildNotFound)
}
