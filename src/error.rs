//! HTTP-facing error type.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::records::EventKind;

#[derive(Error, Debug)]
pub enum ApiError {
    /// No usable `X-Parent-Id`, or the parent is not linked to the child.
    #[error("request forbidden")]
    Unauthorized,

    #[error("child not found!")]
    ChildNotFound,

    #[error("{0} not found!")]
    RecordNotFound(EventKind),

    #[error("{0}")]
    BadRequest(String),

    #[error("This route does not exist")]
    RouteNotFound,

    /// Store or other internal failure. Details are logged, never returned.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::ChildNotFound | Self::RecordNotFound(_) | Self::RouteNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Internal(e) => {
                error!(error = %e, "Request failed");
                "Internal server error. Please try again. If error persist please contact the service provider."
                    .to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}
