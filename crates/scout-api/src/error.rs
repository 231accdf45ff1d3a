//! Mapping of Scout errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use scout_core::{Dependency, Error};

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Failing collaborator, for 503 responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency: Option<Dependency>,
}

/// Errors returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The request body could not be decoded.
    BadRequest(String),
    /// An admin endpoint was called without credentials.
    Unauthorized,
    /// An admin endpoint was called with the wrong credentials, or admin
    /// access is disabled.
    Forbidden,
    /// A core error.
    Core(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Core(err)
    }
}

impl ApiError {
    /// Status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Core(err) if err.is_caller_error() => StatusCode::BAD_REQUEST,
            Self::Core(Error::DependencyUnavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let (error, dependency) = match self {
            Self::BadRequest(msg) => (msg.clone(), None),
            Self::Unauthorized => ("missing X-API-Key header".to_string(), None),
            Self::Forbidden => ("invalid admin credentials".to_string(), None),
            Self::Core(err) => (err.to_string(), err.failed_dependency()),
        };
        ErrorBody { error, dependency }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = ?self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = ?self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}
