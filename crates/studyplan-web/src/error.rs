//! HTTP error responses.
//!
//! Every failure renders as `{"success": false, "error": "<message>"}` with
//! the matching status code. Internal errors are logged here and replaced by
//! a generic message before they reach the client.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use studyplan_store::StoreError;
use thiserror::Error;

/// Errors returned by the API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input, or a taken username.
    #[error("{0}")]
    BadRequest(String),

    /// Wrong username or password.
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    /// Anything unexpected. Only `message` is shown to the client.
    #[error("{message}")]
    Internal { message: &'static str },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a store failure, using `message` for anything that is not the
    /// client's fault.
    pub fn from_store(err: StoreError, message: &'static str) -> Self {
        match err {
            StoreError::DuplicateUsername(_) => {
                Self::BadRequest("A user with this username already exists".into())
            }
            StoreError::InvalidArgument(msg) => Self::BadRequest(msg),
            StoreError::NotFound { entity, .. } => Self::NotFound(not_found_message(entity)),
            other => {
                tracing::error!(error = %other, "{message}");
                Self::Internal { message }
            }
        }
    }
}

fn not_found_message(entity: &str) -> String {
    let mut chars = entity.chars();
    match chars.next() {
        Some(first) => format!("{}{} not found", first.to_uppercase(), chars.as_str()),
        None => "Not found".into(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

// ── tests ────────────────────────────────────────────────────────────
