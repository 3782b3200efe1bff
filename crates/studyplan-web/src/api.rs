//! REST API route handlers.
//!
//! Bodies are read as raw bytes and parsed here, so a missing or wrong
//! `Content-Type` does not change the outcome. Passwords never appear in a
//! response: handlers only serialize [`PublicStudent`](studyplan_store::PublicStudent).

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use studyplan_store::NewStudent;
use studyplan_store::model::{now_millis, timestamp};

use crate::error::ApiError;
use crate::state::AppState;

/// Shortest accepted password, in UTF-16 code units.
pub const MIN_PASSWORD_LEN: usize = 6;

type ApiResult = Result<(StatusCode, Json<Value>), ApiError>;

/// Parse a JSON request body.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "rejecting request body");
        ApiError::BadRequest("Invalid JSON in request body".into())
    })
}

/// Treat empty strings like absent fields.
fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// POST /register
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

/// Create a student account.
pub async fn register(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    const FAILURE: &str = "Internal server error during registration";

    let req: RegisterRequest = parse_body(&body)?;
    let (Some(username), Some(password)) = (non_empty(req.username), non_empty(req.password))
    else {
        return Err(ApiError::BadRequest(
            "Username and password are required".into(),
        ));
    };

    // Browser clients measure length in UTF-16 code units; match them.
    if password.encode_utf16().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }

    let student = state
        .students
        .create_student(NewStudent {
            username,
            password,
            email: req.email,
            full_name: req.full_name,
        })
        .await
        .map_err(|e| ApiError::from_store(e, FAILURE))?;

    tracing::info!(student_id = %student.id, username = %student.username, "student registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Registration successful",
            "student": student.to_public(),
        })),
    ))
}

// ---------------------------------------------------------------------------
// POST /login
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Verify credentials and return the student with their saved data.
///
/// Unknown usernames and wrong passwords produce the same 401 body.
pub async fn login(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    const FAILURE: &str = "Internal server error during login";

    let req: LoginRequest = parse_body(&body)?;
    let (Some(username), Some(password)) = (non_empty(req.username), non_empty(req.password))
    else {
        return Err(ApiError::BadRequest(
            "Username and password are required".into(),
        ));
    };

    let Some(student) = state
        .students
        .authenticate(&username, &password)
        .await
        .map_err(|e| ApiError::from_store(e, FAILURE))?
    else {
        tracing::warn!(username = %username, "login rejected");
        return Err(ApiError::Unauthorized(
            "Invalid username or password".into(),
        ));
    };

    let data = state
        .progress
        .get_student_data(&student.id)
        .await
        .map_err(|e| ApiError::from_store(e, FAILURE))?;

    tracing::info!(student_id = %student.id, "student logged in");

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Login successful",
            "student": student.to_public(),
            "progress": data.progress,
            "studyPlan": data.study_plan,
            "lastUpdated": data.last_updated.as_ref().map(timestamp::format),
        })),
    ))
}

// ---------------------------------------------------------------------------
// POST /save-data
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDataRequest {
    pub student_id: Option<String>,
    pub progress: Option<Map<String, Value>>,
    pub study_plan: Option<Vec<Value>>,
}

/// Replace a student's progress and study plan.
pub async fn save_data(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    const FAILURE: &str = "Internal server error while saving data";

    let req: SaveDataRequest = parse_body(&body)?;
    let Some(student_id) = non_empty(req.student_id) else {
        return Err(ApiError::BadRequest("Student ID is required".into()));
    };

    state
        .students
        .require_student(&student_id)
        .await
        .map_err(|e| ApiError::from_store(e, FAILURE))?;

    let saved = state
        .progress
        .save_student_data(&student_id, req.progress, req.study_plan)
        .await
        .map_err(|e| ApiError::from_store(e, FAILURE))?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Data saved successfully",
            "lastUpdated": saved.last_updated.as_ref().map(timestamp::format),
        })),
    ))
}

// ---------------------------------------------------------------------------
// GET /status
// ---------------------------------------------------------------------------

/// Liveness plus store statistics.
pub async fn status(State(state): State<Arc<AppState>>) -> ApiResult {
    let stats = state
        .progress
        .stats()
        .await
        .map_err(|e| ApiError::from_store(e, "Error getting system status"))?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "LDC Study Planner Backend is running",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": timestamp::format(&now_millis()),
            "stats": stats,
        })),
    ))
}

// ---------------------------------------------------------------------------
// OPTIONS / unsupported methods
// ---------------------------------------------------------------------------

/// Plain `OPTIONS` requests. Preflights are answered by the CORS layer.
pub async fn options() -> StatusCode {
    StatusCode::OK
}

/// Fallback for POST-only routes.
pub async fn post_only() -> ApiError {
    ApiError::MethodNotAllowed("Method not allowed. Only POST requests are accepted.".into())
}

/// Fallback for GET-only routes.
pub async fn get_only() -> ApiError {
    ApiError::MethodNotAllowed("Method not allowed. Only GET requests are accepted.".into())
}

/// Fallback for unknown paths.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".into())
}
