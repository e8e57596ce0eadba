//! HTTP boundary over the journal transactor.
//!
//! Thin glue: request/response types, password extraction, and the mapping
//! from the core error taxonomy to status codes. Crypto and integrity
//! failures all collapse to a generic 500 body so the API cannot be used as
//! a password oracle.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use daybook_core::{Day, Entry, Journal, JournalTransactor, StoreError, Unsealed};

#[derive(Clone)]
pub struct AppState {
    pub transactor: Arc<JournalTransactor>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/unlock", post(unlock))
        .route("/api/entries", get(get_day).post(append_entry))
        .route("/api/entries/{id}", put(edit_entry))
        .route("/api/summary/{date}", put(set_summary))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

// ─── Request types ───

#[derive(Debug, Deserialize)]
pub struct UnlockRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct AppendEntryRequest {
    pub date: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct EditEntryRequest {
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetSummaryRequest {
    pub summary: String,
}

// ─── Error mapping ───

pub enum ApiError {
    /// Unlock called with an empty password.
    PasswordRequired,
    /// Protected route called without the X-Password header.
    AuthRequired,
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::PasswordRequired => {
                (StatusCode::BAD_REQUEST, "Password required".to_string())
            }
            ApiError::AuthRequired => (StatusCode::UNAUTHORIZED, "Password required".to_string()),
            ApiError::Store(StoreError::Validation(msg)) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Store(StoreError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg),
            ApiError::Store(err) => {
                error!("journal operation failed: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn password_from_headers(headers: &HeaderMap) -> Result<String, ApiError> {
    match headers.get("x-password").and_then(|v| v.to_str().ok()) {
        Some(password) if !password.is_empty() => Ok(password.to_string()),
        _ => Err(ApiError::AuthRequired),
    }
}

// ─── Handlers ───

async fn unlock(
    State(state): State<AppState>,
    Json(req): Json<UnlockRequest>,
) -> Result<Json<Unsealed<Journal>>, ApiError> {
    if req.password.is_empty() {
        return Err(ApiError::PasswordRequired);
    }
    Ok(Json(state.transactor.unlock(&req.password).await?))
}

async fn get_day(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DayQuery>,
) -> Result<Json<Day>, ApiError> {
    let password = password_from_headers(&headers)?;
    Ok(Json(state.transactor.day(&password, &query.date).await?))
}

async fn append_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AppendEntryRequest>,
) -> Result<(StatusCode, Json<Entry>), ApiError> {
    let password = password_from_headers(&headers)?;
    let entry = state
        .transactor
        .append_entry(&password, &req.date, &req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn edit_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<EditEntryRequest>,
) -> Result<Json<Entry>, ApiError> {
    let password = password_from_headers(&headers)?;
    let entry = state
        .transactor
        .edit_entry(&password, &id, &req.content, req.timestamp.as_deref())
        .await?;
    Ok(Json(entry))
}

async fn set_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(date): Path<String>,
    Json(req): Json<SetSummaryRequest>,
) -> Result<Json<Day>, ApiError> {
    let password = password_from_headers(&headers)?;
    let day = state
        .transactor
        .set_summary(&password, &date, &req.summary)
        .await?;
    Ok(Json(day))
}
