//! Diagnostic routes, mounted outside production only
//!
//! POST /test/xss    : echoes the (already sanitized) body
//! GET  /test/version: the resolved API version
//! GET  /test/error  : forces an internal error

use axum::extract::Extension;
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use serde_json::{Value, json};
use shared::error::AppError;

use super::AppJson;
use crate::error::internal_error;
use crate::middleware::{ApiVersion, sanitize_input};
use crate::state::AppState;

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/test/xss", post(echo))
        .route("/test/version", get(version))
        .route("/test/error", get(fail))
        .layer(middleware::from_fn(sanitize_input))
}

async fn echo(AppJson(body): AppJson<Value>) -> Json<Value> {
    Json(json!({ "receivedData": body }))
}

async fn version(Extension(version): Extension<ApiVersion>) -> Json<Value> {
    Json(json!({ "version": version.as_str() }))
}

async fn fail() -> Result<Json<Value>, AppError> {
    let cause = std::io::Error::other("Intentional failure from /test/error");
    tracing::error!(error = %cause, "Test error route hit");
    Err(internal_error(&cause))
}
