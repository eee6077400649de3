//! Internal error detail
//!
//! `internal_error` attaches `details.debug` to 500s. Outside development the
//! field is stripped here before the body leaves the process.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;
use shared::error::AppError;

use super::version::is_json_response;
use crate::state::AppState;

/// Drop `details.debug` from a JSON error body; `details` goes too once empty
pub fn strip_debug(body: &mut Value) -> bool {
    let Some(details) = body.get_mut("details").and_then(Value::as_object_mut) else {
        return false;
    };
    if details.remove("debug").is_none() {
        return false;
    }
    if details.is_empty()
        && let Some(map) = body.as_object_mut()
    {
        map.remove("details");
    }
    true
}

/// Error detail middleware (global, innermost)
pub async fn redact_error_detail(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let response = next.run(req).await;
    if state.config.environment.is_development()
        || !response.status().is_server_error()
        || !is_json_response(&response)
    {
        return Ok(response);
    }

    let (mut parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| AppError::internal(format!("Failed to read response body: {e}")))?;

    let Ok(mut value) = serde_json::from_slice::<Value>(&bytes) else {
        return Ok(Response::from_parts(parts, Body::from(bytes)));
    };
    if !strip_debug(&mut value) {
        return Ok(Response::from_parts(parts, Body::from(bytes)));
    }

    let encoded = serde_json::to_vec(&value)
        .map_err(|e| AppError::internal(format!("Failed to encode response body: {e}")))?;
    parts.headers.remove(http::header::CONTENT_LENGTH);
    Ok(Response::from_parts(parts, Body::from(encoded)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_debug() {
        let mut body = json!({ "code": 9001, "message": "Internal error", "details": { "debug": "boom" } });
        assert!(strip_debug(&mut body));
        assert_eq!(body, json!({ "code": 9001, "message": "Internal error" }));

        let mut body = json!({ "code": 9001, "details": { "debug": "boom", "field": "x" } });
        assert!(strip_debug(&mut body));
        assert_eq!(body["details"], json!({ "field": "x" }));

        let mut body = json!({ "code": 9001, "message": "Internal error" });
        assert!(!strip_debug(&mut body));
    }
}
