//! API versioning
//!
//! Resolves the requested version (path, `Accept`, `X-API-Version`, query,
//! then the default), rejects unsupported ones and stamps responses with the
//! resolved version.

use std::sync::LazyLock;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::SecondsFormat;
use regex::Regex;
use serde_json::Value;
use shared::error::AppError;

pub const SUPPORTED_VERSIONS: &[&str] = &["1"];
pub const DEFAULT_VERSION: &str = "1";
pub const VERSION_HEADER: &str = "x-api-version";

static PATH_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/api/v(\d+)(?:/|$)").expect("valid path regex"));
static ACCEPT_VENDOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)application/vnd\.mesa\.v([0-9a-z.]+)\+json").expect("valid accept regex")
});
static ACCEPT_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)version\s*=\s*([0-9a-z.]+)").expect("valid param regex"));

/// Version resolved for the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiVersion(pub String);

impl ApiVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn from_path(uri: &Uri) -> Option<String> {
    PATH_VERSION
        .captures(uri.path())
        .map(|c| c[1].to_string())
}

fn from_accept(headers: &HeaderMap) -> Option<String> {
    let accept = headers.get(http::header::ACCEPT)?.to_str().ok()?;
    ACCEPT_VENDOR
        .captures(accept)
        .or_else(|| ACCEPT_PARAM.captures(accept))
        .map(|c| c[1].to_string())
}

fn from_header(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(VERSION_HEADER)?.to_str().ok()?.trim();
    let version = raw.strip_prefix(['v', 'V']).unwrap_or(raw);
    (!version.is_empty()).then(|| version.to_string())
}

fn from_query(uri: &Uri) -> Option<String> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(uri.query()?).ok()?;
    ["api_version", "version"].iter().find_map(|name| {
        pairs
            .iter()
            .find(|(k, v)| k == name && !v.is_empty())
            .map(|(_, v)| v.clone())
    })
}

/// First match wins: path, `Accept`, `X-API-Version`, query, default
pub fn extract_version(uri: &Uri, headers: &HeaderMap) -> String {
    from_path(uri)
        .or_else(|| from_accept(headers))
        .or_else(|| from_header(headers))
        .or_else(|| from_query(uri))
        .unwrap_or_else(|| DEFAULT_VERSION.to_string())
}

pub fn is_supported(version: &str) -> bool {
    SUPPORTED_VERSIONS.contains(&version)
}

fn unsupported_version(requested: &str) -> Response {
    let mut response = (
        StatusCode::BAD_REQUEST,
        axum::Json(serde_json::json!({
            "error": "Unsupported API version",
            "message": format!(
                "API version '{requested}' is not supported. Supported versions: {}",
                SUPPORTED_VERSIONS.join(", ")
            ),
            "requestedVersion": requested,
            "supportedVersions": SUPPORTED_VERSIONS,
        })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(VERSION_HEADER, HeaderValue::from_static(DEFAULT_VERSION));
    response
}

pub(crate) fn is_json_response(response: &Response) -> bool {
    response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// Add `_version` / `_timestamp` to a JSON object body
async fn stamp_body(response: Response, version: &str) -> Result<Response, AppError> {
    let (mut parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| AppError::internal(format!("Failed to read response body: {e}")))?;

    let Ok(Value::Object(mut map)) = serde_json::from_slice::<Value>(&bytes) else {
        return Ok(Response::from_parts(parts, Body::from(bytes)));
    };
    map.insert("_version".into(), Value::String(version.to_string()));
    map.insert(
        "_timestamp".into(),
        Value::String(chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );

    let encoded = serde_json::to_vec(&Value::Object(map))
        .map_err(|e| AppError::internal(format!("Failed to encode response body: {e}")))?;
    parts.headers.remove(http::header::CONTENT_LENGTH);
    Ok(Response::from_parts(parts, Body::from(encoded)))
}

/// Versioning middleware (global)
pub async fn api_version(mut req: Request, next: Next) -> Result<Response, AppError> {
    let version = extract_version(req.uri(), req.headers());
    if !is_supported(&version) {
        tracing::debug!(
            requested = %version,
            path = %req.uri().path(),
            "Unsupported API version"
        );
        return Ok(unsupported_version(&version));
    }

    req.extensions_mut().insert(ApiVersion(version.clone()));
    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&version) {
        response.headers_mut().insert(VERSION_HEADER, value);
    }

    if is_json_response(&response) {
        response = stamp_body(response, &version).await?;
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_path_wins() {
        let h = headers(&[("x-api-version", "2")]);
        assert_eq!(extract_version(&uri("/api/v1/menu/items"), &h), "1");
        assert_eq!(extract_version(&uri("/api/v3"), &HeaderMap::new()), "3");
    }

    #[test]
    fn test_accept_header() {
        let h = headers(&[("accept", "application/vnd.mesa.v2+json")]);
        assert_eq!(extract_version(&uri("/api/menu/items"), &h), "2");

        let h = headers(&[("accept", "application/json; version=4")]);
        assert_eq!(extract_version(&uri("/api/menu/items"), &h), "4");

        let h = headers(&[("accept", "application/json")]);
        assert_eq!(extract_version(&uri("/api/menu/items"), &h), "1");
    }

    #[test]
    fn test_custom_header_strips_prefix() {
        let h = headers(&[("x-api-version", "v1")]);
        assert_eq!(extract_version(&uri("/api/auth/me"), &h), "1");
        let h = headers(&[("x-api-version", "5")]);
        assert_eq!(extract_version(&uri("/api/auth/me"), &h), "5");
    }

    #[test]
    fn test_query_and_default() {
        let empty = HeaderMap::new();
        assert_eq!(extract_version(&uri("/api/auth/me?api_version=7"), &empty), "7");
        assert_eq!(extract_version(&uri("/api/auth/me?version=8"), &empty), "8");
        assert_eq!(extract_version(&uri("/api/auth/me?lang=en"), &empty), "1");
        assert_eq!(extract_version(&uri("/health"), &empty), "1");
    }

    #[test]
    fn test_support() {
        assert!(is_supported("1"));
        assert!(!is_supported("2"));
        assert!(!is_supported("one"));
    }

    #[tokio::test]
    async fn test_unsupported_body() {
        for requested in ["2", "0", "beta"] {
            let response = unsupported_version(requested);
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(response.headers()[VERSION_HEADER], "1");
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["error"], "Unsupported API version");
            assert_eq!(body["requestedVersion"], requested);
            assert_eq!(body["supportedVersions"], serde_json::json!(["1"]));
        }
    }

    #[tokio::test]
    async fn test_stamp_objects_only() {
        let response = axum::Json(serde_json::json!({ "ok": true })).into_response();
        let stamped = stamp_body(response, "1").await.unwrap();
        let bytes = axum::body::to_bytes(stamped.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(body["_version"], "1");
        assert!(
            chrono::DateTime::parse_from_rfc3339(body["_timestamp"].as_str().unwrap()).is_ok()
        );

        let response = axum::Json(serde_json::json!([1, 2])).into_response();
        let stamped = stamp_body(response, "1").await.unwrap();
        let bytes = axum::body::to_bytes(stamped.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"[1,2]");
    }
}
