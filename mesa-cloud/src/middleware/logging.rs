//! HTTP request logging

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use super::version::VERSION_HEADER;

/// One structured event per request
pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = started.elapsed().as_millis() as u64;
    let version = response
        .headers()
        .get(VERSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    if status >= 500 {
        tracing::error!(
            target: "http_access",
            %method, %path, status, duration_ms, version,
            "request failed"
        );
    } else {
        tracing::info!(
            target: "http_access",
            %method, %path, status, duration_ms, version,
            "request"
        );
    }

    response
}
