//! Health check and tenant favicon

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};

use crate::db::restaurants;
use crate::middleware::sanitize::unescape_html;
use crate::state::AppState;
use crate::tenant::tenant_slug;

/// GET /health: liveness plus a database ping
pub async fn health_check(State(state): State<AppState>) -> Response {
    let database = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::error!(error = %e, "Health check database ping failed");
            "unavailable"
        }
    };
    let status = if database == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = Json(serde_json::json!({
        "status": if status == StatusCode::OK { "ok" } else { "degraded" },
        "service": "mesa-cloud",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment.as_str(),
        "database": database,
    }));
    (status, body).into_response()
}

/// GET /favicon.ico: the tenant's favicon (or logo) when addressed by
/// subdomain, otherwise the platform default
pub async fn favicon(State(state): State<AppState>, headers: HeaderMap) -> Redirect {
    let default = || Redirect::temporary(&state.config.default_favicon_url);

    let Some(slug) = tenant_slug(&headers, &state.config.base_domain) else {
        return default();
    };
    match restaurants::favicon_for_slug(&state.pool, &slug).await {
        Ok(Some(stored)) => match redirect_target(&stored) {
            Some(url) => Redirect::temporary(&url),
            None => {
                tracing::warn!(slug = %slug, "Stored favicon URL is not redirectable");
                default()
            }
        },
        Ok(None) => default(),
        Err(e) => {
            let err: shared::error::AppError = e.into();
            tracing::warn!(slug = %slug, error = %err, "Favicon lookup failed");
            default()
        }
    }
}

/// Stored URLs are entity-escaped; only absolute http(s) or site-rooted
/// paths are used as redirect targets
fn redirect_target(stored: &str) -> Option<String> {
    let url = unescape_html(stored.trim());
    let lower = url.to_ascii_lowercase();
    let absolute = lower.starts_with("https://") || lower.starts_with("http://");
    let rooted = url.starts_with('/') && !url.starts_with("//");
    let clean = !url.chars().any(|c| c.is_control() || c.is_whitespace());
    ((absolute || rooted) && clean).then_some(url)
}
