//! HTTP API for mesa-cloud
//!
//! Route groups live under `/api/v1` and, unversioned, under `/api`. Each
//! group carries its own sanitization variant and the general rate limit;
//! sensitive routes add a class-specific limit on top.

pub mod auth;
pub mod health;
pub mod locations;
pub mod menu;
pub mod orders;
pub mod restaurants;
pub mod test_routes;
pub mod users;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue, Method, Uri};
use axum::routing::get;
use axum::{Json, Router, middleware};
use serde::de::DeserializeOwned;
use shared::error::AppError;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::middleware::rate_limit::general_rate_limit;
use crate::middleware::{api_version, redact_error_detail, request_logging};
use crate::state::AppState;

pub type ApiResult<T> = Result<Json<T>, AppError>;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// JSON body extractor whose rejection uses the `AppError` body shape
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    tracing::debug!(error = %rejection.body_text(), "Rejected JSON body");
    AppError::invalid_request(rejection.body_text())
}

/// Query string extractor with the same rejection shape as [`AppJson`]
pub struct AppQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(query_rejection(rejection)),
        }
    }
}

fn query_rejection(rejection: QueryRejection) -> AppError {
    tracing::debug!(error = %rejection.body_text(), "Rejected query string");
    AppError::invalid_request(rejection.body_text())
}

/// Every `/api` route group, unprefixed
fn api_routes(state: &AppState) -> Router<AppState> {
    let groups = Router::new()
        .merge(auth::router(state))
        .merge(restaurants::router(state))
        .merge(locations::router(state))
        .merge(menu::router(state))
        .merge(orders::router(state))
        .merge(users::router(state));

    let groups = if state.config.environment.is_production() {
        groups
    } else {
        groups.merge(test_routes::router(state))
    };

    groups.layer(middleware::from_fn_with_state(
        state.clone(),
        general_rate_limit,
    ))
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static(crate::middleware::version::VERSION_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

async fn not_found(uri: Uri) -> AppError {
    AppError::not_found(format!("Route {}", uri.path()))
}

/// Build the application with every middleware layer and the state applied
pub fn create_router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let api = api_routes(&state);

    Router::new()
        .nest("/api/v1", api.clone())
        .nest("/api", api)
        .route("/health", get(health::health_check))
        .route("/favicon.ico", get(health::favicon))
        .fallback(not_found)
        // ========== Application Middleware ==========
        // Error detail - strips internal debug text outside development
        .layer(middleware::from_fn_with_state(
            state.clone(),
            redact_error_detail,
        ))
        // Versioning - resolves and stamps the API version
        .layer(middleware::from_fn(api_version))
        // Request logging - one event per request
        .layer(middleware::from_fn(request_logging))
        // ========== Tower HTTP Middleware ==========
        // Trace - per-request span
        .layer(TraceLayer::new_for_http())
        // Propagate request ID to response
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        // Request ID - UUID v4 per request
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        // CORS - outermost so preflights never reach the API
        .layer(cors_layer(&state.config))
        .with_state(state)
}
