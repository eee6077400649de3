//! Unified service-layer error type for mesa-cloud
//!
//! `ServiceError` bridges the gap between DB-layer errors (`sqlx::Error`, `BoxError`)
//! and the API-layer error (`AppError`). It enables `?` propagation without manual
//! `.map_err(|e| { tracing::error!(...); AppError::new(...) })` boilerplate.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// PostgreSQL `unique_violation`
const PG_UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL `foreign_key_violation`
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// Service-layer error.
///
/// - `Db`: Database/infrastructure errors (auto-logged, mapped to InternalError)
/// - `App`: Business-rule errors (transparent pass-through to client)
#[derive(Debug)]
pub enum ServiceError {
    /// Database or infrastructure error (sqlx, serde, hashing, etc.)
    Db(BoxError),
    /// Business-rule error (already an AppError with the correct ErrorCode)
    App(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            let code = db_err.code();
            if matches!(
                code.as_deref(),
                Some(PG_UNIQUE_VIOLATION) | Some(PG_FOREIGN_KEY_VIOLATION)
            ) {
                tracing::warn!(
                    code = code.as_deref().unwrap_or_default(),
                    constraint = db_err.constraint().unwrap_or_default(),
                    "Constraint violation"
                );
                return ServiceError::App(AppError::constraint_violation());
            }
        }
        ServiceError::Db(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                internal_error(&*db_err)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// 500 for an unexpected failure.
///
/// `details.debug` is removed outside development by
/// [`redact_error_detail`](crate::middleware::redact_error_detail).
pub fn internal_error(err: &(dyn std::error::Error + 'static)) -> AppError {
    AppError::new(ErrorCode::InternalError).with_detail("debug", err.to_string())
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;
