//! Authenticated user extraction
//!
//! `require_auth` validates the bearer token for a route group and stores the
//! [`CurrentUser`] in request extensions; handlers then take `CurrentUser` as
//! an extractor (which falls back to validating the header itself).

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use http::HeaderMap;
use shared::error::{AppError, ErrorCode};

use super::jwt::{Claims, JwtService};
use super::roles::{self, LEVEL_SUPERADMIN};
use crate::security_log;
use crate::state::AppState;

/// Identity carried by a validated token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub restaurant_id: Option<i64>,
    pub roles: Vec<String>,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            restaurant_id: claims.restaurant_id,
            roles: claims.roles,
        }
    }
}

impl CurrentUser {
    pub fn highest_level(&self) -> i32 {
        roles::highest_level(self.roles.iter().map(String::as_str))
    }

    pub fn is_superadmin(&self) -> bool {
        self.roles.iter().any(|r| r == roles::SUPERADMIN)
    }

    /// The caller's restaurant, or `RestaurantNotSelected`
    pub fn require_restaurant(&self) -> Result<i64, AppError> {
        self.restaurant_id
            .ok_or_else(|| AppError::new(ErrorCode::RestaurantNotSelected))
    }

    /// Require at least `level` in the role hierarchy
    pub fn require_level(&self, level: i32) -> Result<(), AppError> {
        if self.highest_level() >= level {
            return Ok(());
        }
        security_log!(
            WARN,
            "permission_denied",
            user_id = self.id,
            required_level = level,
            actual_level = self.highest_level()
        );
        Err(AppError::new(ErrorCode::RoleRequired).with_detail("required_level", level))
    }

    pub fn require_superadmin(&self) -> Result<(), AppError> {
        self.require_level(LEVEL_SUPERADMIN)
    }
}

/// Validate the `Authorization` header
fn authenticate(
    headers: &HeaderMap,
    jwt: &JwtService,
    uri: &http::Uri,
) -> Result<CurrentUser, AppError> {
    let auth_header = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
        None => {
            security_log!(WARN, "auth_missing", uri = %uri);
            return Err(AppError::not_authenticated());
        }
    };

    match jwt.validate_token(token) {
        Ok(claims) => Ok(CurrentUser::from(claims)),
        Err(e) => {
            security_log!(WARN, "auth_failed", error = %e, uri = %uri);
            Err(e.into())
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let user = authenticate(&parts.headers, &state.jwt, &parts.uri)?;
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// Authentication middleware for protected route groups
///
/// CORS preflight passes through untouched.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let user = authenticate(req.headers(), &state.jwt, req.uri())?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
