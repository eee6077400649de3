//! Authentication endpoints
//!
//! POST /auth/login   : email + password → token
//! POST /auth/register: customer sign-up → token
//! GET  /auth/me      : current profile with roles
//! PUT  /auth/password: change own password
//! POST /auth/logout  : stateless acknowledgement

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router, middleware};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    AuthResponse, LoginRequest, MessageResponse, PasswordChangeRequest, RoleAssignment,
    SignupRequest, UserStatus, UserWithRoles,
};

use super::{ApiResult, AppJson};
use crate::auth::CurrentUser;
use crate::auth::roles::CUSTOMER;
use crate::db::users::{self, NewUser};
use crate::middleware::rate_limit::{auth_rate_limit, password_change_rate_limit};
use crate::middleware::sanitize_input;
use crate::security_log;
use crate::state::AppState;
use crate::util::{hash_password, now_millis, verify_password};
use crate::validation::{normalize_email, validate_payload};

pub fn router(state: &AppState) -> Router<AppState> {
    let auth_limit = middleware::from_fn_with_state(state.clone(), auth_rate_limit);
    let password_limit =
        middleware::from_fn_with_state(state.clone(), password_change_rate_limit);
    Router::new()
        .route("/auth/login", post(login).layer(auth_limit.clone()))
        .route("/auth/register", post(signup).layer(auth_limit))
        .route("/auth/me", get(me))
        .route("/auth/password", put(change_password).layer(password_limit))
        .route("/auth/logout", post(logout))
        .layer(middleware::from_fn(sanitize_input))
}

/// Sign a token for `user` carrying its role names
fn issue_token(state: &AppState, user: &UserWithRoles) -> Result<String, AppError> {
    let roles = user.roles.iter().map(|r| r.role_name.clone()).collect();
    let token = state.jwt.generate_token(
        user.user.id,
        &user.user.email,
        user.user.restaurant_id,
        roles,
    )?;
    Ok(token)
}

fn password_hash(password: &str) -> Result<String, AppError> {
    hash_password(password).map_err(|e| {
        tracing::error!(error = %e, "Password hashing failed");
        AppError::internal("Password hashing failed")
    })
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<AuthResponse> {
    validate_payload(&req)?;
    let email = normalize_email(&req.email);

    let credentials = users::find_credentials(&state.pool, &email).await?;
    let verified = credentials.filter(|c| verify_password(&req.password, &c.password_hash));
    let Some(credentials) = verified else {
        security_log!(WARN, "login_failed", email = %email);
        return Err(AppError::invalid_credentials());
    };

    if credentials.user.status != UserStatus::Active {
        security_log!(WARN, "login_disabled_account", user_id = credentials.user.id);
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    let user = users::with_roles(&state.pool, credentials.user).await?;
    let token = issue_token(&state, &user)?;
    security_log!(INFO, "login_success", user_id = user.user.id);
    Ok(Json(AuthResponse { token, user }))
}

/// POST /auth/register: customer accounts only; staff are created by admins
pub async fn signup(
    State(state): State<AppState>,
    AppJson(req): AppJson<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    validate_payload(&req)?;
    let email = normalize_email(&req.email);

    if users::email_taken(&state.pool, &email).await? {
        return Err(AppError::new(ErrorCode::EmailTaken));
    }

    let hash = password_hash(&req.password)?;
    let grant = RoleAssignment {
        role_name: CUSTOMER.to_string(),
        location_id: None,
        is_primary_role: true,
        is_primary_location: false,
    };
    let new_user = NewUser {
        restaurant_id: None,
        email: &email,
        password_hash: &hash,
        first_name: req.first_name.trim(),
        last_name: req.last_name.trim(),
        phone: req.phone.as_deref(),
    };
    let created = users::create(&state.pool, &new_user, &[grant], now_millis()).await?;

    let user = users::with_roles(&state.pool, created).await?;
    let token = issue_token(&state, &user)?;
    tracing::info!(user_id = user.user.id, "Customer signed up");
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// GET /auth/me
pub async fn me(State(state): State<AppState>, current: CurrentUser) -> ApiResult<UserWithRoles> {
    let user = users::find_by_id(&state.pool, current.id)
        .await?
        .ok_or_else(|| AppError::invalid_token("User no longer exists"))?;
    if user.status != UserStatus::Active {
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }
    Ok(Json(users::with_roles(&state.pool, user).await?))
}

/// PUT /auth/password
pub async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    AppJson(req): AppJson<PasswordChangeRequest>,
) -> ApiResult<MessageResponse> {
    validate_payload(&req)?;

    let credentials = users::find_credentials_by_id(&state.pool, current.id)
        .await?
        .ok_or_else(|| AppError::invalid_token("User no longer exists"))?;
    if !verify_password(&req.current_password, &credentials.password_hash) {
        security_log!(WARN, "password_change_failed", user_id = current.id);
        return Err(AppError::new(ErrorCode::PasswordMismatch));
    }

    let hash = password_hash(&req.new_password)?;
    users::update_password(&state.pool, current.id, &hash, now_millis()).await?;
    security_log!(INFO, "password_changed", user_id = current.id);
    Ok(Json(MessageResponse::new("Password updated")))
}

/// POST /auth/logout: tokens are stateless; the client discards its copy
pub async fn logout(current: CurrentUser) -> Json<MessageResponse> {
    tracing::debug!(user_id = current.id, "Logout");
    Json(MessageResponse::new("Logged out"))
}
