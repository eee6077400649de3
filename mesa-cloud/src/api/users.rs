//! Staff user management within the caller's restaurant
//!
//! Managers (location administrator and up) may only act on users they
//! strictly outrank, and only grant roles below their own level.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router, middleware};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Role, RolesUpdate, User, UserCreate, UserStatusUpdate, UserUpdate, UserWithRoles,
};

use super::{ApiResult, AppJson};
use crate::auth::roles::{Grantor, LEVEL_LOCATION_ADMIN, check_assignments};
use crate::auth::{CurrentUser, require_auth};
use crate::db::users::{self, NewUser};
use crate::db::{locations, roles};
use crate::middleware::rate_limit::user_management_rate_limit;
use crate::middleware::sanitize_input;
use crate::security_log;
use crate::state::AppState;
use crate::util::{hash_password, now_millis};
use crate::validation::{normalize_email, validate_payload};

pub fn router(state: &AppState) -> Router<AppState> {
    let limit = middleware::from_fn_with_state(state.clone(), user_management_rate_limit);
    Router::new()
        .route("/users", get(list).post(create).layer(limit.clone()))
        .route("/users/assignable-roles", get(assignable_roles))
        .route("/users/{id}", get(get_user).put(update).layer(limit.clone()))
        .route("/users/{id}/roles", put(update_roles).layer(limit.clone()))
        .route("/users/{id}/status", put(update_status).layer(limit))
        .layer(middleware::from_fn(sanitize_input))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

/// The caller's restaurant and authority as stored (not as claimed by the token)
async fn manager(state: &AppState, user: &CurrentUser) -> Result<(i64, Grantor), AppError> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_LOCATION_ADMIN)?;
    let grants = roles::grants_of(&state.pool, user.id).await?;
    Ok((restaurant_id, Grantor::from_grants(user.id, &grants)))
}

/// Load a user of the restaurant that the grantor outranks and whose
/// grants all fall on locations the grantor administers (when location-scoped)
async fn managed_target(
    state: &AppState,
    grantor: &Grantor,
    restaurant_id: i64,
    id: i64,
) -> Result<UserWithRoles, AppError> {
    let user = users::find_in_restaurant(&state.pool, restaurant_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    let target = users::with_roles(&state.pool, user).await?;

    let target_level = target.roles.iter().map(|r| r.role_level).max().unwrap_or(0);
    if !grantor.outranks(target_level) {
        security_log!(
            WARN,
            "user_management_denied",
            grantor_id = grantor.user_id,
            target_id = id,
            target_level = target_level
        );
        return Err(AppError::permission_denied(
            "You cannot manage a user at or above your own level",
        ));
    }
    if !grantor.covers(&target.roles) {
        security_log!(
            WARN,
            "user_management_denied",
            grantor_id = grantor.user_id,
            target_id = id,
            reason = "location_scope"
        );
        return Err(AppError::new(ErrorCode::LocationScopeDenied));
    }
    Ok(target)
}

/// GET /users
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Vec<UserWithRoles>> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_LOCATION_ADMIN)?;
    Ok(Json(
        users::list_for_restaurant(&state.pool, restaurant_id).await?,
    ))
}

/// GET /users/assignable-roles
pub async fn assignable_roles(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Vec<Role>> {
    let (_, grantor) = manager(&state, &user).await?;
    let roles = roles::assignable(&state.pool, grantor.level, grantor.is_superadmin).await?;
    Ok(Json(roles))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<UserWithRoles> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_LOCATION_ADMIN)?;
    let found = users::find_in_restaurant(&state.pool, restaurant_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(Json(users::with_roles(&state.pool, found).await?))
}

/// POST /users
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(req): AppJson<UserCreate>,
) -> Result<(StatusCode, Json<UserWithRoles>), AppError> {
    let (restaurant_id, grantor) = manager(&state, &user).await?;
    validate_payload(&req)?;
    let email = normalize_email(&req.email);

    let restaurant_locations = locations::ids_for_restaurant(&state.pool, restaurant_id).await?;
    let grants = check_assignments(&grantor, &req.roles, &restaurant_locations)?;

    if users::email_taken(&state.pool, &email).await? {
        return Err(AppError::new(ErrorCode::EmailTaken));
    }

    let hash = hash_password(&req.password).map_err(|e| {
        tracing::error!(error = %e, "Password hashing failed");
        AppError::internal("Password hashing failed")
    })?;
    let new_user = NewUser {
        restaurant_id: Some(restaurant_id),
        email: &email,
        password_hash: &hash,
        first_name: req.first_name.trim(),
        last_name: req.last_name.trim(),
        phone: req.phone.as_deref(),
    };
    let created = users::create(&state.pool, &new_user, &grants, now_millis()).await?;

    security_log!(
        INFO,
        "user_created",
        grantor_id = user.id,
        user_id = created.id,
        restaurant_id = restaurant_id
    );
    let created = users::with_roles(&state.pool, created).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /users/{id}
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    AppJson(req): AppJson<UserUpdate>,
) -> ApiResult<User> {
    let (restaurant_id, grantor) = manager(&state, &user).await?;
    validate_payload(&req)?;
    managed_target(&state, &grantor, restaurant_id, id).await?;

    let updated = users::update_profile(&state.pool, id, &req, now_millis())
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    tracing::info!(user_id = id, by = user.id, "User profile updated");
    Ok(Json(updated))
}

/// PUT /users/{id}/roles: replaces every grant of the user
pub async fn update_roles(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    AppJson(req): AppJson<RolesUpdate>,
) -> ApiResult<UserWithRoles> {
    let (restaurant_id, grantor) = manager(&state, &user).await?;
    let target = managed_target(&state, &grantor, restaurant_id, id).await?;

    let restaurant_locations = locations::ids_for_restaurant(&state.pool, restaurant_id).await?;
    let grants = check_assignments(&grantor, &req.roles, &restaurant_locations)?;
    users::replace_roles(&state.pool, id, &grants, now_millis()).await?;

    security_log!(
        INFO,
        "user_roles_replaced",
        grantor_id = user.id,
        user_id = id,
        roles = grants.len()
    );
    Ok(Json(users::with_roles(&state.pool, target.user).await?))
}

/// PUT /users/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    AppJson(req): AppJson<UserStatusUpdate>,
) -> ApiResult<User> {
    let (restaurant_id, grantor) = manager(&state, &user).await?;
    if id == user.id {
        return Err(AppError::validation("You cannot change your own status"));
    }
    managed_target(&state, &grantor, restaurant_id, id).await?;

    let updated = users::set_status(&state.pool, id, req.status, now_millis())
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    security_log!(
        INFO,
        "user_status_changed",
        grantor_id = user.id,
        user_id = id,
        status = req.status.as_str()
    );
    Ok(Json(updated))
}
