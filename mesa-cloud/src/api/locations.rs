//! Location management for the caller's restaurant
//!
//! Restaurant administrators manage every location. Location administrators
//! may edit details and hours of the locations they administer.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router, middleware};
use shared::error::{AppError, ErrorCode};
use shared::models::{HoursUpdate, Location, LocationInput, LocationUpdate};

use super::{ApiResult, AppJson};
use crate::auth::roles::{Grantor, LEVEL_LOCATION_ADMIN, LEVEL_RESTAURANT_ADMIN, LEVEL_STAFF};
use crate::auth::{CurrentUser, require_auth};
use crate::db::{locations, roles};
use crate::middleware::sanitize_location_input;
use crate::security_log;
use crate::state::AppState;
use crate::util::now_millis;
use crate::validation::{validate_features, validate_operating_hours, validate_payload};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/locations", get(list).post(create))
        .route(
            "/locations/{id}",
            get(get_location).put(update).delete(deactivate),
        )
        .route("/locations/{id}/hours", put(update_hours))
        .route("/locations/{id}/primary", put(set_primary))
        .layer(middleware::from_fn(sanitize_location_input))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

/// Restaurant administrators pass; location administrators pass only for
/// locations they hold the role on
async fn require_location_admin(
    state: &AppState,
    user: &CurrentUser,
    location_id: i64,
) -> Result<(), AppError> {
    if user.highest_level() >= LEVEL_RESTAURANT_ADMIN {
        return Ok(());
    }
    user.require_level(LEVEL_LOCATION_ADMIN)?;

    let grants = roles::grants_of(&state.pool, user.id).await?;
    let grantor = Grantor::from_grants(user.id, &grants);
    if grantor.administered_locations.contains(&location_id) {
        return Ok(());
    }
    security_log!(
        WARN,
        "location_scope_denied",
        user_id = user.id,
        location_id = location_id
    );
    Err(AppError::new(ErrorCode::LocationScopeDenied).with_detail("location_id", location_id))
}

/// GET /locations
pub async fn list(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Vec<Location>> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_STAFF)?;
    Ok(Json(locations::list(&state.pool, restaurant_id).await?))
}

/// GET /locations/{id}
pub async fn get_location(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Location> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_STAFF)?;
    let location = locations::find(&state.pool, restaurant_id, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::LocationNotFound))?;
    Ok(Json(location))
}

/// POST /locations
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(mut input): AppJson<LocationInput>,
) -> Result<(StatusCode, Json<Location>), AppError> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_RESTAURANT_ADMIN)?;
    validate_payload(&input)?;
    input.operating_hours = validate_operating_hours(&input.operating_hours)?;
    input.selected_features = validate_features(&input.selected_features)?;

    let location = locations::create(&state.pool, restaurant_id, &input, now_millis()).await?;
    tracing::info!(
        restaurant_id,
        location_id = location.id,
        is_primary = location.is_primary,
        "Location created"
    );
    Ok((StatusCode::CREATED, Json(location)))
}

/// PUT /locations/{id}
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    AppJson(data): AppJson<LocationUpdate>,
) -> ApiResult<Location> {
    let restaurant_id = user.require_restaurant()?;
    require_location_admin(&state, &user, id).await?;
    if data.is_active.is_some() {
        // Activation state belongs to the restaurant level
        user.require_level(LEVEL_RESTAURANT_ADMIN)?;
    }
    validate_payload(&data)?;
    let features = data
        .selected_features
        .as_deref()
        .map(validate_features)
        .transpose()?;

    let location = locations::update(
        &state.pool,
        restaurant_id,
        id,
        &data,
        features.as_deref(),
        now_millis(),
    )
    .await?;
    tracing::info!(restaurant_id, location_id = id, "Location updated");
    Ok(Json(location))
}

/// PUT /locations/{id}/hours
pub async fn update_hours(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    AppJson(req): AppJson<HoursUpdate>,
) -> ApiResult<Location> {
    let restaurant_id = user.require_restaurant()?;
    require_location_admin(&state, &user, id).await?;
    let hours = validate_operating_hours(&req.operating_hours)?;

    let location =
        locations::update_hours(&state.pool, restaurant_id, id, &hours, now_millis()).await?;
    tracing::info!(restaurant_id, location_id = id, "Operating hours updated");
    Ok(Json(location))
}

/// PUT /locations/{id}/primary
pub async fn set_primary(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Location> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_RESTAURANT_ADMIN)?;

    let location = locations::set_primary(&state.pool, restaurant_id, id, now_millis()).await?;
    tracing::info!(restaurant_id, location_id = id, "Primary location changed");
    Ok(Json(location))
}

/// DELETE /locations/{id}: soft-disable
pub async fn deactivate(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Location> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_RESTAURANT_ADMIN)?;

    let location = locations::deactivate(&state.pool, restaurant_id, id, now_millis()).await?;
    tracing::info!(restaurant_id, location_id = id, "Location deactivated");
    Ok(Json(location))
}
