//! Restaurant registration and tenancy endpoints
//!
//! POST /restaurants/register         : create tenant (pending) + owner account
//! GET  /restaurants/check-url/{slug} : slug availability
//! POST /restaurants/confirm-email    : token → active
//! GET  /restaurants/by-slug/{slug}   : public page (active only)
//! GET  /restaurants/current          : caller's restaurant
//! PUT  /restaurants/current          : update profile
//! PUT  /restaurants/{id}/status      : superadmin status change

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router, middleware};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    ConfirmEmailRequest, PublicRestaurant, RegistrationRequest, RegistrationResponse, Restaurant,
    RestaurantStatus, RestaurantStatusUpdate, RestaurantUpdate, UrlAvailability,
};

use super::{ApiResult, AppJson};
use crate::auth::CurrentUser;
use crate::auth::roles::LEVEL_RESTAURANT_ADMIN;
use crate::db::{restaurants, users};
use crate::middleware::rate_limit::{restaurant_creation_rate_limit, search_rate_limit};
use crate::middleware::sanitize_restaurant_input;
use crate::security_log;
use crate::state::AppState;
use crate::util::{generate_token, hash_password, now_millis};
use crate::validation::{
    MAX_TOKEN_LEN, normalize_email, normalize_primary_location, slug_problem, validate_card_token,
    validate_features, validate_operating_hours, validate_payload, validate_slug,
};

pub fn router(state: &AppState) -> Router<AppState> {
    let creation_limit =
        middleware::from_fn_with_state(state.clone(), restaurant_creation_rate_limit);
    let search_limit = middleware::from_fn_with_state(state.clone(), search_rate_limit);
    Router::new()
        .route("/restaurants/register", post(register).layer(creation_limit))
        .route(
            "/restaurants/check-url/{slug}",
            get(check_url).layer(search_limit.clone()),
        )
        .route("/restaurants/confirm-email", post(confirm_email))
        .route("/restaurants/by-slug/{slug}", get(by_slug).layer(search_limit))
        .route("/restaurants/current", get(current).put(update_current))
        .route("/restaurants/{id}/status", put(update_status))
        .layer(middleware::from_fn(sanitize_restaurant_input))
}

/// Normalize and check everything the registration transaction assumes
fn prepare_registration(req: &mut RegistrationRequest) -> Result<usize, AppError> {
    req.owner.email = normalize_email(&req.owner.email);
    req.restaurant.url_slug = req.restaurant.url_slug.trim().to_ascii_lowercase();

    validate_payload(&*req)?;
    validate_slug(&req.restaurant.url_slug)?;

    let primary = normalize_primary_location(&mut req.locations)?;
    for location in &mut req.locations {
        location.operating_hours = validate_operating_hours(&location.operating_hours)?;
        location.selected_features = validate_features(&location.selected_features)?;
    }

    validate_card_token(&req.payment_info.card_token)?;
    Ok(primary)
}

/// POST /restaurants/register
pub async fn register(
    State(state): State<AppState>,
    AppJson(mut req): AppJson<RegistrationRequest>,
) -> Result<(StatusCode, Json<RegistrationResponse>), AppError> {
    let primary = prepare_registration(&mut req)?;
    let billing = restaurants::resolve_billing(&req.billing_address, &req.locations[primary])?;

    if restaurants::slug_exists(&state.pool, &req.restaurant.url_slug).await? {
        return Err(AppError::new(ErrorCode::RestaurantUrlTaken)
            .with_detail("url_slug", req.restaurant.url_slug.clone()));
    }
    if users::email_taken(&state.pool, &req.owner.email).await? {
        return Err(AppError::new(ErrorCode::EmailTaken));
    }

    let password_hash = hash_password(&req.owner.password).map_err(|e| {
        tracing::error!(error = %e, "Password hashing failed");
        AppError::internal("Password hashing failed")
    })?;
    let confirmation_token = generate_token();

    let registered = restaurants::register(
        &state.pool,
        &req,
        &billing,
        &password_hash,
        &confirmation_token,
        now_millis(),
    )
    .await?;

    tracing::info!(
        restaurant_id = registered.restaurant_id,
        owner_user_id = registered.owner_user_id,
        url_slug = %req.restaurant.url_slug,
        locations = req.locations.len(),
        "Restaurant registered"
    );
    // Delivery is external; the token is only surfaced in debug logs
    tracing::debug!(
        restaurant_id = registered.restaurant_id,
        token = %confirmation_token,
        "Email confirmation token issued"
    );

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse {
            restaurant_id: registered.restaurant_id,
            owner_user_id: registered.owner_user_id,
            url_slug: req.restaurant.url_slug,
            status: RestaurantStatus::Pending,
            message: "Registration received. Confirm the owner email to activate the restaurant."
                .to_string(),
        }),
    ))
}

/// GET /restaurants/check-url/{slug}
pub async fn check_url(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<UrlAvailability> {
    let slug = slug.trim().to_ascii_lowercase();
    if let Some(reason) = slug_problem(&slug) {
        return Ok(Json(UrlAvailability {
            url_slug: slug,
            available: false,
            reason: Some(reason.to_string()),
        }));
    }

    let taken = restaurants::slug_exists(&state.pool, &slug).await?;
    Ok(Json(UrlAvailability {
        url_slug: slug,
        available: !taken,
        reason: taken.then(|| "This URL is already taken".to_string()),
    }))
}

/// POST /restaurants/confirm-email
pub async fn confirm_email(
    State(state): State<AppState>,
    AppJson(req): AppJson<ConfirmEmailRequest>,
) -> ApiResult<Restaurant> {
    let token = req.token.trim();
    if token.is_empty() || token.len() > MAX_TOKEN_LEN {
        return Err(AppError::new(ErrorCode::ConfirmationTokenInvalid));
    }

    let restaurant = restaurants::confirm_email(&state.pool, token, now_millis()).await?;
    tracing::info!(restaurant_id = restaurant.id, "Restaurant email confirmed");
    Ok(Json(restaurant))
}

/// GET /restaurants/by-slug/{slug}
pub async fn by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<PublicRestaurant> {
    let slug = slug.trim().to_ascii_lowercase();
    let restaurant = restaurants::public_by_slug(&state.pool, &slug)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::RestaurantNotFound))?;
    Ok(Json(restaurant))
}

/// GET /restaurants/current
pub async fn current(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Restaurant> {
    let restaurant_id = user.require_restaurant()?;
    let restaurant = restaurants::find_by_id(&state.pool, restaurant_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::RestaurantNotFound))?;
    Ok(Json(restaurant))
}

/// PUT /restaurants/current
pub async fn update_current(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(req): AppJson<RestaurantUpdate>,
) -> ApiResult<Restaurant> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_RESTAURANT_ADMIN)?;
    validate_payload(&req)?;

    let restaurant = restaurants::update(&state.pool, restaurant_id, &req, now_millis()).await?;
    tracing::info!(restaurant_id, user_id = user.id, "Restaurant profile updated");
    Ok(Json(restaurant))
}

/// PUT /restaurants/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    AppJson(req): AppJson<RestaurantStatusUpdate>,
) -> ApiResult<Restaurant> {
    user.require_superadmin()?;

    let restaurant = restaurants::set_status(&state.pool, id, req.status, now_millis()).await?;
    security_log!(
        INFO,
        "restaurant_status_changed",
        restaurant_id = id,
        status = req.status.as_str(),
        user_id = user.id
    );
    Ok(Json(restaurant))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegistrationRequest {
        serde_json::from_value(serde_json::json!({
            "owner": {
                "first_name": "Ana",
                "last_name": "Lopez",
                "email": "  Ana@Example.COM ",
                "password": "s3cretpass"
            },
            "restaurant": {
                "name": "Casa Ana",
                "url_slug": " Casa-Ana ",
                "business_type": "restaurant"
            },
            "locations": [
                {
                    "name": "Centro",
                    "address": "Calle 1",
                    "city": "Madrid",
                    "country": "ES",
                    "operating_hours": { "monday": { "open": "09:00", "close": "17:00" } },
                    "selected_features": ["takeout", "takeout", "qr_menu"]
                },
                { "name": "Norte", "address": "Calle 2", "city": "Madrid", "country": "ES" }
            ],
            "billing_address": { "same_as_primary_location": true },
            "payment_info": { "card_token": "tok_visa_4242" }
        }))
        .unwrap()
    }

    #[test]
    fn test_prepare_normalizes() {
        let mut req = request();
        let primary = prepare_registration(&mut req).unwrap();
        assert_eq!(primary, 0);
        assert!(req.locations[0].is_primary);
        assert!(!req.locations[1].is_primary);
        assert_eq!(req.owner.email, "ana@example.com");
        assert_eq!(req.restaurant.url_slug, "casa-ana");
        assert_eq!(req.locations[0].operating_hours.len(), 8);
        assert!(req.locations[1].operating_hours["sunday"].closed);
        assert_eq!(req.locations[0].selected_features, ["takeout", "qr_menu"]);
    }

    #[test]
    fn test_prepare_rejects_raw_card_number() {
        let mut req = request();
        req.payment_info.card_token = "4242 4242 4242 4242".into();
        let err = prepare_registration(&mut req).unwrap_err();
        assert_eq!(err.code, ErrorCode::RawCardNumberRejected);
    }

    #[test]
    fn test_prepare_rejects_reserved_slug_and_two_primaries() {
        let mut req = request();
        req.restaurant.url_slug = "admin".into();
        assert_eq!(
            prepare_registration(&mut req).unwrap_err().code,
            ErrorCode::RestaurantUrlInvalid
        );

        let mut req = request();
        req.locations.iter_mut().for_each(|l| l.is_primary = true);
        assert_eq!(
            prepare_registration(&mut req).unwrap_err().code,
            ErrorCode::ValidationFailed
        );
    }

    #[test]
    fn test_prepare_rejects_unknown_feature() {
        let mut req = request();
        req.locations[1].selected_features = vec!["drone_delivery".into()];
        assert_eq!(
            prepare_registration(&mut req).unwrap_err().code,
            ErrorCode::UnknownFeature
        );
    }
}
