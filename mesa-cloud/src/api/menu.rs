//! Menu categories and items
//!
//! Staff read the menu and toggle availability; restaurant administrators
//! edit it. `GET /menu/public/{slug}` is anonymous and only shows active
//! categories and available items of an active restaurant.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router, middleware};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    AvailabilityUpdate, CategoryCreate, CategoryUpdate, LanguageQuery, MenuCategory, MenuItem,
    MenuItemInput, MenuItemQuery, MenuItemTranslation, MessageResponse, PublicMenu,
    ReorderRequest, RestaurantStatus,
};

use super::{ApiResult, AppJson, AppQuery};
use crate::auth::roles::{LEVEL_RESTAURANT_ADMIN, LEVEL_STAFF};
use crate::auth::{CurrentUser, require_auth};
use crate::db::{menu_categories, menu_items, restaurants};
use crate::middleware::rate_limit::search_rate_limit;
use crate::middleware::sanitize_input;
use crate::state::AppState;
use crate::util::now_millis;
use crate::validation::{validate_payload, validate_price, validate_translations};

pub fn router(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route(
            "/menu/categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/menu/categories/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route("/menu/categories/{id}/items", get(category_items))
        .route("/menu/categories/{id}/items/order", put(reorder_items))
        .route("/menu/items", get(list_items).post(create_item))
        .route(
            "/menu/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/menu/items/{id}/translations", get(item_translations))
        .route("/menu/items/{id}/availability", put(set_availability))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let public = Router::new().route(
        "/menu/public/{slug}",
        get(public_menu).layer(middleware::from_fn_with_state(
            state.clone(),
            search_rate_limit,
        )),
    );

    protected
        .merge(public)
        .layer(middleware::from_fn(sanitize_input))
}

fn check_item_input(input: &MenuItemInput) -> Result<(), AppError> {
    validate_payload(input)?;
    validate_price(input.base_price)?;
    validate_translations(&input.translations)
}

// ── Categories ──────────────────────────────────────────────────────

/// GET /menu/categories
pub async fn list_categories(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Vec<MenuCategory>> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_STAFF)?;
    Ok(Json(
        menu_categories::list(&state.pool, restaurant_id, false).await?,
    ))
}

/// GET /menu/categories/{id}
pub async fn get_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<MenuCategory> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_STAFF)?;
    Ok(Json(
        menu_categories::get(&state.pool, restaurant_id, id).await?,
    ))
}

/// POST /menu/categories
pub async fn create_category(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(data): AppJson<CategoryCreate>,
) -> Result<(StatusCode, Json<MenuCategory>), AppError> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_RESTAURANT_ADMIN)?;
    validate_payload(&data)?;

    let category =
        menu_categories::create(&state.pool, restaurant_id, &data, now_millis()).await?;
    tracing::info!(restaurant_id, category_id = category.id, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /menu/categories/{id}
pub async fn update_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    AppJson(data): AppJson<CategoryUpdate>,
) -> ApiResult<MenuCategory> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_RESTAURANT_ADMIN)?;
    validate_payload(&data)?;

    let category =
        menu_categories::update(&state.pool, restaurant_id, id, &data, now_millis()).await?;
    tracing::info!(restaurant_id, category_id = id, "Category updated");
    Ok(Json(category))
}

/// DELETE /menu/categories/{id}
pub async fn delete_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<MessageResponse> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_RESTAURANT_ADMIN)?;

    menu_categories::delete(&state.pool, restaurant_id, id).await?;
    tracing::info!(restaurant_id, category_id = id, "Category deleted");
    Ok(Json(MessageResponse::new("Category deleted")))
}

/// GET /menu/categories/{id}/items
pub async fn category_items(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    AppQuery(query): AppQuery<MenuItemQuery>,
) -> ApiResult<Vec<MenuItem>> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_STAFF)?;
    menu_categories::get(&state.pool, restaurant_id, id).await?;

    let items = menu_items::get_by_category(
        &state.pool,
        restaurant_id,
        id,
        query.language.as_deref(),
        query.available.unwrap_or(false),
    )
    .await?;
    Ok(Json(items))
}

/// PUT /menu/categories/{id}/items/order
pub async fn reorder_items(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    AppJson(req): AppJson<ReorderRequest>,
) -> ApiResult<MessageResponse> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_RESTAURANT_ADMIN)?;

    menu_items::reorder_in_category(&state.pool, restaurant_id, id, &req.items).await?;
    tracing::info!(
        restaurant_id,
        category_id = id,
        items = req.items.len(),
        "Category items reordered"
    );
    Ok(Json(MessageResponse::new("Items reordered")))
}

// ── Items ───────────────────────────────────────────────────────────

/// GET /menu/items
pub async fn list_items(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<MenuItemQuery>,
) -> ApiResult<Vec<MenuItem>> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_STAFF)?;
    Ok(Json(
        menu_items::list(&state.pool, restaurant_id, &query).await?,
    ))
}

/// GET /menu/items/{id}
pub async fn get_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    AppQuery(query): AppQuery<LanguageQuery>,
) -> ApiResult<MenuItem> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_STAFF)?;
    let item =
        menu_items::get_by_id(&state.pool, restaurant_id, id, query.language.as_deref()).await?;
    Ok(Json(item))
}

/// POST /menu/items
pub async fn create_item(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<MenuItemInput>,
) -> Result<(StatusCode, Json<MenuItem>), AppError> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_RESTAURANT_ADMIN)?;
    check_item_input(&input)?;

    let id = menu_items::create(&state.pool, restaurant_id, &input, now_millis()).await?;
    let item = menu_items::get_by_id(&state.pool, restaurant_id, id, None).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /menu/items/{id}: full replacement of columns, translations and categories
pub async fn update_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    AppJson(input): AppJson<MenuItemInput>,
) -> ApiResult<MenuItem> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_RESTAURANT_ADMIN)?;
    check_item_input(&input)?;

    menu_items::update(&state.pool, restaurant_id, id, &input, now_millis()).await?;
    let item = menu_items::get_by_id(&state.pool, restaurant_id, id, None).await?;
    Ok(Json(item))
}

/// DELETE /menu/items/{id}
pub async fn delete_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<MessageResponse> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_RESTAURANT_ADMIN)?;

    menu_items::delete(&state.pool, restaurant_id, id).await?;
    Ok(Json(MessageResponse::new("Menu item deleted")))
}

/// GET /menu/items/{id}/translations
pub async fn item_translations(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Vec<MenuItemTranslation>> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_STAFF)?;
    Ok(Json(
        menu_items::get_translations(&state.pool, restaurant_id, id).await?,
    ))
}

/// PUT /menu/items/{id}/availability
pub async fn set_availability(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    AppJson(req): AppJson<AvailabilityUpdate>,
) -> ApiResult<MenuItem> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_STAFF)?;

    menu_items::set_availability(
        &state.pool,
        restaurant_id,
        id,
        req.is_available,
        now_millis(),
    )
    .await?;
    tracing::info!(
        restaurant_id,
        item_id = id,
        is_available = req.is_available,
        user_id = user.id,
        "Menu item availability changed"
    );
    let item = menu_items::get_by_id(&state.pool, restaurant_id, id, None).await?;
    Ok(Json(item))
}

// ── Public ──────────────────────────────────────────────────────────

/// GET /menu/public/{slug}
pub async fn public_menu(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    AppQuery(query): AppQuery<LanguageQuery>,
) -> ApiResult<PublicMenu> {
    let slug = slug.trim().to_ascii_lowercase();
    let restaurant = restaurants::find_by_slug(&state.pool, &slug)
        .await?
        .filter(|r| r.status == RestaurantStatus::Active)
        .ok_or_else(|| AppError::new(ErrorCode::RestaurantNotFound))?;

    let categories = menu_categories::list(&state.pool, restaurant.id, true).await?;
    let items = menu_items::list(
        &state.pool,
        restaurant.id,
        &MenuItemQuery {
            language: query.language,
            available: Some(true),
            ..Default::default()
        },
    )
    .await?;

    Ok(Json(PublicMenu {
        restaurant_id: restaurant.id,
        restaurant_name: restaurant.name,
        url_slug: restaurant.url_slug,
        categories,
        items,
    }))
}
