//! Orders
//!
//! Any authenticated user may order from an active restaurant. Staff of that
//! restaurant list orders and move them through the status workflow.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router, middleware};
use shared::error::AppError;
use shared::models::{Order, OrderCreate, OrderDetail, OrderQuery, OrderStatusUpdate, Page};

use super::{ApiResult, AppJson, AppQuery};
use crate::auth::roles::LEVEL_STAFF;
use crate::auth::{CurrentUser, require_auth};
use crate::db::orders;
use crate::middleware::sanitize_input;
use crate::security_log;
use crate::state::AppState;
use crate::util::now_millis;
use crate::validation::validate_payload;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/orders", post(create).get(list))
        .route("/orders/mine", get(mine))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/status", put(update_status))
        .layer(middleware::from_fn(sanitize_input))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

/// Owner of the order, staff of its restaurant, or superadmin
fn can_view(user: &CurrentUser, order: &Order) -> bool {
    order.user_id == user.id
        || user.is_superadmin()
        || (user.restaurant_id == Some(order.restaurant_id)
            && user.highest_level() >= LEVEL_STAFF)
}

/// POST /orders
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(req): AppJson<OrderCreate>,
) -> Result<(StatusCode, Json<OrderDetail>), AppError> {
    validate_payload(&req)?;

    let order = orders::create(&state.pool, user.id, &req, now_millis()).await?;
    tracing::info!(
        order_id = order.order.id,
        restaurant_id = order.order.restaurant_id,
        user_id = user.id,
        lines = order.items.len(),
        total = %order.order.total_amount,
        "Order placed"
    );
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: staff view of the caller's restaurant
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<OrderQuery>,
) -> ApiResult<Page<Order>> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_STAFF)?;
    Ok(Json(orders::list(&state.pool, restaurant_id, &query).await?))
}

/// GET /orders/mine
pub async fn mine(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<OrderQuery>,
) -> ApiResult<Page<Order>> {
    Ok(Json(orders::list_for_user(&state.pool, user.id, &query).await?))
}

/// GET /orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<OrderDetail> {
    let order = orders::get(&state.pool, id).await?;
    if !can_view(&user, &order.order) {
        security_log!(WARN, "order_access_denied", user_id = user.id, order_id = id);
        return Err(AppError::permission_denied("You do not have access to this order"));
    }
    Ok(Json(order))
}

/// PUT /orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    AppJson(req): AppJson<OrderStatusUpdate>,
) -> ApiResult<Order> {
    let restaurant_id = user.require_restaurant()?;
    user.require_level(LEVEL_STAFF)?;

    let order =
        orders::update_status(&state.pool, restaurant_id, id, req.status, now_millis()).await?;
    tracing::info!(
        order_id = id,
        restaurant_id,
        status = req.status.as_str(),
        user_id = user.id,
        "Order status changed"
    );
    Ok(Json(order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{OrderStatus, OrderType};

    fn order(user_id: i64, restaurant_id: i64) -> Order {
        Order {
            id: 1,
            restaurant_id,
            location_id: None,
            user_id,
            status: OrderStatus::Pending,
            order_type: OrderType::Takeout,
            total_amount: Decimal::TEN,
            notes: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn user(id: i64, restaurant_id: Option<i64>, roles: &[&str]) -> CurrentUser {
        CurrentUser {
            id,
            email: format!("u{id}@example.com"),
            restaurant_id,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_owner_and_staff_can_view() {
        let o = order(7, 3);
        assert!(can_view(&user(7, None, &["customer"]), &o));
        assert!(can_view(&user(8, Some(3), &["waiter"]), &o));
        assert!(can_view(&user(9, None, &["superadmin"]), &o));
    }

    #[test]
    fn test_other_tenants_and_customers_cannot_view() {
        let o = order(7, 3);
        assert!(!can_view(&user(8, Some(4), &["waiter"]), &o));
        assert!(!can_view(&user(8, Some(3), &["customer"]), &o));
    }
}
