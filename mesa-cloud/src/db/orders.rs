//! Order database operations

use std::collections::HashMap;

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderCreate, OrderDetail, OrderItem, OrderQuery, OrderStatus, Page};
use sqlx::PgPool;

use crate::error::ServiceResult;

const ORDER_COLUMNS: &str = "id, restaurant_id, location_id, user_id, status, order_type, \
     total_amount, notes, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PricedItem {
    id: i64,
    base_price: Decimal,
    is_available: bool,
}

/// One priced order line
#[derive(Debug, Clone, PartialEq)]
struct Line {
    menu_item_id: i64,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
    special_instructions: Option<String>,
}

/// Price every requested line from the current menu
fn price_lines(
    order: &OrderCreate,
    menu: &HashMap<i64, PricedItem>,
) -> Result<Vec<Line>, AppError> {
    if order.items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty));
    }
    order
        .items
        .iter()
        .map(|requested| {
            let item = menu.get(&requested.menu_item_id).ok_or_else(|| {
                AppError::new(ErrorCode::MenuItemNotFound)
                    .with_detail("menu_item_id", requested.menu_item_id)
            })?;
            if !item.is_available {
                return Err(AppError::new(ErrorCode::MenuItemUnavailable)
                    .with_detail("menu_item_id", requested.menu_item_id));
            }
            Ok(Line {
                menu_item_id: item.id,
                quantity: requested.quantity,
                unit_price: item.base_price,
                total_price: item.base_price * Decimal::from(requested.quantity),
                special_instructions: requested
                    .special_instructions
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            })
        })
        .collect()
}

/// Place an order; lines are priced from the current `base_price`
pub async fn create(
    pool: &PgPool,
    user_id: i64,
    order: &OrderCreate,
    now: i64,
) -> ServiceResult<OrderDetail> {
    if order.items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty).into());
    }

    let mut tx = pool.begin().await?;

    let status: Option<String> =
        sqlx::query_scalar("SELECT status FROM restaurants WHERE id = $1")
            .bind(order.restaurant_id)
            .fetch_optional(&mut *tx)
            .await?;
    match status.as_deref() {
        None => return Err(AppError::new(ErrorCode::RestaurantNotFound).into()),
        Some("active") => {}
        Some(_) => return Err(AppError::new(ErrorCode::RestaurantInactive).into()),
    }

    if let Some(location_id) = order.location_id {
        let active: Option<bool> = sqlx::query_scalar(
            "SELECT is_active FROM restaurant_locations WHERE id = $1 AND restaurant_id = $2",
        )
        .bind(location_id)
        .bind(order.restaurant_id)
        .fetch_optional(&mut *tx)
        .await?;
        if active != Some(true) {
            return Err(AppError::new(ErrorCode::LocationNotFound)
                .with_detail("location_id", location_id)
                .into());
        }
    }

    let ids: Vec<i64> = order.items.iter().map(|i| i.menu_item_id).collect();
    let rows: Vec<PricedItem> = sqlx::query_as(
        "SELECT id, base_price, is_available FROM menu_items
         WHERE restaurant_id = $1 AND id = ANY($2)",
    )
    .bind(order.restaurant_id)
    .bind(&ids)
    .fetch_all(&mut *tx)
    .await?;
    let menu: HashMap<i64, PricedItem> = rows.into_iter().map(|r| (r.id, r)).collect();

    let lines = price_lines(order, &menu)?;
    let total: Decimal = lines.iter().map(|l| l.total_price).sum();

    let header: Order = sqlx::query_as(&format!(
        "INSERT INTO orders
             (restaurant_id, location_id, user_id, status, order_type, total_amount, notes,
              created_at, updated_at)
         VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7, $7)
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order.restaurant_id)
    .bind(order.location_id)
    .bind(user_id)
    .bind(order.order_type.as_str())
    .bind(total)
    .bind(&order.notes)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let item_ids: Vec<i64> = lines.iter().map(|l| l.menu_item_id).collect();
    let quantities: Vec<i32> = lines.iter().map(|l| l.quantity).collect();
    let unit_prices: Vec<Decimal> = lines.iter().map(|l| l.unit_price).collect();
    let totals: Vec<Decimal> = lines.iter().map(|l| l.total_price).collect();
    let instructions: Vec<Option<String>> =
        lines.iter().map(|l| l.special_instructions.clone()).collect();

    let items: Vec<OrderItem> = sqlx::query_as(
        "INSERT INTO order_items
             (order_id, menu_item_id, quantity, unit_price, total_price, special_instructions)
         SELECT $1, u.menu_item_id, u.quantity, u.unit_price, u.total_price, u.special_instructions
         FROM UNNEST($2::bigint[], $3::int[], $4::numeric[], $5::numeric[], $6::text[])
             AS u(menu_item_id, quantity, unit_price, total_price, special_instructions)
         RETURNING id, order_id, menu_item_id, quantity, unit_price, total_price,
                   special_instructions",
    )
    .bind(header.id)
    .bind(&item_ids)
    .bind(&quantities)
    .bind(&unit_prices)
    .bind(&totals)
    .bind(&instructions)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(OrderDetail {
        order: header,
        items,
    })
}

/// Staff view: restaurant orders, newest first
pub async fn list(
    pool: &PgPool,
    restaurant_id: i64,
    query: &OrderQuery,
) -> ServiceResult<Page<Order>> {
    let (page, per_page) = query.pagination();
    let status = query.status.map(|s| s.as_str());
    let offset = i64::from(page - 1) * i64::from(per_page);

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM orders WHERE restaurant_id = $1 AND ($2::text IS NULL OR status = $2)",
    )
    .bind(restaurant_id)
    .bind(status)
    .fetch_one(pool)
    .await?;

    let items = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders
         WHERE restaurant_id = $1 AND ($2::text IS NULL OR status = $2)
         ORDER BY created_at DESC, id DESC
         LIMIT $3 OFFSET $4"
    ))
    .bind(restaurant_id)
    .bind(status)
    .bind(i64::from(per_page))
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(Page {
        items,
        page,
        per_page,
        total,
    })
}

/// Orders placed by `user_id`, newest first
pub async fn list_for_user(
    pool: &PgPool,
    user_id: i64,
    query: &OrderQuery,
) -> ServiceResult<Page<Order>> {
    let (page, per_page) = query.pagination();
    let offset = i64::from(page - 1) * i64::from(per_page);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders
         WHERE user_id = $1
         ORDER BY created_at DESC, id DESC
         LIMIT $2 OFFSET $3"
    ))
    .bind(user_id)
    .bind(i64::from(per_page))
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(Page {
        items,
        page,
        per_page,
        total,
    })
}

pub async fn get(pool: &PgPool, id: i64) -> ServiceResult<OrderDetail> {
    let order: Order =
        sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    let items = sqlx::query_as(
        "SELECT id, order_id, menu_item_id, quantity, unit_price, total_price, special_instructions
         FROM order_items WHERE order_id = $1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(OrderDetail { order, items })
}

/// Move an order along its lifecycle; the row is locked while checking
pub async fn update_status(
    pool: &PgPool,
    restaurant_id: i64,
    id: i64,
    next: OrderStatus,
    now: i64,
) -> ServiceResult<Order> {
    let mut tx = pool.begin().await?;

    let current: Option<String> = sqlx::query_scalar(
        "SELECT status FROM orders WHERE id = $1 AND restaurant_id = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(restaurant_id)
    .fetch_optional(&mut *tx)
    .await?;
    let current = current.ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    let current = OrderStatus::try_from(current).map_err(AppError::internal)?;

    if !current.can_transition_to(next) {
        return Err(AppError::new(ErrorCode::InvalidStatusTransition)
            .with_detail("from", current.as_str())
            .with_detail("to", next.as_str())
            .into());
    }

    let order: Order = sqlx::query_as(&format!(
        "UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(next.as_str())
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(
        order_id = id,
        from = current.as_str(),
        to = next.as_str(),
        "Order status changed"
    );
    Ok(order)
}
