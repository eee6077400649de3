//! Menu category database operations

use shared::error::{AppError, ErrorCode};
use shared::models::{CategoryCreate, CategoryUpdate, MenuCategory};
use sqlx::PgPool;

use crate::error::{ServiceError, ServiceResult};

const CATEGORY_COLUMNS: &str =
    "id, restaurant_id, name, description, display_order, is_active, created_at, updated_at";

/// `UNIQUE (restaurant_id, name)` conflicts surface as `CategoryNameExists`
fn name_conflict(err: ServiceError, name: &str) -> ServiceError {
    match err {
        ServiceError::App(e) if e.code == ErrorCode::ConstraintViolation => {
            AppError::new(ErrorCode::CategoryNameExists)
                .with_detail("name", name)
                .into()
        }
        other => other,
    }
}

pub async fn list(
    pool: &PgPool,
    restaurant_id: i64,
    active_only: bool,
) -> ServiceResult<Vec<MenuCategory>> {
    let categories = sqlx::query_as(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM menu_categories
         WHERE restaurant_id = $1 AND (NOT $2 OR is_active)
         ORDER BY display_order, name, id"
    ))
    .bind(restaurant_id)
    .bind(active_only)
    .fetch_all(pool)
    .await?;
    Ok(categories)
}

pub async fn get(pool: &PgPool, restaurant_id: i64, id: i64) -> ServiceResult<MenuCategory> {
    let category = sqlx::query_as(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM menu_categories WHERE id = $1 AND restaurant_id = $2"
    ))
    .bind(id)
    .bind(restaurant_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::new(ErrorCode::CategoryNotFound))?;
    Ok(category)
}

/// New categories go last unless an order is given
pub async fn create(
    pool: &PgPool,
    restaurant_id: i64,
    data: &CategoryCreate,
    now: i64,
) -> ServiceResult<MenuCategory> {
    let name = data.name.trim();
    sqlx::query_as(&format!(
        "INSERT INTO menu_categories
             (restaurant_id, name, description, display_order, is_active, created_at, updated_at)
         VALUES ($1, $2, $3,
                 COALESCE($4, (SELECT COALESCE(MAX(display_order) + 1, 0)
                               FROM menu_categories WHERE restaurant_id = $1)),
                 TRUE, $5, $5)
         RETURNING {CATEGORY_COLUMNS}"
    ))
    .bind(restaurant_id)
    .bind(name)
    .bind(&data.description)
    .bind(data.display_order)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| name_conflict(e.into(), name))
}

/// Partial update; `is_active = false` soft-disables the category
pub async fn update(
    pool: &PgPool,
    restaurant_id: i64,
    id: i64,
    data: &CategoryUpdate,
    now: i64,
) -> ServiceResult<MenuCategory> {
    let name = data.name.as_deref().map(str::trim);
    let category: Option<MenuCategory> = sqlx::query_as(&format!(
        "UPDATE menu_categories SET
             name = COALESCE($3, name),
             description = COALESCE($4, description),
             display_order = COALESCE($5, display_order),
             is_active = COALESCE($6, is_active),
             updated_at = $7
         WHERE id = $1 AND restaurant_id = $2
         RETURNING {CATEGORY_COLUMNS}"
    ))
    .bind(id)
    .bind(restaurant_id)
    .bind(name)
    .bind(&data.description)
    .bind(data.display_order)
    .bind(data.is_active)
    .bind(now)
    .fetch_optional(pool)
    .await
    .map_err(|e| name_conflict(e.into(), name.unwrap_or_default()))?;

    category.ok_or_else(|| AppError::new(ErrorCode::CategoryNotFound).into())
}

/// Hard delete; item associations cascade, items stay
pub async fn delete(pool: &PgPool, restaurant_id: i64, id: i64) -> ServiceResult<()> {
    let result = sqlx::query("DELETE FROM menu_categories WHERE id = $1 AND restaurant_id = $2")
        .bind(id)
        .bind(restaurant_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::new(ErrorCode::CategoryNotFound).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_violation_becomes_name_exists() {
        let err = name_conflict(AppError::constraint_violation().into(), "Desserts");
        let ServiceError::App(app) = err else {
            panic!("expected app error");
        };
        assert_eq!(app.code, ErrorCode::CategoryNameExists);
        assert_eq!(app.details.unwrap()["name"], "Desserts");
    }

    #[test]
    fn test_other_errors_untouched() {
        let err = name_conflict(AppError::new(ErrorCode::CategoryNotFound).into(), "x");
        assert!(matches!(err, ServiceError::App(e) if e.code == ErrorCode::CategoryNotFound));
    }
}
