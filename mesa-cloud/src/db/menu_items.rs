//! Menu item database operations
//!
//! An item is one `menu_items` row plus its translations and category
//! associations. Create and update rewrite all three inside one transaction:
//! either everything lands or nothing does.
//!
//! Reads are localized: the name and description come from the translation
//! for the requested language, falling back to the synthesized `Item #<id>`
//! label. Categories are aggregated SQL-side.

use std::collections::HashSet;

use shared::error::{AppError, ErrorCode};
use shared::models::{
    CategoryAssignment, MenuItem, MenuItemInput, MenuItemQuery, MenuItemTranslation, ReorderEntry,
    TranslationInput,
};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use crate::error::ServiceResult;

/// Language used when the caller does not ask for one
pub const DEFAULT_LANGUAGE: &str = "en";

// $1 is always the language code
const ITEM_COLUMNS: &str = "
    mi.id, mi.restaurant_id, mi.base_price, mi.preparation_time, mi.is_available,
    mi.is_featured, mi.image_url,
    COALESCE(t.name, 'Item #' || mi.id) AS name,
    t.description,
    COALESCE(
        (SELECT json_agg(
                    json_build_object('id', c.id, 'name', c.name, 'display_order', mic.display_order)
                    ORDER BY c.display_order, c.id)
         FROM menu_item_categories mic
         JOIN menu_categories c ON c.id = mic.category_id
         WHERE mic.menu_item_id = mi.id),
        '[]'::json) AS categories,
    mi.created_at, mi.updated_at";

const TRANSLATION_JOIN: &str = "
    LEFT JOIN menu_item_translations t
        ON t.menu_item_id = mi.id AND t.language_code = $1";

fn language(requested: Option<&str>) -> String {
    requested
        .map(|l| l.trim().to_ascii_lowercase())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

// ── Reads ───────────────────────────────────────────────────────────

pub async fn get_by_id(
    pool: &PgPool,
    restaurant_id: i64,
    id: i64,
    lang: Option<&str>,
) -> ServiceResult<MenuItem> {
    let item = sqlx::query_as(&format!(
        "SELECT {ITEM_COLUMNS} FROM menu_items mi {TRANSLATION_JOIN}
         WHERE mi.id = $2 AND mi.restaurant_id = $3"
    ))
    .bind(language(lang))
    .bind(id)
    .bind(restaurant_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::new(ErrorCode::MenuItemNotFound))?;
    Ok(item)
}

/// Items of a restaurant, optionally filtered
pub async fn list(
    pool: &PgPool,
    restaurant_id: i64,
    query: &MenuItemQuery,
) -> ServiceResult<Vec<MenuItem>> {
    let items = sqlx::query_as(&format!(
        "SELECT {ITEM_COLUMNS} FROM menu_items mi {TRANSLATION_JOIN}
         WHERE mi.restaurant_id = $2
           AND ($3::boolean IS NULL OR mi.is_available = $3)
           AND ($4::boolean IS NULL OR mi.is_featured = $4)
           AND ($5::bigint IS NULL OR EXISTS (
                   SELECT 1 FROM menu_item_categories f
                   WHERE f.menu_item_id = mi.id AND f.category_id = $5))
         ORDER BY name, mi.id"
    ))
    .bind(language(query.language.as_deref()))
    .bind(restaurant_id)
    .bind(query.available)
    .bind(query.featured)
    .bind(query.category_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

/// Items of one category ordered by the association's `display_order`,
/// reported as `category_order`
pub async fn get_by_category(
    pool: &PgPool,
    restaurant_id: i64,
    category_id: i64,
    lang: Option<&str>,
    available_only: bool,
) -> ServiceResult<Vec<MenuItem>> {
    let items = sqlx::query_as(&format!(
        "SELECT {ITEM_COLUMNS}, sel.display_order AS category_order
         FROM menu_items mi
         JOIN menu_item_categories sel
             ON sel.menu_item_id = mi.id AND sel.category_id = $3
         {TRANSLATION_JOIN}
         WHERE mi.restaurant_id = $2 AND (NOT $4 OR mi.is_available)
         ORDER BY sel.display_order, mi.id"
    ))
    .bind(language(lang))
    .bind(restaurant_id)
    .bind(category_id)
    .bind(available_only)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

pub async fn get_translations(
    pool: &PgPool,
    restaurant_id: i64,
    id: i64,
) -> ServiceResult<Vec<MenuItemTranslation>> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM menu_items WHERE id = $1 AND restaurant_id = $2)",
    )
    .bind(id)
    .bind(restaurant_id)
    .fetch_one(pool)
    .await?;
    if !exists {
        return Err(AppError::new(ErrorCode::MenuItemNotFound).into());
    }

    let translations = sqlx::query_as(
        "SELECT id, menu_item_id, language_code, name, description
         FROM menu_item_translations
         WHERE menu_item_id = $1
         ORDER BY language_code",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;
    Ok(translations)
}

// ── Transactional writes ────────────────────────────────────────────

/// Roll back, logging (not propagating) a failed rollback
async fn rollback(tx: Transaction<'_, Postgres>, operation: &'static str) {
    if let Err(e) = tx.rollback().await {
        tracing::error!(operation, error = %e, "Menu item rollback failed");
    } else {
        tracing::debug!(operation, "Menu item transaction rolled back");
    }
}

/// Create an item with its translations and categories; returns the new id
pub async fn create(
    pool: &PgPool,
    restaurant_id: i64,
    input: &MenuItemInput,
    now: i64,
) -> ServiceResult<i64> {
    let mut tx = pool.begin().await?;
    match insert_item(&mut tx, restaurant_id, input, now).await {
        Ok(id) => {
            tx.commit().await?;
            tracing::info!(item_id = id, restaurant_id, "Menu item created");
            Ok(id)
        }
        Err(e) => {
            rollback(tx, "create").await;
            Err(e)
        }
    }
}

/// Replace an item's columns, translations and categories
pub async fn update(
    pool: &PgPool,
    restaurant_id: i64,
    id: i64,
    input: &MenuItemInput,
    now: i64,
) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;
    match update_item(&mut tx, restaurant_id, id, input, now).await {
        Ok(()) => {
            tx.commit().await?;
            tracing::info!(item_id = id, restaurant_id, "Menu item updated");
            Ok(())
        }
        Err(e) => {
            rollback(tx, "update").await;
            Err(e)
        }
    }
}

async fn insert_item(
    conn: &mut PgConnection,
    restaurant_id: i64,
    input: &MenuItemInput,
    now: i64,
) -> ServiceResult<i64> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO menu_items
             (restaurant_id, base_price, preparation_time, is_available, is_featured, image_url,
              created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
         RETURNING id",
    )
    .bind(restaurant_id)
    .bind(input.base_price)
    .bind(input.preparation_time)
    .bind(input.is_available)
    .bind(input.is_featured)
    .bind(&input.image_url)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    replace_translations(conn, id, &input.translations).await?;
    replace_categories(conn, restaurant_id, id, &input.categories).await?;
    Ok(id)
}

async fn update_item(
    conn: &mut PgConnection,
    restaurant_id: i64,
    id: i64,
    input: &MenuItemInput,
    now: i64,
) -> ServiceResult<()> {
    let result = sqlx::query(
        "UPDATE menu_items SET
             base_price = $3,
             preparation_time = $4,
             is_available = $5,
             is_featured = $6,
             image_url = $7,
             updated_at = $8
         WHERE id = $1 AND restaurant_id = $2",
    )
    .bind(id)
    .bind(restaurant_id)
    .bind(input.base_price)
    .bind(input.preparation_time)
    .bind(input.is_available)
    .bind(input.is_featured)
    .bind(&input.image_url)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::new(ErrorCode::MenuItemNotFound).into());
    }

    replace_translations(conn, id, &input.translations).await?;
    replace_categories(conn, restaurant_id, id, &input.categories).await?;
    Ok(())
}

async fn replace_translations(
    conn: &mut PgConnection,
    item_id: i64,
    translations: &[TranslationInput],
) -> ServiceResult<()> {
    sqlx::query("DELETE FROM menu_item_translations WHERE menu_item_id = $1")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;
    if translations.is_empty() {
        return Ok(());
    }

    let languages: Vec<String> = translations
        .iter()
        .map(|t| t.language_code.trim().to_ascii_lowercase())
        .collect();
    let names: Vec<&str> = translations.iter().map(|t| t.name.trim()).collect();
    let descriptions: Vec<Option<&str>> = translations
        .iter()
        .map(|t| t.description.as_deref())
        .collect();

    sqlx::query(
        "INSERT INTO menu_item_translations (menu_item_id, language_code, name, description)
         SELECT $1, u.language_code, u.name, u.description
         FROM UNNEST($2::text[], $3::text[], $4::text[]) AS u(language_code, name, description)",
    )
    .bind(item_id)
    .bind(&languages)
    .bind(&names)
    .bind(&descriptions)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Distinct category ids, or a validation error naming the repeated one
fn distinct_category_ids(assignments: &[CategoryAssignment]) -> Result<Vec<i64>, AppError> {
    let mut seen = HashSet::new();
    for a in assignments {
        if !seen.insert(a.category_id) {
            return Err(AppError::validation("Category listed more than once")
                .with_detail("category_id", a.category_id));
        }
    }
    Ok(assignments.iter().map(|a| a.category_id).collect())
}

async fn replace_categories(
    conn: &mut PgConnection,
    restaurant_id: i64,
    item_id: i64,
    assignments: &[CategoryAssignment],
) -> ServiceResult<()> {
    let ids = distinct_category_ids(assignments)?;

    sqlx::query("DELETE FROM menu_item_categories WHERE menu_item_id = $1")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;
    if ids.is_empty() {
        return Ok(());
    }

    let owned: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM menu_categories WHERE restaurant_id = $1 AND id = ANY($2)",
    )
    .bind(restaurant_id)
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;
    if let Some(missing) = ids.iter().find(|id| !owned.contains(*id)) {
        return Err(AppError::new(ErrorCode::CategoryNotFound)
            .with_detail("category_id", *missing)
            .into());
    }

    let orders: Vec<i32> = assignments.iter().map(|a| a.display_order).collect();
    sqlx::query(
        "INSERT INTO menu_item_categories (menu_item_id, category_id, display_order)
         SELECT $1, u.category_id, u.display_order
         FROM UNNEST($2::bigint[], $3::int[]) AS u(category_id, display_order)",
    )
    .bind(item_id)
    .bind(&ids)
    .bind(&orders)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// ── Single-statement writes ─────────────────────────────────────────

/// Hard delete; translations and associations cascade
pub async fn delete(pool: &PgPool, restaurant_id: i64, id: i64) -> ServiceResult<()> {
    let result = sqlx::query("DELETE FROM menu_items WHERE id = $1 AND restaurant_id = $2")
        .bind(id)
        .bind(restaurant_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::new(ErrorCode::MenuItemNotFound).into());
    }
    tracing::info!(item_id = id, restaurant_id, "Menu item deleted");
    Ok(())
}

pub async fn set_availability(
    pool: &PgPool,
    restaurant_id: i64,
    id: i64,
    is_available: bool,
    now: i64,
) -> ServiceResult<()> {
    let result = sqlx::query(
        "UPDATE menu_items SET is_available = $3, updated_at = $4
         WHERE id = $1 AND restaurant_id = $2",
    )
    .bind(id)
    .bind(restaurant_id)
    .bind(is_available)
    .bind(now)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::new(ErrorCode::MenuItemNotFound).into());
    }
    Ok(())
}

/// Batch `display_order` update inside one category
///
/// Every entry must name an item already in the category; otherwise nothing
/// changes.
pub async fn reorder_in_category(
    pool: &PgPool,
    restaurant_id: i64,
    category_id: i64,
    entries: &[ReorderEntry],
) -> ServiceResult<()> {
    let mut seen = HashSet::new();
    if let Some(dup) = entries.iter().find(|e| !seen.insert(e.menu_item_id)) {
        return Err(AppError::validation("Menu item listed more than once")
            .with_detail("menu_item_id", dup.menu_item_id)
            .into());
    }
    if entries.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    let owned: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM menu_categories WHERE id = $1 AND restaurant_id = $2)",
    )
    .bind(category_id)
    .bind(restaurant_id)
    .fetch_one(&mut *tx)
    .await?;
    if !owned {
        rollback(tx, "reorder").await;
        return Err(AppError::new(ErrorCode::CategoryNotFound).into());
    }

    let item_ids: Vec<i64> = entries.iter().map(|e| e.menu_item_id).collect();
    let orders: Vec<i32> = entries.iter().map(|e| e.display_order).collect();
    let result = sqlx::query(
        "UPDATE menu_item_categories mic SET display_order = u.display_order
         FROM UNNEST($2::bigint[], $3::int[]) AS u(menu_item_id, display_order)
         WHERE mic.category_id = $1 AND mic.menu_item_id = u.menu_item_id",
    )
    .bind(category_id)
    .bind(&item_ids)
    .bind(&orders)
    .execute(&mut *tx)
    .await;

    match result {
        Ok(done) if done.rows_affected() == entries.len() as u64 => {
            tx.commit().await?;
            Ok(())
        }
        Ok(_) => {
            rollback(tx, "reorder").await;
            Err(AppError::with_message(
                ErrorCode::MenuItemNotFound,
                "One or more items are not in this category",
            )
            .into())
        }
        Err(e) => {
            rollback(tx, "reorder").await;
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_defaults_and_normalizes() {
        assert_eq!(language(None), "en");
        assert_eq!(language(Some("  ")), "en");
        assert_eq!(language(Some("ES")), "es");
    }

    #[test]
    fn test_distinct_category_ids() {
        let assignments = vec![
            CategoryAssignment {
                category_id: 1,
                display_order: 10,
            },
            CategoryAssignment {
                category_id: 2,
                display_order: 20,
            },
        ];
        assert_eq!(distinct_category_ids(&assignments).unwrap(), vec![1, 2]);

        let repeated = vec![assignments[0].clone(), assignments[0].clone()];
        let err = distinct_category_ids(&repeated).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.details.unwrap()["category_id"], 1);
    }
}
