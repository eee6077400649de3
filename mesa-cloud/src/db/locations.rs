//! Restaurant location database operations

use std::collections::HashSet;

use shared::error::{AppError, ErrorCode};
use shared::models::{Location, LocationInput, LocationUpdate, OperatingHours};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::error::ServiceResult;

const LOCATION_COLUMNS: &str = "id, restaurant_id, name, address, city, state, zip_code, country, \
     phone, whatsapp, operating_hours, selected_features, is_primary, is_active, \
     created_at, updated_at";

pub async fn list(pool: &PgPool, restaurant_id: i64) -> ServiceResult<Vec<Location>> {
    let locations = sqlx::query_as(&format!(
        "SELECT {LOCATION_COLUMNS} FROM restaurant_locations
         WHERE restaurant_id = $1
         ORDER BY is_primary DESC, name, id"
    ))
    .bind(restaurant_id)
    .fetch_all(pool)
    .await?;
    Ok(locations)
}

pub async fn list_active(pool: &PgPool, restaurant_id: i64) -> ServiceResult<Vec<Location>> {
    let locations = sqlx::query_as(&format!(
        "SELECT {LOCATION_COLUMNS} FROM restaurant_locations
         WHERE restaurant_id = $1 AND is_active
         ORDER BY is_primary DESC, name, id"
    ))
    .bind(restaurant_id)
    .fetch_all(pool)
    .await?;
    Ok(locations)
}

pub async fn find(pool: &PgPool, restaurant_id: i64, id: i64) -> ServiceResult<Option<Location>> {
    let location = sqlx::query_as(&format!(
        "SELECT {LOCATION_COLUMNS} FROM restaurant_locations WHERE id = $1 AND restaurant_id = $2"
    ))
    .bind(id)
    .bind(restaurant_id)
    .fetch_optional(pool)
    .await?;
    Ok(location)
}

/// Location ids of a restaurant (role scoping)
pub async fn ids_for_restaurant(pool: &PgPool, restaurant_id: i64) -> ServiceResult<HashSet<i64>> {
    let ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM restaurant_locations WHERE restaurant_id = $1")
            .bind(restaurant_id)
            .fetch_all(pool)
            .await?;
    Ok(ids.into_iter().collect())
}

/// Insert one location (hours and features already validated)
pub(crate) async fn insert(
    conn: &mut PgConnection,
    restaurant_id: i64,
    input: &LocationInput,
    now: i64,
) -> ServiceResult<Location> {
    let location = sqlx::query_as(&format!(
        "INSERT INTO restaurant_locations
             (restaurant_id, name, address, city, state, zip_code, country, phone, whatsapp,
              operating_hours, selected_features, is_primary, is_active, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, TRUE, $13, $13)
         RETURNING {LOCATION_COLUMNS}"
    ))
    .bind(restaurant_id)
    .bind(&input.name)
    .bind(&input.address)
    .bind(&input.city)
    .bind(&input.state)
    .bind(&input.zip_code)
    .bind(&input.country)
    .bind(&input.phone)
    .bind(&input.whatsapp)
    .bind(Json(&input.operating_hours))
    .bind(Json(&input.selected_features))
    .bind(input.is_primary)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(location)
}

async fn clear_primary(conn: &mut PgConnection, restaurant_id: i64, now: i64) -> ServiceResult<()> {
    sqlx::query(
        "UPDATE restaurant_locations SET is_primary = FALSE, updated_at = $2
         WHERE restaurant_id = $1 AND is_primary",
    )
    .bind(restaurant_id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

/// Add a location; a primary one takes over from the current primary
pub async fn create(
    pool: &PgPool,
    restaurant_id: i64,
    input: &LocationInput,
    now: i64,
) -> ServiceResult<Location> {
    let mut tx = pool.begin().await?;

    let has_primary: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM restaurant_locations WHERE restaurant_id = $1 AND is_primary)",
    )
    .bind(restaurant_id)
    .fetch_one(&mut *tx)
    .await?;

    let mut input = input.clone();
    if !has_primary {
        input.is_primary = true;
    } else if input.is_primary {
        clear_primary(&mut tx, restaurant_id, now).await?;
    }

    let location = insert(&mut tx, restaurant_id, &input, now).await?;
    tx.commit().await?;
    Ok(location)
}

/// Partial update; `features` are the validated replacement list
pub async fn update(
    pool: &PgPool,
    restaurant_id: i64,
    id: i64,
    data: &LocationUpdate,
    features: Option<&[String]>,
    now: i64,
) -> ServiceResult<Location> {
    let existing = find(pool, restaurant_id, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::LocationNotFound))?;
    if existing.is_primary && data.is_active == Some(false) {
        return Err(AppError::new(ErrorCode::CannotDeactivatePrimaryLocation).into());
    }

    let location = sqlx::query_as(&format!(
        "UPDATE restaurant_locations SET
             name = COALESCE($3, name),
             address = COALESCE($4, address),
             city = COALESCE($5, city),
             state = COALESCE($6, state),
             zip_code = COALESCE($7, zip_code),
             country = COALESCE($8, country),
             phone = COALESCE($9, phone),
             whatsapp = COALESCE($10, whatsapp),
             selected_features = COALESCE($11, selected_features),
             is_active = COALESCE($12, is_active),
             updated_at = $13
         WHERE id = $1 AND restaurant_id = $2
         RETURNING {LOCATION_COLUMNS}"
    ))
    .bind(id)
    .bind(restaurant_id)
    .bind(&data.name)
    .bind(&data.address)
    .bind(&data.city)
    .bind(&data.state)
    .bind(&data.zip_code)
    .bind(&data.country)
    .bind(&data.phone)
    .bind(&data.whatsapp)
    .bind(features.map(Json))
    .bind(data.is_active)
    .bind(now)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::new(ErrorCode::LocationNotFound))?;
    Ok(location)
}

pub async fn update_hours(
    pool: &PgPool,
    restaurant_id: i64,
    id: i64,
    hours: &OperatingHours,
    now: i64,
) -> ServiceResult<Location> {
    let location = sqlx::query_as(&format!(
        "UPDATE restaurant_locations SET operating_hours = $3, updated_at = $4
         WHERE id = $1 AND restaurant_id = $2
         RETURNING {LOCATION_COLUMNS}"
    ))
    .bind(id)
    .bind(restaurant_id)
    .bind(Json(hours))
    .bind(now)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::new(ErrorCode::LocationNotFound))?;
    Ok(location)
}

/// Switch the primary location (clear current, set new) in one transaction
pub async fn set_primary(
    pool: &PgPool,
    restaurant_id: i64,
    id: i64,
    now: i64,
) -> ServiceResult<Location> {
    let mut tx = pool.begin().await?;

    let active: Option<bool> = sqlx::query_scalar(
        "SELECT is_active FROM restaurant_locations
         WHERE id = $1 AND restaurant_id = $2
         FOR UPDATE",
    )
    .bind(id)
    .bind(restaurant_id)
    .fetch_optional(&mut *tx)
    .await?;
    match active {
        None => return Err(AppError::new(ErrorCode::LocationNotFound).into()),
        Some(false) => {
            return Err(AppError::validation("An inactive location cannot be primary").into());
        }
        Some(true) => {}
    }

    clear_primary(&mut tx, restaurant_id, now).await?;
    let location = sqlx::query_as(&format!(
        "UPDATE restaurant_locations SET is_primary = TRUE, updated_at = $2
         WHERE id = $1
         RETURNING {LOCATION_COLUMNS}"
    ))
    .bind(id)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(location)
}

/// Soft-disable; the primary location cannot be deactivated
pub async fn deactivate(
    pool: &PgPool,
    restaurant_id: i64,
    id: i64,
    now: i64,
) -> ServiceResult<Location> {
    let location = sqlx::query_as(&format!(
        "UPDATE restaurant_locations SET is_active = FALSE, updated_at = $3
         WHERE id = $1 AND restaurant_id = $2 AND NOT is_primary
         RETURNING {LOCATION_COLUMNS}"
    ))
    .bind(id)
    .bind(restaurant_id)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    match location {
        Some(location) => Ok(location),
        None => match find(pool, restaurant_id, id).await? {
            Some(_) => Err(AppError::new(ErrorCode::CannotDeactivatePrimaryLocation).into()),
            None => Err(AppError::new(ErrorCode::LocationNotFound).into()),
        },
    }
}
