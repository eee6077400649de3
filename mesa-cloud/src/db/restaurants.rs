//! Restaurant (tenant) database operations

use shared::error::{AppError, ErrorCode, FieldError};
use shared::models::{
    BillingAddressInput, LocationInput, PublicRestaurant, RegistrationRequest, Restaurant,
    RestaurantStatus, RestaurantUpdate, RoleAssignment,
};
use sqlx::PgPool;

use super::{locations, roles};
use crate::auth::roles::RESTAURANT_ADMINISTRATOR;
use crate::error::ServiceResult;

const RESTAURANT_COLUMNS: &str = "id, name, url_slug, business_type, cuisine_type, description, \
     website, logo_url, favicon_url, owner_name, owner_email, owner_phone, subscription_plan, \
     status, created_at, updated_at";

/// Email confirmation window
pub const CONFIRMATION_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Billing address as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingAddress {
    pub address: String,
    pub city: String,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: String,
}

/// Billing address from the payload, or copied from the primary location
pub fn resolve_billing(
    input: &BillingAddressInput,
    primary: &LocationInput,
) -> Result<BillingAddress, AppError> {
    if input.same_as_primary_location {
        return Ok(BillingAddress {
            address: primary.address.clone(),
            city: primary.city.clone(),
            state: primary.state.clone(),
            zip_code: primary.zip_code.clone(),
            country: primary.country.clone(),
        });
    }

    let required = |value: &Option<String>, field: &str| match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(FieldError::new(
            format!("billing_address.{field}"),
            "is required unless same_as_primary_location is set",
        )),
    };

    let mut missing = Vec::new();
    let address = required(&input.address, "address").map_err(|e| missing.push(e));
    let city = required(&input.city, "city").map_err(|e| missing.push(e));
    let country = required(&input.country, "country").map_err(|e| missing.push(e));

    match (address, city, country) {
        (Ok(address), Ok(city), Ok(country)) => Ok(BillingAddress {
            address,
            city,
            state: input.state.clone(),
            zip_code: input.zip_code.clone(),
            country,
        }),
        _ => Err(AppError::validation_fields(missing)),
    }
}

pub async fn slug_exists(pool: &PgPool, slug: &str) -> ServiceResult<bool> {
    let exists =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM restaurants WHERE url_slug = $1)")
            .bind(slug)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

/// Identifiers produced by a registration
#[derive(Debug, Clone, Copy)]
pub struct Registered {
    pub restaurant_id: i64,
    pub owner_user_id: i64,
    pub primary_location_id: i64,
}

/// Create the whole tenant in one transaction
///
/// `req` must already be validated and normalized: email lowercased,
/// exactly one primary location, hours and features checked.
pub async fn register(
    pool: &PgPool,
    req: &RegistrationRequest,
    billing: &BillingAddress,
    password_hash: &str,
    confirmation_token: &str,
    now: i64,
) -> ServiceResult<Registered> {
    let owner = &req.owner;
    let info = &req.restaurant;
    let owner_name = format!("{} {}", owner.first_name.trim(), owner.last_name.trim());

    let mut tx = pool.begin().await?;

    let restaurant_id: i64 = sqlx::query_scalar(
        "INSERT INTO restaurants
             (name, url_slug, business_type, cuisine_type, description, website,
              owner_name, owner_email, owner_phone, subscription_plan, status,
              confirmation_token, confirmation_expires_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending', $11, $12, $13, $13)
         RETURNING id",
    )
    .bind(&info.name)
    .bind(&info.url_slug)
    .bind(&info.business_type)
    .bind(&info.cuisine_type)
    .bind(&info.description)
    .bind(&info.website)
    .bind(&owner_name)
    .bind(&owner.email)
    .bind(&owner.phone)
    .bind(info.subscription_plan.as_str())
    .bind(confirmation_token)
    .bind(now + CONFIRMATION_TTL_MS)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let mut primary_location_id = None;
    for input in &req.locations {
        let location = locations::insert(&mut tx, restaurant_id, input, now).await?;
        if location.is_primary {
            primary_location_id = Some(location.id);
        }
    }
    let primary_location_id =
        primary_location_id.ok_or_else(|| AppError::new(ErrorCode::PrimaryLocationRequired))?;

    sqlx::query(
        "INSERT INTO billing_addresses
             (restaurant_id, address, city, state, zip_code, country, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $7)",
    )
    .bind(restaurant_id)
    .bind(&billing.address)
    .bind(&billing.city)
    .bind(&billing.state)
    .bind(&billing.zip_code)
    .bind(&billing.country)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let payment = &req.payment_info;
    sqlx::query(
        "INSERT INTO payment_info
             (restaurant_id, card_token, card_brand, last_four, expiry_month, expiry_year,
              cardholder_name, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)",
    )
    .bind(restaurant_id)
    .bind(&payment.card_token)
    .bind(&payment.card_brand)
    .bind(&payment.last_four)
    .bind(payment.expiry_month)
    .bind(payment.expiry_year)
    .bind(&payment.cardholder_name)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let owner_user_id: i64 = sqlx::query_scalar(
        "INSERT INTO users
             (restaurant_id, email, password_hash, first_name, last_name, phone, status,
              created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, 'active', $7, $7)
         RETURNING id",
    )
    .bind(restaurant_id)
    .bind(&owner.email)
    .bind(password_hash)
    .bind(owner.first_name.trim())
    .bind(owner.last_name.trim())
    .bind(&owner.phone)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let grant = RoleAssignment {
        role_name: RESTAURANT_ADMINISTRATOR.to_string(),
        location_id: Some(primary_location_id),
        is_primary_role: true,
        is_primary_location: true,
    };
    roles::insert_grants(&mut tx, owner_user_id, &[grant], now).await?;

    tx.commit().await?;
    Ok(Registered {
        restaurant_id,
        owner_user_id,
        primary_location_id,
    })
}

/// `pending → active` when the token is known and unexpired
pub async fn confirm_email(pool: &PgPool, token: &str, now: i64) -> ServiceResult<Restaurant> {
    let confirmed: Option<Restaurant> = sqlx::query_as(&format!(
        "UPDATE restaurants SET
             status = 'active',
             confirmation_token = NULL,
             confirmation_expires_at = NULL,
             updated_at = $2
         WHERE confirmation_token = $1 AND confirmation_expires_at > $2 AND status = 'pending'
         RETURNING {RESTAURANT_COLUMNS}"
    ))
    .bind(token)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    if let Some(restaurant) = confirmed {
        return Ok(restaurant);
    }

    let known: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM restaurants WHERE confirmation_token = $1)",
    )
    .bind(token)
    .fetch_one(pool)
    .await?;
    let code = if known {
        ErrorCode::ConfirmationTokenExpired
    } else {
        ErrorCode::ConfirmationTokenInvalid
    };
    Err(AppError::new(code).into())
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> ServiceResult<Option<Restaurant>> {
    let restaurant = sqlx::query_as(&format!(
        "SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(restaurant)
}

pub async fn find_by_slug(pool: &PgPool, slug: &str) -> ServiceResult<Option<Restaurant>> {
    let restaurant = sqlx::query_as(&format!(
        "SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE url_slug = $1"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;
    Ok(restaurant)
}

/// Active restaurant by slug, with its active locations
pub async fn public_by_slug(pool: &PgPool, slug: &str) -> ServiceResult<Option<PublicRestaurant>> {
    let Some(restaurant) = find_by_slug(pool, slug).await? else {
        return Ok(None);
    };
    if restaurant.status != RestaurantStatus::Active {
        return Ok(None);
    }

    let locations = locations::list_active(pool, restaurant.id).await?;
    Ok(Some(PublicRestaurant {
        id: restaurant.id,
        name: restaurant.name,
        url_slug: restaurant.url_slug,
        cuisine_type: restaurant.cuisine_type,
        description: restaurant.description,
        website: restaurant.website,
        logo_url: restaurant.logo_url,
        favicon_url: restaurant.favicon_url,
        locations,
    }))
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    data: &RestaurantUpdate,
    now: i64,
) -> ServiceResult<Restaurant> {
    let restaurant = sqlx::query_as(&format!(
        "UPDATE restaurants SET
             name = COALESCE($2, name),
             business_type = COALESCE($3, business_type),
             cuisine_type = COALESCE($4, cuisine_type),
             description = COALESCE($5, description),
             website = COALESCE($6, website),
             logo_url = COALESCE($7, logo_url),
             favicon_url = COALESCE($8, favicon_url),
             owner_phone = COALESCE($9, owner_phone),
             updated_at = $10
         WHERE id = $1
         RETURNING {RESTAURANT_COLUMNS}"
    ))
    .bind(id)
    .bind(&data.name)
    .bind(&data.business_type)
    .bind(&data.cuisine_type)
    .bind(&data.description)
    .bind(&data.website)
    .bind(&data.logo_url)
    .bind(&data.favicon_url)
    .bind(&data.owner_phone)
    .bind(now)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::new(ErrorCode::RestaurantNotFound))?;
    Ok(restaurant)
}

pub async fn set_status(
    pool: &PgPool,
    id: i64,
    status: RestaurantStatus,
    now: i64,
) -> ServiceResult<Restaurant> {
    let restaurant = sqlx::query_as(&format!(
        "UPDATE restaurants SET status = $2, updated_at = $3
         WHERE id = $1
         RETURNING {RESTAURANT_COLUMNS}"
    ))
    .bind(id)
    .bind(status.as_str())
    .bind(now)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::new(ErrorCode::RestaurantNotFound))?;
    Ok(restaurant)
}

/// Favicon (or logo) of an active restaurant
pub async fn favicon_for_slug(pool: &PgPool, slug: &str) -> ServiceResult<Option<String>> {
    let url: Option<Option<String>> = sqlx::query_scalar(
        "SELECT COALESCE(favicon_url, logo_url) FROM restaurants
         WHERE url_slug = $1 AND status = 'active'",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;
    Ok(url.flatten())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary() -> LocationInput {
        serde_json::from_value(serde_json::json!({
            "name": "Centro",
            "address": "Calle Mayor 1",
            "city": "Madrid",
            "zip_code": "28013",
            "country": "ES",
            "is_primary": true
        }))
        .unwrap()
    }

    #[test]
    fn test_billing_copied_from_primary() {
        let input = BillingAddressInput {
            same_as_primary_location: true,
            address: Some("ignored".into()),
            ..Default::default()
        };
        let billing = resolve_billing(&input, &primary()).unwrap();
        assert_eq!(billing.address, "Calle Mayor 1");
        assert_eq!(billing.zip_code.as_deref(), Some("28013"));
        assert_eq!(billing.country, "ES");
    }

    #[test]
    fn test_billing_explicit() {
        let input = BillingAddressInput {
            same_as_primary_location: false,
            address: Some(" Gran Via 2 ".into()),
            city: Some("Madrid".into()),
            state: None,
            zip_code: None,
            country: Some("ES".into()),
        };
        let billing = resolve_billing(&input, &primary()).unwrap();
        assert_eq!(billing.address, "Gran Via 2");
    }

    #[test]
    fn test_billing_missing_fields_listed() {
        let input = BillingAddressInput {
            city: Some("Madrid".into()),
            ..Default::default()
        };
        let err = resolve_billing(&input, &primary()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        let fields = &err.details.unwrap()["fields"];
        let names: Vec<&str> = fields
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["billing_address.address", "billing_address.country"]);
    }
}
