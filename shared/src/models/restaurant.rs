//! Restaurant Model (tenant account)

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::location::{Location, LocationInput};

/// Subscription plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    #[default]
    Basic,
    Standard,
    Premium,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Premium => "premium",
        }
    }
}

impl TryFrom<String> for SubscriptionPlan {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "basic" => Ok(Self::Basic),
            "standard" => Ok(Self::Standard),
            "premium" => Ok(Self::Premium),
            other => Err(format!("unknown subscription plan: {other}")),
        }
    }
}

/// Restaurant lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestaurantStatus {
    /// Registered, email not yet confirmed
    #[default]
    Pending,
    Active,
    Inactive,
}

impl RestaurantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl TryFrom<String> for RestaurantStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("unknown restaurant status: {other}")),
        }
    }
}

/// Restaurant entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Restaurant {
    pub id: i64,
    pub name: String,
    pub url_slug: String,
    pub business_type: String,
    pub cuisine_type: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub favicon_url: Option<String>,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_phone: Option<String>,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub subscription_plan: SubscriptionPlan,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub status: RestaurantStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Public restaurant page (by slug)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicRestaurant {
    pub id: i64,
    pub name: String,
    pub url_slug: String,
    pub cuisine_type: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub favicon_url: Option<String>,
    pub locations: Vec<Location>,
}

/// Update restaurant profile payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RestaurantUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub business_type: Option<String>,
    #[validate(length(max = 100))]
    pub cuisine_type: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 2048))]
    pub website: Option<String>,
    #[validate(length(max = 2048))]
    pub logo_url: Option<String>,
    #[validate(length(max = 2048))]
    pub favicon_url: Option<String>,
    #[validate(length(max = 50))]
    pub owner_phone: Option<String>,
}

/// Status change payload (superadmin)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantStatusUpdate {
    pub status: RestaurantStatus,
}

// ── Registration ──

/// Owner block of the registration payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OwnerInfo {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Restaurant block of the registration payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RestaurantInfo {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub url_slug: String,
    #[validate(length(min = 1, max = 100))]
    pub business_type: String,
    #[validate(length(max = 100))]
    pub cuisine_type: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 2048))]
    pub website: Option<String>,
    #[serde(default)]
    pub subscription_plan: SubscriptionPlan,
}

/// Billing address; `same_as_primary_location` copies the primary location's address
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct BillingAddressInput {
    #[serde(default)]
    pub same_as_primary_location: bool,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub state: Option<String>,
    #[validate(length(max = 20))]
    pub zip_code: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
}

/// Tokenized card reference. Raw card numbers are never accepted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PaymentInfoInput {
    #[validate(length(min = 1, max = 255))]
    pub card_token: String,
    #[validate(length(max = 50))]
    pub card_brand: Option<String>,
    #[validate(length(equal = 4))]
    pub last_four: Option<String>,
    #[validate(range(min = 1, max = 12))]
    pub expiry_month: Option<i32>,
    #[validate(range(min = 2000, max = 2100))]
    pub expiry_year: Option<i32>,
    #[validate(length(max = 200))]
    pub cardholder_name: Option<String>,
}

/// Multi-step registration payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegistrationRequest {
    #[validate(nested)]
    pub owner: OwnerInfo,
    #[validate(nested)]
    pub restaurant: RestaurantInfo,
    #[validate(length(min = 1, max = 50), nested)]
    pub locations: Vec<LocationInput>,
    #[serde(default)]
    #[validate(nested)]
    pub billing_address: BillingAddressInput,
    #[validate(nested)]
    pub payment_info: PaymentInfoInput,
}

/// Registration result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub restaurant_id: i64,
    pub owner_user_id: i64,
    pub url_slug: String,
    pub status: RestaurantStatus,
    pub message: String,
}

/// Slug availability result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlAvailability {
    pub url_slug: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Email confirmation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmEmailRequest {
    pub token: String,
}
