//! Restaurant Location Model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Day keys accepted in operating hours (7 weekdays + holidays)
pub const HOURS_DAY_KEYS: [&str; 8] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
    "holidays",
];

/// Feature catalogue for locations
pub const LOCATION_FEATURES: [&str; 8] = [
    "online_ordering",
    "table_reservations",
    "delivery",
    "takeout",
    "whatsapp_orders",
    "qr_menu",
    "loyalty_program",
    "multi_language_menu",
];

/// Opening window for one day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    /// HH:MM (24h)
    pub open: Option<String>,
    /// HH:MM (24h)
    pub close: Option<String>,
    #[serde(default)]
    pub closed: bool,
}

impl DayHours {
    pub fn closed() -> Self {
        Self {
            open: None,
            close: None,
            closed: true,
        }
    }
}

/// Day key -> hours. Missing days are closed.
pub type OperatingHours = BTreeMap<String, DayHours>;

/// Location entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Location {
    pub id: i64,
    pub restaurant_id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: String,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub operating_hours: OperatingHours,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub selected_features: Vec<String>,
    pub is_primary: bool,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create location payload (also used inside registration)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LocationInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 500))]
    pub address: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(max = 100))]
    pub state: Option<String>,
    #[validate(length(max = 20))]
    pub zip_code: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 50))]
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub operating_hours: OperatingHours,
    #[serde(default)]
    pub selected_features: Vec<String>,
    #[serde(default)]
    pub is_primary: bool,
}

/// Update location payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LocationUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub address: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub state: Option<String>,
    #[validate(length(max = 20))]
    pub zip_code: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub country: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 50))]
    pub whatsapp: Option<String>,
    pub selected_features: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// Operating hours replacement payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoursUpdate {
    pub operating_hours: OperatingHours,
}
