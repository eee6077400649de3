//! User & Role Models

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Account status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl TryFrom<String> for UserStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("unknown user status: {other}")),
        }
    }
}

/// User entity (no credentials)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub restaurant_id: Option<i64>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub status: UserStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Role catalogue entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    /// Hierarchy level (higher = more authority)
    pub level: i32,
}

/// A role grant as seen on a user (role-location pair)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct UserRoleInfo {
    pub role_name: String,
    pub role_level: i32,
    pub location_id: Option<i64>,
    pub location_name: Option<String>,
    pub is_primary_role: bool,
    pub is_primary_location: bool,
}

/// User with their role grants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWithRoles {
    #[serde(flatten)]
    pub user: User,
    pub roles: Vec<UserRoleInfo>,
}

/// Requested role grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role_name: String,
    pub location_id: Option<i64>,
    #[serde(default)]
    pub is_primary_role: bool,
    #[serde(default)]
    pub is_primary_location: bool,
}

/// Create staff user payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UserCreate {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
}

/// Update user profile payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
}

/// Replace role grants payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesUpdate {
    pub roles: Vec<RoleAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatusUpdate {
    pub status: UserStatus,
}
