//! Unified error codes for the Mesa platform
//!
//! This module defines all error codes used across mesa-cloud, mesa-client
//! and any frontend consuming the API. Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Restaurant / tenant errors
//! - 4xxx: Order errors
//! - 6xxx: Menu errors
//! - 7xxx: Request pipeline errors (versioning, rate limiting)
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,
    /// Unique / foreign-key constraint rejected the write
    ConstraintViolation = 9,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account is disabled
    AccountDisabled = 1007,
    /// Password too short
    PasswordTooShort = 1008,
    /// Current password did not match
    PasswordMismatch = 1009,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Specific role required
    RoleRequired = 2002,
    /// Caller may not grant the requested role
    RoleAssignmentForbidden = 2006,
    /// Caller has no authority over the requested location
    LocationScopeDenied = 2007,

    // ==================== 3xxx: Restaurant ====================
    /// Caller is not attached to a restaurant
    RestaurantNotSelected = 3001,
    /// Restaurant not found
    RestaurantNotFound = 3002,
    /// Restaurant URL slug already taken
    RestaurantUrlTaken = 3003,
    /// Restaurant URL slug malformed or reserved
    RestaurantUrlInvalid = 3004,
    /// Restaurant is not active
    RestaurantInactive = 3005,
    /// Email confirmation token invalid
    ConfirmationTokenInvalid = 3013,
    /// Email confirmation token expired
    ConfirmationTokenExpired = 3014,
    /// Email already registered
    EmailTaken = 3016,
    /// Location not found
    LocationNotFound = 3101,
    /// Exactly one primary location is required
    PrimaryLocationRequired = 3102,
    /// Primary location cannot be deactivated
    CannotDeactivatePrimaryLocation = 3103,
    /// Operating hours malformed
    InvalidOperatingHours = 3104,
    /// Unknown feature flag
    UnknownFeature = 3105,
    /// Raw card number submitted instead of a token
    RawCardNumberRejected = 3201,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has no items
    OrderEmpty = 4007,
    /// Status change not allowed from current status
    InvalidStatusTransition = 4008,
    /// Ordered menu item is unavailable
    MenuItemUnavailable = 4009,

    // ==================== 6xxx: Menu ====================
    /// Menu item not found
    MenuItemNotFound = 6001,
    /// Menu item has invalid price
    MenuItemInvalidPrice = 6002,
    /// Category not found
    CategoryNotFound = 6101,
    /// Category name already exists
    CategoryNameExists = 6103,
    /// Same language supplied twice for one item
    DuplicateTranslation = 6201,

    // ==================== 7xxx: Request pipeline ====================
    /// Requested API version is not supported
    UnsupportedApiVersion = 7001,
    /// Rate limit exceeded
    RateLimited = 7002,
    /// Request body too large
    PayloadTooLarge = 7003,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",
            ErrorCode::ConstraintViolation => "A record with this information already exists or a referenced record is missing",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::InvalidCredentials => "Invalid email or password",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::AccountDisabled => "Account is disabled",
            ErrorCode::PasswordTooShort => "Password must be at least 8 characters",
            ErrorCode::PasswordMismatch => "Current password is incorrect",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::RoleRequired => "Specific role is required",
            ErrorCode::RoleAssignmentForbidden => "You are not allowed to assign this role",
            ErrorCode::LocationScopeDenied => "You have no authority over this location",

            // Restaurant
            ErrorCode::RestaurantNotSelected => "No restaurant associated with this account",
            ErrorCode::RestaurantNotFound => "Restaurant not found",
            ErrorCode::RestaurantUrlTaken => "Restaurant URL is already taken",
            ErrorCode::RestaurantUrlInvalid => "Restaurant URL is invalid",
            ErrorCode::RestaurantInactive => "Restaurant is not active",
            ErrorCode::ConfirmationTokenInvalid => "Invalid confirmation token",
            ErrorCode::ConfirmationTokenExpired => "Confirmation token has expired",
            ErrorCode::EmailTaken => "Email already registered",
            ErrorCode::LocationNotFound => "Location not found",
            ErrorCode::PrimaryLocationRequired => "Exactly one primary location is required",
            ErrorCode::CannotDeactivatePrimaryLocation => "The primary location cannot be deactivated",
            ErrorCode::InvalidOperatingHours => "Operating hours are invalid",
            ErrorCode::UnknownFeature => "Unknown feature",
            ErrorCode::RawCardNumberRejected => "Card numbers must be tokenized before submission",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderEmpty => "Order is empty",
            ErrorCode::InvalidStatusTransition => "Order status change is not allowed",
            ErrorCode::MenuItemUnavailable => "Menu item is not available",

            // Menu
            ErrorCode::MenuItemNotFound => "Menu item not found",
            ErrorCode::MenuItemInvalidPrice => "Menu item has invalid price",
            ErrorCode::CategoryNotFound => "Category not found",
            ErrorCode::CategoryNameExists => "Category name already exists",
            ErrorCode::DuplicateTranslation => "Duplicate translation language",

            // Request pipeline
            ErrorCode::UnsupportedApiVersion => "Unsupported API version",
            ErrorCode::RateLimited => "Too many requests",
            ErrorCode::PayloadTooLarge => "Request body too large",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),
            9 => Ok(ErrorCode::ConstraintViolation),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1007 => Ok(ErrorCode::AccountDisabled),
            1008 => Ok(ErrorCode::PasswordTooShort),
            1009 => Ok(ErrorCode::PasswordMismatch),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RoleRequired),
            2006 => Ok(ErrorCode::RoleAssignmentForbidden),
            2007 => Ok(ErrorCode::LocationScopeDenied),

            // Restaurant
            3001 => Ok(ErrorCode::RestaurantNotSelected),
            3002 => Ok(ErrorCode::RestaurantNotFound),
            3003 => Ok(ErrorCode::RestaurantUrlTaken),
            3004 => Ok(ErrorCode::RestaurantUrlInvalid),
            3005 => Ok(ErrorCode::RestaurantInactive),
            3013 => Ok(ErrorCode::ConfirmationTokenInvalid),
            3014 => Ok(ErrorCode::ConfirmationTokenExpired),
            3016 => Ok(ErrorCode::EmailTaken),
            3101 => Ok(ErrorCode::LocationNotFound),
            3102 => Ok(ErrorCode::PrimaryLocationRequired),
            3103 => Ok(ErrorCode::CannotDeactivatePrimaryLocation),
            3104 => Ok(ErrorCode::InvalidOperatingHours),
            3105 => Ok(ErrorCode::UnknownFeature),
            3201 => Ok(ErrorCode::RawCardNumberRejected),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4007 => Ok(ErrorCode::OrderEmpty),
            4008 => Ok(ErrorCode::InvalidStatusTransition),
            4009 => Ok(ErrorCode::MenuItemUnavailable),

            // Menu
            6001 => Ok(ErrorCode::MenuItemNotFound),
            6002 => Ok(ErrorCode::MenuItemInvalidPrice),
            6101 => Ok(ErrorCode::CategoryNotFound),
            6103 => Ok(ErrorCode::CategoryNameExists),
            6201 => Ok(ErrorCode::DuplicateTranslation),

            // Request pipeline
            7001 => Ok(ErrorCode::UnsupportedApiVersion),
            7002 => Ok(ErrorCode::RateLimited),
            7003 => Ok(ErrorCode::PayloadTooLarge),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}
