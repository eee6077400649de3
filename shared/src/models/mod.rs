//! Data models
//!
//! Shared between mesa-cloud and mesa-client (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (PostgreSQL BIGSERIAL), timestamps are Unix millis.

pub mod auth;
pub mod location;
pub mod menu;
pub mod order;
pub mod restaurant;
pub mod user;

// Re-exports
pub use auth::*;
pub use location::*;
pub use menu::*;
pub use order::*;
pub use restaurant::*;
pub use user::*;
