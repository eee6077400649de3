//! mesa-cloud: multi-tenant restaurant platform backend
//!
//! REST API over PostgreSQL: restaurant registration and tenancy, locations,
//! staff users and roles, menus and orders. Every request passes through the
//! versioning, sanitization and rate-limit middleware.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod state;
pub mod tenant;
pub mod util;
pub mod validation;

pub use config::Config;
pub use state::AppState;
