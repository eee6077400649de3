//! Database access layer
//!
//! Parameterized SQL against PostgreSQL. Multi-statement writes run inside a
//! single transaction on one pooled connection.

pub mod locations;
pub mod menu_categories;
pub mod menu_items;
pub mod orders;
pub mod restaurants;
pub mod roles;
pub mod setup;
pub mod users;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
