//! Shared types for the Mesa platform
//!
//! Error system, domain DTOs and small utilities used by both the
//! server (`mesa-cloud`) and the client library (`mesa-client`).

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
