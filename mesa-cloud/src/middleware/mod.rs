//! Request middleware chain

pub mod logging;
pub mod rate_limit;
pub mod redact;
pub mod sanitize;
pub mod version;

pub use logging::request_logging;
pub use redact::redact_error_detail;
pub use sanitize::{sanitize_input, sanitize_location_input, sanitize_restaurant_input};
pub use version::{ApiVersion, api_version};
