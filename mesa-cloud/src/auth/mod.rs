//! Authentication and authorization

pub mod extractor;
pub mod jwt;
pub mod roles;

pub use extractor::{CurrentUser, require_auth};
pub use jwt::{Claims, JwtError, JwtService};
