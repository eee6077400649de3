//! Mesa Client - typed HTTP client for the mesa-cloud API
//!
//! Also carries the client-side state a front end needs: the auth session
//! (login, rehydration, logout with remember-me persistence) and the cart.

pub mod auth;
pub mod cart;
pub mod config;
pub mod error;
pub mod http;
pub mod storage;

pub use auth::{AuthSession, AuthState, AuthStatus, AuthStorage};
pub use cart::{Cart, CartLine};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::HttpClient;
pub use storage::JsonFile;
