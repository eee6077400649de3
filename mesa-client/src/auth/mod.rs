//! Client auth state
//!
//! Tokens live in a persistent store when the user asked to be remembered,
//! otherwise in a session-only store; the choice itself is persisted so a
//! restart knows where to look.

pub mod session;
pub mod store;

pub use session::{AuthApi, AuthSession, AuthState, AuthStatus};
pub use store::{AuthStorage, FileTokenStore, MemoryTokenStore, TokenStore};
