//! Auth session: login, rehydration and logout

use async_trait::async_trait;
use shared::models::{AuthResponse, UserWithRoles};

use super::store::AuthStorage;
use crate::{ClientResult, HttpClient};

/// Server calls the session depends on
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> ClientResult<AuthResponse>;
    /// Profile behind `token`; fails when the token is no longer accepted
    async fn me(&self, token: &str) -> ClientResult<UserWithRoles>;
}

#[async_trait]
impl AuthApi for HttpClient {
    async fn login(&self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        HttpClient::login(self, email, password).await
    }

    async fn me(&self, token: &str) -> ClientResult<UserWithRoles> {
        self.with_token(token).me().await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthStatus {
    #[default]
    Idle,
    Loading,
    Authenticated,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub status: AuthStatus,
    pub user: Option<UserWithRoles>,
    pub token: Option<String>,
    pub error: Option<String>,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated
    }
}

pub struct AuthSession<A: AuthApi> {
    api: A,
    storage: AuthStorage,
    state: AuthState,
}

impl<A: AuthApi> AuthSession<A> {
    pub fn new(api: A, storage: AuthStorage) -> Self {
        Self {
            api,
            storage,
            state: AuthState::default(),
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Authenticate and keep the token according to `remember_me`
    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> ClientResult<&UserWithRoles> {
        self.state.status = AuthStatus::Loading;
        self.state.error = None;

        let response = match self.api.login(email, password).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(error = %e, "Login failed");
                self.state = AuthState {
                    status: AuthStatus::Failed,
                    error: Some(e.to_string()),
                    ..AuthState::default()
                };
                return Err(e);
            }
        };

        self.storage.store(&response.token, remember_me)?;
        tracing::debug!(user_id = response.user.user.id, remember_me, "Logged in");
        self.authenticated(response.token, response.user)
    }

    /// Restore the session from stored credentials.
    ///
    /// `Ok(false)` when nothing is stored or the server rejected the token;
    /// in the latter case every store is wiped and the error kept in state.
    pub async fn rehydrate(&mut self) -> ClientResult<bool> {
        let Some(token) = self.storage.load()? else {
            self.state = AuthState::default();
            return Ok(false);
        };

        self.state.status = AuthStatus::Loading;
        match self.api.me(&token).await {
            Ok(user) => {
                self.authenticated(token, user)?;
                Ok(true)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Stored token rejected");
                self.storage.clear_all()?;
                self.state = AuthState {
                    error: Some(e.to_string()),
                    ..AuthState::default()
                };
                Ok(false)
            }
        }
    }

    /// Forget the token everywhere
    pub fn logout(&mut self) -> ClientResult<()> {
        self.storage.clear_all()?;
        self.state = AuthState::default();
        Ok(())
    }

    fn authenticated(&mut self, token: String, user: UserWithRoles) -> ClientResult<&UserWithRoles> {
        self.state = AuthState {
            status: AuthStatus::Authenticated,
            user: Some(user),
            token: Some(token),
            error: None,
        };
        self.state
            .user
            .as_ref()
            .ok_or_else(|| crate::ClientError::InvalidResponse("missing user".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientError;
    use shared::error::{AppError, ErrorCode};
    use shared::models::{User, UserStatus};

    const GOOD_TOKEN: &str = "good-token";

    struct FakeApi;

    fn user() -> UserWithRoles {
        UserWithRoles {
            user: User {
                id: 42,
                restaurant_id: Some(1),
                email: "ana@example.com".into(),
                first_name: "Ana".into(),
                last_name: "Lopez".into(),
                phone: None,
                status: UserStatus::Active,
                created_at: 0,
                updated_at: 0,
            },
            roles: vec![],
        }
    }

    #[async_trait]
    impl AuthApi for FakeApi {
        async fn login(&self, _email: &str, password: &str) -> ClientResult<AuthResponse> {
            if password == "right" {
                Ok(AuthResponse {
                    token: GOOD_TOKEN.into(),
                    user: user(),
                })
            } else {
                Err(ClientError::Api(AppError::invalid_credentials()))
            }
        }

        async fn me(&self, token: &str) -> ClientResult<UserWithRoles> {
            if token == GOOD_TOKEN {
                Ok(user())
            } else {
                Err(ClientError::Api(AppError::new(ErrorCode::TokenInvalid)))
            }
        }
    }

    fn session(dir: &std::path::Path) -> AuthSession<FakeApi> {
        AuthSession::new(FakeApi, AuthStorage::in_dir(dir))
    }

    #[tokio::test]
    async fn test_login_then_rehydrate_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = session(dir.path());
        first.login("ana@example.com", "right", true).await.unwrap();
        assert!(first.state().is_authenticated());

        let mut restarted = session(dir.path());
        assert_eq!(restarted.state().status, AuthStatus::Idle);
        assert!(restarted.rehydrate().await.unwrap());
        assert_eq!(restarted.state().token.as_deref(), Some(GOOD_TOKEN));
        assert_eq!(restarted.state().user.as_ref().map(|u| u.user.id), Some(42));
    }

    #[tokio::test]
    async fn test_session_only_login_does_not_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = session(dir.path());
        first.login("ana@example.com", "right", false).await.unwrap();
        // Same process: still there
        assert!(first.rehydrate().await.unwrap());

        let mut restarted = session(dir.path());
        assert!(!restarted.rehydrate().await.unwrap());
        assert_eq!(restarted.state().error, None);
    }

    #[tokio::test]
    async fn test_failed_login_records_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());
        let err = session
            .login("ana@example.com", "wrong", true)
            .await
            .unwrap_err();

        assert_eq!(err.code(), Some(ErrorCode::InvalidCredentials));
        assert_eq!(session.state().status, AuthStatus::Failed);
        assert!(session.state().error.is_some());
        assert!(session.state().token.is_none());
    }

    #[tokio::test]
    async fn test_rejected_token_clears_all_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AuthStorage::in_dir(dir.path());
        storage.store("expired-token", true).unwrap();

        let mut session = AuthSession::new(FakeApi, storage.clone());
        assert!(!session.rehydrate().await.unwrap());

        assert_eq!(session.state().status, AuthStatus::Idle);
        assert!(session.state().error.is_some());
        assert_eq!(storage.load().unwrap(), None);
        assert!(!storage.remember_me().unwrap());
    }

    #[tokio::test]
    async fn test_logout_clears_state_and_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());
        session.login("ana@example.com", "right", true).await.unwrap();
        session.logout().unwrap();

        assert_eq!(session.state().status, AuthStatus::Idle);
        assert!(session.state().user.is_none());
        assert!(!session.rehydrate().await.unwrap());
    }
}
