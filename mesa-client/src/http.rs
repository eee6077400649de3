//! HTTP client for the mesa-cloud REST API

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::error::ApiResponse;
use shared::models::{
    AuthResponse, LoginRequest, OrderCreate, OrderDetail, PublicMenu, PublicRestaurant,
    RegistrationRequest, RegistrationResponse, UrlAvailability, UserWithRoles,
};

use crate::{ClientConfig, ClientError, ClientResult};

/// Body of a 429 from the rate limiter
#[derive(serde::Deserialize)]
struct RateLimitBody {
    #[serde(rename = "retryAfter")]
    retry_after: u64,
}

/// HTTP client for making network requests to mesa-cloud
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Copy of this client carrying `token`
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ClientResult<T> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send(self.client.get(self.url(path))).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send(self.client.post(self.url(path))).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send(self.client.put(self.url(path)).json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send(self.client.delete(self.url(path))).await
    }

    /// Map non-2xx responses onto [`ClientError`]
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            if status == StatusCode::TOO_MANY_REQUESTS
                && let Ok(body) = serde_json::from_str::<RateLimitBody>(&text)
            {
                return Err(ClientError::RateLimited {
                    retry_after: body.retry_after,
                });
            }
            return match serde_json::from_str::<ApiResponse<serde_json::Value>>(&text)
                .ok()
                .and_then(ApiResponse::into_error)
            {
                Some(err) => Err(ClientError::Api(err)),
                None => Err(ClientError::InvalidResponse(format!("{status}: {text}"))),
            };
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::debug!(error = %e, "Unexpected response body");
            ClientError::InvalidResponse(e.to_string())
        })
    }

    // ========== Auth API ==========

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post("auth/login", &request).await
    }

    /// Profile behind the current token
    pub async fn me(&self) -> ClientResult<UserWithRoles> {
        self.get("auth/me").await
    }

    // ========== Restaurant API ==========

    pub async fn register_restaurant(
        &self,
        request: &RegistrationRequest,
    ) -> ClientResult<RegistrationResponse> {
        self.post("restaurants/register", request).await
    }

    pub async fn check_url(&self, slug: &str) -> ClientResult<UrlAvailability> {
        self.get(&format!("restaurants/check-url/{slug}")).await
    }

    pub async fn restaurant_by_slug(&self, slug: &str) -> ClientResult<PublicRestaurant> {
        self.get(&format!("restaurants/by-slug/{slug}")).await
    }

    pub async fn public_menu(&self, slug: &str) -> ClientResult<PublicMenu> {
        self.get(&format!("menu/public/{slug}")).await
    }

    // ========== Order API ==========

    pub async fn place_order(&self, order: &OrderCreate) -> ClientResult<OrderDetail> {
        self.post("orders", order).await
    }
}
