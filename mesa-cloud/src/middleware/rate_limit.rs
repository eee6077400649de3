//! Per-class request rate limiting
//!
//! Sliding-window logs keyed by (class, client IP). Counters live in process
//! memory; `cleanup` runs every 5 minutes from `main`.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::Environment;
use crate::security_log;
use crate::state::AppState;

const MINUTE: u64 = 60;

/// Endpoint class with its own budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitClass {
    General,
    Auth,
    RestaurantCreation,
    UserManagement,
    Upload,
    Search,
    PasswordChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub max_requests: usize,
    pub window: Duration,
}

impl RateLimitRule {
    const fn new(max_requests: usize, window_minutes: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_minutes * MINUTE),
        }
    }
}

impl RateLimitClass {
    pub const ALL: [RateLimitClass; 7] = [
        Self::General,
        Self::Auth,
        Self::RestaurantCreation,
        Self::UserManagement,
        Self::Upload,
        Self::Search,
        Self::PasswordChange,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Auth => "auth",
            Self::RestaurantCreation => "restaurant_creation",
            Self::UserManagement => "user_management",
            Self::Upload => "upload",
            Self::Search => "search",
            Self::PasswordChange => "password_change",
        }
    }

    /// Budget for the environment; non-production runs with the relaxed table
    pub fn rule(&self, environment: Environment) -> RateLimitRule {
        let prod = environment.is_production();
        match self {
            Self::General => RateLimitRule::new(if prod { 100 } else { 1000 }, 15),
            Self::Auth => RateLimitRule::new(if prod { 5 } else { 50 }, 15),
            Self::RestaurantCreation => RateLimitRule::new(if prod { 3 } else { 50 }, 60),
            Self::UserManagement => RateLimitRule::new(if prod { 30 } else { 300 }, 15),
            Self::Upload => RateLimitRule::new(if prod { 10 } else { 100 }, 15),
            Self::Search => RateLimitRule::new(if prod { 60 } else { 600 }, 1),
            Self::PasswordChange => RateLimitRule::new(if prod { 3 } else { 30 }, 60),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::General => "Too many requests from this IP, please try again later.",
            Self::Auth => "Too many authentication attempts, please try again later.",
            Self::RestaurantCreation => {
                "Too many restaurant registrations from this IP, please try again later."
            }
            Self::UserManagement => "Too many user management requests, please slow down.",
            Self::Upload => "Too many uploads, please try again later.",
            Self::Search => "Too many search requests, please slow down.",
            Self::PasswordChange => "Too many password change attempts, please try again later.",
        }
    }
}

#[derive(Clone, Default)]
pub struct RateLimiter {
    /// (class, IP) -> request instants inside the window, oldest first
    inner: Arc<Mutex<HashMap<(RateLimitClass, String), VecDeque<Instant>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request. `Err` carries the seconds until a slot frees up.
    pub async fn check(
        &self,
        class: RateLimitClass,
        ip: &str,
        rule: RateLimitRule,
    ) -> Result<(), u64> {
        self.check_at(class, ip, rule, Instant::now()).await
    }

    async fn check_at(
        &self,
        class: RateLimitClass,
        ip: &str,
        rule: RateLimitRule,
        now: Instant,
    ) -> Result<(), u64> {
        let mut map = self.inner.lock().await;
        let log = map.entry((class, ip.to_owned())).or_default();

        while let Some(&oldest) = log.front() {
            if now.duration_since(oldest) >= rule.window {
                log.pop_front();
            } else {
                break;
            }
        }

        if log.len() >= rule.max_requests {
            let retry_after = log
                .front()
                .map(|&oldest| rule.window.saturating_sub(now.duration_since(oldest)))
                .unwrap_or(rule.window);
            return Err(ceil_secs(retry_after).max(1));
        }

        log.push_back(now);
        Ok(())
    }

    /// Drop stamps that left their class window, then empty entries
    pub async fn cleanup(&self, environment: Environment) {
        self.cleanup_at(environment, Instant::now()).await;
    }

    async fn cleanup_at(&self, environment: Environment, now: Instant) {
        let mut map = self.inner.lock().await;
        for ((class, _), log) in map.iter_mut() {
            let window = class.rule(environment).window;
            log.retain(|&t| now.duration_since(t) < window);
        }
        map.retain(|_, log| !log.is_empty());
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.inner.lock().await.len()
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

/// Extract client IP: X-Forwarded-For header first (proxy), then peer address.
pub fn extract_ip(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
    {
        // X-Forwarded-For can be comma-separated; first entry is the original client
        if let Some(first) = val.split(',').next() {
            let ip = first.trim();
            if !ip.is_empty() {
                return ip.to_owned();
            }
        }
    }

    request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

fn too_many_requests(class: RateLimitClass, retry_after: u64) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        axum::Json(serde_json::json!({
            "error": "Too many requests",
            "message": class.message(),
            "retryAfter": retry_after,
        })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(http::header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

async fn enforce(
    state: &AppState,
    class: RateLimitClass,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_ip(&request);
    let rule = class.rule(state.config.environment);
    if let Err(retry_after) = state.rate_limiter.check(class, &ip, rule).await {
        security_log!(
            WARN,
            "rate_limited",
            class = class.name(),
            ip = %ip,
            path = %request.uri().path(),
            retry_after = retry_after
        );
        return Err(too_many_requests(class, retry_after));
    }
    Ok(next.run(request).await)
}

/// General API budget (every `/api` route group)
pub async fn general_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    enforce(&state, RateLimitClass::General, request, next).await
}

/// Login and sign-up
pub async fn auth_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    enforce(&state, RateLimitClass::Auth, request, next).await
}

/// Restaurant registration
pub async fn restaurant_creation_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    enforce(&state, RateLimitClass::RestaurantCreation, request, next).await
}

/// User administration endpoints
pub async fn user_management_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    enforce(&state, RateLimitClass::UserManagement, request, next).await
}

/// Slug availability and public menu lookups
pub async fn search_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    enforce(&state, RateLimitClass::Search, request, next).await
}

pub async fn password_change_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    enforce(&state, RateLimitClass::PasswordChange, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_table() {
        let prod = Environment::Production;
        let dev = Environment::Development;
        assert_eq!(RateLimitClass::Auth.rule(prod).max_requests, 5);
        assert_eq!(RateLimitClass::Auth.rule(dev).max_requests, 50);
        assert_eq!(RateLimitClass::Auth.rule(prod).window, Duration::from_secs(900));
        assert_eq!(RateLimitClass::General.rule(prod).max_requests, 100);
        assert_eq!(
            RateLimitClass::RestaurantCreation.rule(prod).window,
            Duration::from_secs(3600)
        );
        assert_eq!(RateLimitClass::Search.rule(prod).window, Duration::from_secs(60));
        assert_eq!(RateLimitClass::Search.rule(dev).max_requests, 600);
        assert_eq!(RateLimitClass::PasswordChange.rule(prod).max_requests, 3);
        assert_eq!(RateLimitClass::Upload.rule(Environment::Test).max_requests, 100);
    }

    #[tokio::test]
    async fn test_limit_then_reject_for_every_class() {
        for class in RateLimitClass::ALL {
            let limiter = RateLimiter::new();
            let rule = class.rule(Environment::Production);
            let start = Instant::now();
            for _ in 0..rule.max_requests {
                assert!(limiter.check_at(class, "10.0.0.1", rule, start).await.is_ok());
            }
            let retry = limiter
                .check_at(class, "10.0.0.1", rule, start)
                .await
                .unwrap_err();
            assert!(retry >= 1);
            assert_eq!(retry, rule.window.as_secs());
        }
    }

    #[tokio::test]
    async fn test_window_slides() {
        let limiter = RateLimiter::new();
        let rule = RateLimitRule::new(2, 1);
        let t0 = Instant::now();

        assert!(limiter.check_at(RateLimitClass::Search, "ip", rule, t0).await.is_ok());
        let t1 = t0 + Duration::from_secs(30);
        assert!(limiter.check_at(RateLimitClass::Search, "ip", rule, t1).await.is_ok());

        let t2 = t0 + Duration::from_secs(45);
        assert_eq!(
            limiter.check_at(RateLimitClass::Search, "ip", rule, t2).await,
            Err(15)
        );

        // first stamp has left the window
        let t3 = t0 + Duration::from_secs(60);
        assert!(limiter.check_at(RateLimitClass::Search, "ip", rule, t3).await.is_ok());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = RateLimiter::new();
        let rule = RateLimitRule::new(1, 15);
        let now = Instant::now();
        assert!(limiter.check_at(RateLimitClass::Auth, "a", rule, now).await.is_ok());
        assert!(limiter.check_at(RateLimitClass::Auth, "b", rule, now).await.is_ok());
        assert!(limiter.check_at(RateLimitClass::General, "a", rule, now).await.is_ok());
        assert!(limiter.check_at(RateLimitClass::Auth, "a", rule, now).await.is_err());
    }

    #[tokio::test]
    async fn test_cleanup_evicts_idle_entries() {
        let limiter = RateLimiter::new();
        let env = Environment::Production;
        let now = Instant::now();
        let search = RateLimitClass::Search.rule(env);
        let auth = RateLimitClass::Auth.rule(env);
        limiter.check_at(RateLimitClass::Search, "a", search, now).await.unwrap();
        limiter.check_at(RateLimitClass::Auth, "a", auth, now).await.unwrap();
        assert_eq!(limiter.tracked_keys().await, 2);

        limiter.cleanup_at(env, now + Duration::from_secs(120)).await;
        assert_eq!(limiter.tracked_keys().await, 1);

        limiter.cleanup_at(env, now + Duration::from_secs(900)).await;
        assert_eq!(limiter.tracked_keys().await, 0);
    }

    #[test]
    fn test_extract_ip_prefers_forwarded_for() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_ip(&request), "203.0.113.9");

        let request = Request::builder().body(axum::body::Body::empty()).unwrap();
        assert_eq!(extract_ip(&request), "unknown");
    }

    #[tokio::test]
    async fn test_429_shape() {
        let response = too_many_requests(RateLimitClass::Auth, 42);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[http::header::RETRY_AFTER], "42");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Too many requests");
        assert_eq!(body["retryAfter"], 42);
        assert_eq!(body["message"], RateLimitClass::Auth.message());
    }
}
