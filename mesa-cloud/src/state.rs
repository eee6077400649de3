//! Application state for mesa-cloud

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::auth::JwtService;
use crate::config::Config;
use crate::middleware::rate_limit::RateLimiter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    pub config: Arc<Config>,
    /// Signs and verifies user tokens
    pub jwt: JwtService,
    /// Per-class request counters
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Connect, apply pending migrations and build the state
    pub async fn new(config: Config) -> Result<Self, BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&config.database_url)
            .await?;

        crate::db::setup::run_migrations(&pool).await?;

        Ok(Self::with_pool(pool, config))
    }

    /// Build from an existing pool (tests use a lazily-connected one)
    pub fn with_pool(pool: PgPool, config: Config) -> Self {
        Self {
            pool,
            jwt: JwtService::new(&config.jwt_secret),
            config: Arc::new(config),
            rate_limiter: RateLimiter::new(),
        }
    }
}
