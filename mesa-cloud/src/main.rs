//! mesa-cloud server entry point

use std::net::SocketAddr;
use std::time::Duration;

use mesa_cloud::logger::init_logger;
use mesa_cloud::{AppState, Config, api};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    init_logger(config.log_json);

    tracing::info!(
        environment = %config.environment,
        port = config.http_port,
        "Starting mesa-cloud"
    );

    let state = AppState::new(config.clone()).await?;

    // Periodic rate limiter cleanup
    let rate_limiter = state.rate_limiter.clone();
    let environment = config.environment;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            rate_limiter.cleanup(environment).await;
        }
    });

    let app = api::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("mesa-cloud HTTP listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("mesa-cloud stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
