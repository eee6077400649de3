//! Database provisioning CLI
//!
//! Creates the database when missing, applies migrations, runs the seed
//! files and (when `SUPERADMIN_EMAIL` / `SUPERADMIN_PASSWORD` are set)
//! creates the platform superadmin.

use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::Parser;
use mesa_cloud::Config;
use mesa_cloud::db::setup;
use mesa_cloud::logger::init_logger;
use sqlx::postgres::PgPoolOptions;

const DEFAULT_SEEDS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/seeds");

#[derive(Debug, Parser)]
#[command(name = "setup-database", about = "Create, migrate and seed the mesa database")]
struct Cli {
    /// Environment to configure (development | test | production)
    #[arg(long = "env")]
    environment: Option<String>,

    /// Only apply migrations
    #[arg(long, conflicts_with = "seed_only")]
    migrations_only: bool,

    /// Only run seed files
    #[arg(long)]
    seed_only: bool,

    /// Directory holding `NNN_*.sql` seed files
    #[arg(long, default_value = DEFAULT_SEEDS_DIR)]
    seeds_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let environment = cli.environment.clone();
    let config = Config::from_lookup(|name| match (name, &environment) {
        ("ENVIRONMENT", Some(env)) => Some(env.clone()),
        _ => std::env::var(name).ok(),
    })
    .map_err(|e| anyhow!(e))
    .context("invalid configuration")?;
    init_logger(config.log_json);

    tracing::info!(environment = %config.environment, "Setting up database");

    setup::ensure_database(&config.database_url)
        .await
        .map_err(|e| anyhow!(e))
        .context("could not create database")?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("could not connect to database")?;

    if !cli.seed_only {
        setup::run_migrations(&pool)
            .await
            .map_err(|e| anyhow!(e))
            .context("migrations failed")?;
    }

    if !cli.migrations_only {
        let applied = setup::run_seeds(&pool, &cli.seeds_dir)
            .await
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("seeding from {} failed", cli.seeds_dir.display()))?;
        tracing::info!(files = applied, "Seeds applied");

        let email = std::env::var("SUPERADMIN_EMAIL").ok();
        let password = std::env::var("SUPERADMIN_PASSWORD").ok();
        if let (Some(email), Some(password)) = (email, password) {
            let created = setup::ensure_superadmin(&pool, &email, &password)
                .await
                .map_err(|e| anyhow!(e))
                .context("superadmin creation failed")?;
            if created {
                tracing::info!(email = %email, "Superadmin created");
            } else {
                tracing::info!(email = %email, "Superadmin already exists");
            }
        }
    }

    pool.close().await;
    tracing::info!("Database setup complete");
    Ok(())
}
