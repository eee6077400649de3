//! Database provisioning: create, migrate, seed

use std::path::Path;
use std::str::FromStr;

use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, Connection, PgPool};

use super::BoxError;
use crate::auth::roles::SUPERADMIN;
use crate::util::{hash_password, now_millis};

/// Create the target database when it does not exist yet
pub async fn ensure_database(database_url: &str) -> Result<(), BoxError> {
    let options = PgConnectOptions::from_str(database_url)?;
    let name = options
        .get_database()
        .ok_or("DATABASE_URL does not name a database")?
        .to_string();

    let mut conn = options.clone().database("postgres").connect().await?;
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&name)
            .fetch_one(&mut conn)
            .await?;

    if exists {
        tracing::info!(database = %name, "Database already exists");
    } else {
        let quoted = name.replace('"', "\"\"");
        sqlx::raw_sql(&format!("CREATE DATABASE \"{quoted}\""))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %name, "Database created");
    }

    conn.close().await?;
    Ok(())
}

/// Apply pending migrations from `migrations/`
pub async fn run_migrations(pool: &PgPool) -> Result<(), BoxError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Migrations applied");
    Ok(())
}

/// Execute every `.sql` file in `dir`, in file-name order
pub async fn run_seeds(pool: &PgPool, dir: &Path) -> Result<usize, BoxError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "sql") {
            files.push(path);
        }
    }
    files.sort();

    for path in &files {
        let sql = tokio::fs::read_to_string(path).await?;
        sqlx::raw_sql(&sql).execute(pool).await?;
        tracing::info!(file = %path.display(), "Seed applied");
    }
    Ok(files.len())
}

/// Create the platform superadmin if the email is not taken yet
pub async fn ensure_superadmin(
    pool: &PgPool,
    email: &str,
    password: &str,
) -> Result<bool, BoxError> {
    let hash = hash_password(password).map_err(|e| format!("password hashing failed: {e}"))?;
    let now = now_millis();

    let mut tx = pool.begin().await?;
    let user_id: Option<i64> = sqlx::query_scalar(
        "INSERT INTO users
             (email, password_hash, first_name, last_name, status, created_at, updated_at)
         VALUES ($1, $2, 'Platform', 'Admin', 'active', $3, $3)
         ON CONFLICT (email) DO NOTHING
         RETURNING id",
    )
    .bind(email.trim().to_ascii_lowercase())
    .bind(&hash)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(user_id) = user_id else {
        tx.rollback().await?;
        return Ok(false);
    };

    sqlx::query(
        "INSERT INTO user_roles
             (user_id, role_id, location_id, is_primary_role, is_primary_location, created_at)
         SELECT $1, id, NULL, TRUE, FALSE, $2 FROM roles WHERE name = $3",
    )
    .bind(user_id)
    .bind(now)
    .bind(SUPERADMIN)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}
