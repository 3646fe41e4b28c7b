pub mod registrations;

pub use registrations::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Create a database connection pool, creating the file if needed
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    tracing::info!("Creating registrations table...");
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS registrations (
            id BLOB PRIMARY KEY,
            replica_id TEXT NOT NULL,
            name TEXT NOT NULL,
            owner TEXT NOT NULL,
            transaction_hash TEXT NOT NULL,
            price_wei TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'registered',
            registered_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    tracing::info!("Creating indices for registrations...");
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_registrations_replica ON registrations(replica_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_registrations_name ON registrations(name)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_registrations_owner ON registrations(owner)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed");
    Ok(())
}
