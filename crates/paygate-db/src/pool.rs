//! PostgreSQL connection pool
//!
//! The pool is built once at startup from [`DatabaseConfig`] and handed to
//! the HTTP layer as shared state. Creation runs a `SELECT 1` round trip so
//! bad credentials or an unreachable host fail the boot instead of the
//! first request.

use paygate_core::{config::DatabaseConfig, AppError, AppResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{info, warn};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Create the connection pool for the billing database
pub async fn create_pool(config: &DatabaseConfig) -> AppResult<PgPool> {
    info!(
        "Creating database pool ({}-{} connections)",
        config.min_connections, config.max_connections
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .idle_timeout(Some(IDLE_TIMEOUT))
        .test_before_acquire(true)
        .connect(&config.url)
        .await
        .map_err(|e| {
            warn!("Failed to create database pool: {}", e);
            AppError::Pool(format!("Failed to connect to database: {}", e))
        })?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(|e| AppError::Database(format!("Database health check failed: {}", e)))?;

    info!("Database connection verified");

    Ok(pool)
}

/// Pool settings for the `#[ignore]`d database tests, read from DATABASE_URL
#[cfg(test)]
pub(crate) fn test_database_config() -> DatabaseConfig {
    DatabaseConfig {
        url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/paygate_billing".to_string()),
        max_connections: 2,
        min_connections: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_create_pool() {
        let pool = create_pool(&test_database_config()).await.unwrap();
        let row: (i32,) = sqlx::query_as("SELECT 2")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.0, 2);
    }
}
