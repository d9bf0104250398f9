//! Postgres pool wrapper.

use std::time::Duration;

use engine_core::{Error, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, error, info};

use crate::config::PostgresConfig;

/// Shared Postgres store; implements the entity store, ledger store, and
/// statistics sink contracts over one pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects a new pool.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| Error::source(format!("Postgres connect error: {}", e)))?;

        info!(pool_size = config.pool_size, "Connected Postgres store");

        Ok(Self { pool })
    }

    /// Wraps an existing pool (used by integration tests).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check connectivity with a trivial query.
    pub async fn check_connection(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => {
                debug!("Entity store connection healthy");
                true
            }
            Err(e) => {
                error!(error = %e, "Entity store connection check failed");
                false
            }
        }
    }

    /// Closes the pool. Safe to call on any exit path.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Postgres pool closed");
    }
}
