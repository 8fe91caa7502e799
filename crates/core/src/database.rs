//! Shared PostgreSQL connection pool

use crate::config::DatabaseConfig;
use crate::error::MarqueeError;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

/// Shared database connection pool
#[derive(Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Connect using the given settings
    ///
    /// Connection failures surface as `StoreUnavailable` so startup can refuse
    /// to report ready.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, MarqueeError> {
        info!(
            max_connections = config.max_connections,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .idle_timeout(Some(config.idle_timeout))
            .acquire_timeout(config.connect_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| MarqueeError::store_unavailable(e.to_string(), "connect"))?;

        info!("Database connection pool established");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
