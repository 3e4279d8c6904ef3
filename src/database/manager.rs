use sqlx::{postgres::PgPoolOptions, PgPool};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::config;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Centralized connection pool manager. Pools are created lazily from
/// DATABASE_URL and cached by database name.
pub struct DatabaseManager {
    pools: Arc<RwLock<HashMap<String, PgPool>>>,
}

impl DatabaseManager {
    fn instance() -> &'static DatabaseManager {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<DatabaseManager> = OnceLock::new();
        INSTANCE.get_or_init(|| DatabaseManager {
            pools: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Name of the application database when GANTRY_DB is unset.
    const DEFAULT_DB_NAME: &'static str = "gantry_main";

    /// Get the application database pool. The database name comes from
    /// GANTRY_DB, falling back to the name baked into DATABASE_URL's path
    /// or the default.
    pub async fn app_pool() -> Result<PgPool, DatabaseError> {
        let name = std::env::var("GANTRY_DB").unwrap_or_else(|_| Self::DEFAULT_DB_NAME.to_string());
        Self::instance().get_pool(&name).await
    }

    /// Get a pool for an explicit connection URL, bypassing the
    /// DATABASE_URL rewrite. Used by the CLI --database-url override.
    pub async fn pool_for_url(url: &str) -> Result<PgPool, DatabaseError> {
        Self::instance().get_pool_for(url.to_string(), url).await
    }

    /// Get existing pool or create a new one lazily
    async fn get_pool(&self, database_name: &str) -> Result<PgPool, DatabaseError> {
        let connection_string = Self::build_connection_string(database_name)?;
        self.get_pool_for(database_name.to_string(), &connection_string).await
    }

    async fn get_pool_for(&self, key: String, connection_string: &str) -> Result<PgPool, DatabaseError> {
        // Fast path: try read lock
        {
            let pools = self.pools.read().await;
            if let Some(pool) = pools.get(&key) {
                return Ok(pool.clone());
            }
        }

        let db_config = &config::config().database;
        let pool = PgPoolOptions::new()
            .max_connections(db_config.max_connections)
            .acquire_timeout(Duration::from_secs(db_config.connection_timeout))
            .connect(connection_string)
            .await?;

        // Store in cache
        {
            let mut pools = self.pools.write().await;
            pools.insert(key.clone(), pool.clone());
        }

        info!("Created database pool for: {}", key);
        Ok(pool)
    }

    /// Build a connection string by swapping the database name into the
    /// DATABASE_URL path.
    fn build_connection_string(database_name: &str) -> Result<String, DatabaseError> {
        let base = std::env::var("DATABASE_URL")
            .map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let mut url = url::Url::parse(&base).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        // Replace the path to the database name (ensure leading slash)
        url.set_path(&format!("/{}", database_name));
        Ok(url.as_str().to_string())
    }

    /// Pings the application pool to ensure connectivity
    pub async fn health_check() -> Result<(), DatabaseError> {
        let pool = Self::app_pool().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }
}
