//! Database connection and management module
//!
//! This module provides connection pooling, configuration and the embedded
//! schema migrations for the PostgreSQL catalog backend.

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::{info, warn};

pub mod pg_store;

pub use pg_store::PgCatalogStore;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let max_connections = match std::env::var("DATABASE_POOL_SIZE") {
            Err(_) => 10,
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("Ignoring invalid DATABASE_POOL_SIZE='{}', using 10", raw);
                10
            }),
        };

        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost:5432/pokemon".to_string()),
            max_connections,
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)), // 10 minutes
            max_lifetime: Some(Duration::from_secs(1800)), // 30 minutes
        }
    }
}

/// Database connection manager
pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    /// Create a new database manager with the given configuration
    pub async fn new(config: DatabaseConfig) -> Result<Self, sqlx::Error> {
        info!(
            "Connecting to database: {}",
            mask_database_url(&config.database_url)
        );

        let mut pool_options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connection_timeout);

        if let Some(idle_timeout) = config.idle_timeout {
            pool_options = pool_options.idle_timeout(idle_timeout);
        }

        if let Some(max_lifetime) = config.max_lifetime {
            pool_options = pool_options.max_lifetime(max_lifetime);
        }

        let pool = pool_options
            .connect(&config.database_url)
            .await
            .map_err(|e| {
                warn!("Failed to connect to database: {}", e);
                e
            })?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    /// Catalog store sharing this pool
    pub fn catalog_store(&self) -> PgCatalogStore {
        PgCatalogStore::new(self.pool.clone())
    }

    /// Round-trip a trivial query before anything else touches the schema
    pub async fn test_connection(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
    }

    /// Apply the embedded catalog migrations
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database schema up to date");
        Ok(())
    }

    /// Drain and close the pool
    pub async fn close(self) {
        info!("Closing catalog database pool");
        self.pool.close().await;
    }
}

/// Mask sensitive information in database URL for logging
pub fn mask_database_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let mut masked = parsed.clone();
        if parsed.password().is_some() {
            let _ = masked.set_password(Some("***"));
        }
        masked.to_string()
    } else if url.len() > 20 {
        // Unparseable: keep only the ends
        let head: String = url.chars().take(10).collect();
        let tail: String = url
            .chars()
            .rev()
            .take(10)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{}***{}", head, tail)
    } else {
        "***".to_string()
    }
}
