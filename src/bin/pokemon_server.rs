//! pokemon_server, the REST server for the Pokémon catalog.
//!
//! Reads config from env vars (a `.env` file is honoured):
//!   DATABASE_URL         : Postgres connection string
//!   DATABASE_POOL_SIZE   : pool size (default: 10)
//!   POKEMON_BIND_ADDR    : listen address (default: 0.0.0.0:8000)
//!   POKEMON_STORE        : `postgres` (default) or `memory`
//!   POKEAPI_BASE_URL     : provider root (default: https://pokeapi.co/api/v2)
//!   POKEAPI_TIMEOUT_SECS : provider timeout (default: 10)

use std::sync::Arc;

use anyhow::Context;
use pokemon_catalog::api::{build_router, AppState};
use pokemon_catalog::config::{ServerConfig, StoreKind};
use pokemon_catalog::database::{DatabaseConfig, DatabaseManager};
use pokemon_catalog::{CatalogStore, MemoryCatalogStore, PokeApiClient};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pokemon_catalog=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::default();

    let mut database = None;
    let store: Arc<dyn CatalogStore> = match config.store {
        StoreKind::Postgres => {
            let db = DatabaseManager::new(DatabaseConfig::default())
                .await
                .context("failed to connect to database")?;
            db.test_connection()
                .await
                .context("database did not answer")?;
            db.run_migrations()
                .await
                .context("failed to run migrations")?;
            tracing::info!("Connected to database");
            let store = db.catalog_store();
            database = Some(db);
            Arc::new(store)
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory catalog store; data is lost on exit");
            Arc::new(MemoryCatalogStore::new())
        }
    };

    let lookup = PokeApiClient::new(&config.lookup)?;
    tracing::info!("PokeAPI lookups go to {}", config.lookup.base_url);

    let app = build_router(AppState::new(store, lookup));

    // Bind and serve
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!("pokemon_server listening on {}", config.bind_addr);

    let served = axum::serve(listener, app).await;
    if let Some(db) = database {
        db.close().await;
    }
    served.context("server error")?;
    Ok(())
}
