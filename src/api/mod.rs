//! REST API module for the Pokémon catalog
//!
//! Exposes the catalog under `/pokemon` plus a `/health` probe.

pub mod error;
pub mod pokemon_routes;

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::pokeapi::PokeApiClient;
use crate::services::PokemonService;
use crate::store::CatalogStore;

pub use error::AppError;
pub use pokemon_routes::pokemon_routes;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub service: PokemonService,
    pub lookup: Arc<PokeApiClient>,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>, lookup: PokeApiClient) -> Self {
        Self {
            service: PokemonService::new(store),
            lookup: Arc::new(lookup),
        }
    }
}

/// Build the full axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/pokemon", pokemon_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

// Health check endpoint
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.service.store().ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
