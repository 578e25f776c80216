//! Pokémon catalog
//!
//! CRUD backend for a Pokémon catalog: aggregates with shared type and
//! ability tags, an owned stat block, a derived score, and a read-only proxy
//! to PokeAPI.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pokemon_catalog::{MemoryCatalogStore, PokemonService, ScoreInput, calculate_score};
//!
//! # async fn demo() -> pokemon_catalog::CatalogResult<()> {
//! let service = PokemonService::new(Arc::new(MemoryCatalogStore::new()));
//! let charizard = service.get(6).await?;
//! let score = calculate_score(&ScoreInput::from(&charizard))?;
//! println!("{}", score.pokemon_score);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Aggregate model and write payloads
pub mod models;

// Runtime configuration
pub mod config;

// Persistence traits and the in-memory backend
pub mod store;

// Upsert service, tag reconciler, score calculator
pub mod services;

// Upstream provider lookup
pub mod pokeapi;

// Database integration (when enabled)
#[cfg(feature = "database")]
pub mod database;

// REST API (when enabled)
#[cfg(feature = "server")]
pub mod api;

pub use error::{CatalogError, CatalogResult, FieldErrors};
pub use models::{BaseStats, NewPokemon, Pokemon, PokemonPatch, Tag, TagKind, UpdateMode};
pub use pokeapi::{PokeApiClient, PokemonData};
pub use services::{calculate_score, PokemonScore, PokemonService, ScoreInput};
pub use store::{CatalogStore, CatalogTx, MemoryCatalogStore};

#[cfg(feature = "database")]
pub use database::{DatabaseConfig, DatabaseManager, PgCatalogStore};
