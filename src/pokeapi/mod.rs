//! PokeAPI integration
//!
//! This module provides:
//! - Response types for the provider's Pokémon resource
//! - Normalization into the catalog's create-payload shape
//! - A timeout-bounded client for name or id lookups

pub mod client;
pub mod types;

pub use client::PokeApiClient;
pub use types::{PokeApiPokemon, PokemonData, STAT_LABELS};
