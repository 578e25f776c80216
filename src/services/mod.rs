//! Services module for catalog business logic
//!
//! The upsert service owns every write to the catalog; the tag reconciler
//! and score calculator are the pieces it composes.

pub mod pokemon_service;
pub mod score;
pub mod tag_reconciler;

pub use pokemon_service::PokemonService;
pub use score::{calculate_score, PokemonScore, ScoreInput};
pub use tag_reconciler::{reconcile_tags, resolve_tags};
