//! Score calculator
//!
//! Weighted sum over an assembled Pokémon, rounded to two decimals:
//! types 0.4, stat total 0.3, abilities 0.2, height plus weight 0.1.

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};
use crate::models::{BaseStats, Pokemon};

const TYPE_WEIGHT: f64 = 0.4;
const STAT_WEIGHT: f64 = 0.3;
const ABILITY_WEIGHT: f64 = 0.2;
const SIZE_WEIGHT: f64 = 0.1;

/// Scoring input; every field may be absent and absence is an error
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreInput {
    pub types: Option<Vec<String>>,
    pub abilities: Option<Vec<String>>,
    pub base_stats: Option<BaseStats>,
    pub height: Option<i32>,
    pub weight: Option<i32>,
}

impl From<&Pokemon> for ScoreInput {
    fn from(pokemon: &Pokemon) -> Self {
        Self {
            types: Some(pokemon.types.clone()),
            abilities: Some(pokemon.abilities.clone()),
            base_stats: pokemon.base_stats,
            height: Some(pokemon.height),
            weight: Some(pokemon.weight),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PokemonScore {
    pub pokemon_score: f64,
}

pub fn calculate_score(input: &ScoreInput) -> CatalogResult<PokemonScore> {
    let types = input.types.as_ref().ok_or(CatalogError::MissingField("types"))?;
    let abilities = input
        .abilities
        .as_ref()
        .ok_or(CatalogError::MissingField("abilities"))?;
    let stats = input
        .base_stats
        .as_ref()
        .ok_or(CatalogError::MissingField("base_stats"))?;
    let height = input.height.ok_or(CatalogError::MissingField("height"))?;
    let weight = input.weight.ok_or(CatalogError::MissingField("weight"))?;

    let raw = types.len() as f64 * TYPE_WEIGHT
        + stats.total() as f64 * STAT_WEIGHT
        + abilities.len() as f64 * ABILITY_WEIGHT
        + (f64::from(height) + f64::from(weight)) * SIZE_WEIGHT;

    Ok(PokemonScore {
        pokemon_score: round2(raw),
    })
}

// f64::round is half away from zero.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
