//! PokeAPI response types
//!
//! Only the slice of `GET /pokemon/{name-or-id}` the lookup needs.
//!
//! Reference: https://pokeapi.co/docs/v2#pokemon

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};
use crate::models::BaseStats;

/// Provider labels for the positional stat array
pub const STAT_LABELS: [&str; 6] = [
    "hp",
    "attack",
    "defense",
    "special-attack",
    "special-defense",
    "speed",
];

#[derive(Debug, Clone, Deserialize)]
pub struct PokeApiPokemon {
    pub id: i32,
    pub name: String,
    pub height: i32,
    pub weight: i32,
    pub sprites: Sprites,
    pub stats: Vec<StatSlot>,
    pub types: Vec<TypeSlot>,
    pub abilities: Vec<AbilitySlot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sprites {
    #[serde(default)]
    pub front_default: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedResource {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatSlot {
    pub base_stat: i32,
    #[serde(default)]
    pub stat: Option<NamedResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeSlot {
    #[serde(rename = "type")]
    pub type_ref: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbilitySlot {
    pub ability: NamedResource,
}

/// Normalized lookup result, shaped like a create payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonData {
    pub name: String,
    pub pokemon_id: i32,
    pub height: i32,
    pub weight: i32,
    pub sprite_url: Option<String>,
    pub base_stats: BaseStats,
    pub types: Vec<String>,
    pub abilities: Vec<String>,
}

impl PokeApiPokemon {
    /// Map the provider record onto [`PokemonData`].
    ///
    /// Stats are read by position. A label, when present, must agree with
    /// its position; it never decides which stat a value belongs to.
    pub fn normalize(self) -> CatalogResult<PokemonData> {
        if self.stats.len() < STAT_LABELS.len() {
            return Err(CatalogError::UnexpectedShape(format!(
                "expected {} stats, got {}",
                STAT_LABELS.len(),
                self.stats.len()
            )));
        }

        let mut values = [0i32; 6];
        for (position, (slot, expected)) in self.stats.iter().zip(STAT_LABELS).enumerate() {
            if let Some(label) = &slot.stat {
                if label.name != expected {
                    return Err(CatalogError::UnexpectedShape(format!(
                        "stat {} is labelled '{}', expected '{}'",
                        position, label.name, expected
                    )));
                }
            }
            values[position] = slot.base_stat;
        }

        Ok(PokemonData {
            name: self.name,
            pokemon_id: self.id,
            height: self.height,
            weight: self.weight,
            sprite_url: self.sprites.front_default,
            base_stats: BaseStats::from_positional(values),
            types: self.types.into_iter().map(|slot| slot.type_ref.name).collect(),
            abilities: self
                .abilities
                .into_iter()
                .map(|slot| slot.ability.name)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bulbasaur_body() -> serde_json::Value {
        json!({
            "id": 1,
            "name": "bulbasaur",
            "height": 7,
            "weight": 69,
            "base_experience": 64,
            "sprites": { "front_default": "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/1.png", "back_default": null },
            "stats": [
                { "base_stat": 45, "effort": 0, "stat": { "name": "hp", "url": "https://pokeapi.co/api/v2/stat/1/" } },
                { "base_stat": 49, "effort": 0, "stat": { "name": "attack", "url": "https://pokeapi.co/api/v2/stat/2/" } },
                { "base_stat": 49, "effort": 0, "stat": { "name": "defense", "url": "https://pokeapi.co/api/v2/stat/3/" } },
                { "base_stat": 65, "effort": 1, "stat": { "name": "special-attack", "url": "https://pokeapi.co/api/v2/stat/4/" } },
                { "base_stat": 65, "effort": 0, "stat": { "name": "special-defense", "url": "https://pokeapi.co/api/v2/stat/5/" } },
                { "base_stat": 45, "effort": 0, "stat": { "name": "speed", "url": "https://pokeapi.co/api/v2/stat/6/" } }
            ],
            "types": [
                { "slot": 1, "type": { "name": "grass", "url": "https://pokeapi.co/api/v2/type/12/" } },
                { "slot": 2, "type": { "name": "poison", "url": "https://pokeapi.co/api/v2/type/4/" } }
            ],
            "abilities": [
                { "ability": { "name": "overgrow", "url": "https://pokeapi.co/api/v2/ability/65/" }, "is_hidden": false, "slot": 1 },
                { "ability": { "name": "chlorophyll", "url": "https://pokeapi.co/api/v2/ability/34/" }, "is_hidden": true, "slot": 3 }
            ]
        })
    }

    fn parse(body: serde_json::Value) -> PokeApiPokemon {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_normalize_bulbasaur() {
        let data = parse(bulbasaur_body()).normalize().unwrap();
        assert_eq!(data.name, "bulbasaur");
        assert_eq!(data.pokemon_id, 1);
        assert_eq!(data.types, vec!["grass", "poison"]);
        assert_eq!(data.abilities, vec!["overgrow", "chlorophyll"]);
        assert_eq!(
            data.base_stats,
            BaseStats::from_positional([45, 49, 49, 65, 65, 45])
        );
        assert_eq!(
            serde_json::to_value(&data).unwrap()["base_stats"]["special_attack"],
            json!(65)
        );
    }

    #[test]
    fn test_null_sprite_is_kept() {
        let mut body = bulbasaur_body();
        body["sprites"]["front_default"] = json!(null);
        let data = parse(body).normalize().unwrap();
        assert_eq!(data.sprite_url, None);
    }

    #[test]
    fn test_unlabelled_stats_are_positional() {
        let mut body = bulbasaur_body();
        for slot in body["stats"].as_array_mut().unwrap() {
            slot.as_object_mut().unwrap().remove("stat");
        }
        let data = parse(body).normalize().unwrap();
        assert_eq!(data.base_stats.special_attack, 65);
    }

    #[test]
    fn test_short_stat_array_rejected() {
        let mut body = bulbasaur_body();
        body["stats"].as_array_mut().unwrap().truncate(5);
        assert!(matches!(
            parse(body).normalize(),
            Err(CatalogError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn test_mislabelled_stat_rejected() {
        let mut body = bulbasaur_body();
        let stats = body["stats"].as_array_mut().unwrap();
        stats.swap(0, 5);
        assert!(matches!(
            parse(body).normalize(),
            Err(CatalogError::UnexpectedShape(_))
        ));
    }
}
