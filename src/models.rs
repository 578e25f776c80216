//! Catalog data model
//!
//! Aggregate root [`Pokemon`], its owned [`BaseStats`] block, the shared
//! [`Tag`] namespaces, and the write payloads accepted by the upsert service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult, FieldErrors};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_TAG_NAME_LEN: usize = 50;

/// The two shared tag namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    Type,
    Ability,
}

impl TagKind {
    /// Payload key carrying this category's names.
    pub fn field(&self) -> &'static str {
        match self {
            TagKind::Type => "types",
            TagKind::Ability => "abilities",
        }
    }
}

impl std::fmt::Display for TagKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagKind::Type => write!(f, "type"),
            TagKind::Ability => write!(f, "ability"),
        }
    }
}

/// A resolved tag entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Six base statistics, in provider order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct BaseStats {
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub special_attack: i32,
    pub special_defense: i32,
    pub speed: i32,
}

impl BaseStats {
    pub const FIELDS: [&'static str; 6] = [
        "hp",
        "attack",
        "defense",
        "special_attack",
        "special_defense",
        "speed",
    ];

    pub fn total(&self) -> i64 {
        [
            self.hp,
            self.attack,
            self.defense,
            self.special_attack,
            self.special_defense,
            self.speed,
        ]
        .iter()
        .map(|v| i64::from(*v))
        .sum()
    }

    /// Parse a stat block payload. Anything other than an object holding
    /// exactly the six integer fields is an `InvalidShape`.
    pub fn from_value(value: &JsonValue) -> CatalogResult<BaseStats> {
        let object = value.as_object().ok_or_else(|| CatalogError::InvalidShape {
            field: "base_stats",
            reason: format!("expected an object, got {}", json_kind(value)),
        })?;

        if let Some(unknown) = object.keys().find(|k| !Self::FIELDS.contains(&k.as_str())) {
            return Err(CatalogError::InvalidShape {
                field: "base_stats",
                reason: format!("unknown stat '{}'", unknown),
            });
        }

        let mut values = [0i32; 6];
        for (slot, field) in values.iter_mut().zip(Self::FIELDS) {
            let raw = object.get(field).ok_or_else(|| CatalogError::InvalidShape {
                field: "base_stats",
                reason: format!("missing stat '{}'", field),
            })?;
            *slot = raw
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| CatalogError::InvalidShape {
                    field: "base_stats",
                    reason: format!("stat '{}' must be an integer", field),
                })?;
        }

        Ok(Self::from_positional(values))
    }

    /// Build from values ordered hp, attack, defense, special_attack,
    /// special_defense, speed.
    pub fn from_positional(values: [i32; 6]) -> Self {
        let [hp, attack, defense, special_attack, special_defense, speed] = values;
        Self {
            hp,
            attack,
            defense,
            special_attack,
            special_defense,
            speed,
        }
    }
}

/// Scalar columns of a stored Pokémon
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct PokemonRow {
    pub id: Uuid,
    pub pokemon_id: i32,
    pub name: String,
    pub height: i32,
    pub weight: i32,
    pub sprite_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Scalar fields written on create and update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PokemonFields {
    pub pokemon_id: i32,
    pub name: String,
    pub height: i32,
    pub weight: i32,
    pub sprite_url: String,
}

impl From<&PokemonRow> for PokemonFields {
    fn from(row: &PokemonRow) -> Self {
        Self {
            pokemon_id: row.pokemon_id,
            name: row.name.clone(),
            height: row.height,
            weight: row.weight,
            sprite_url: row.sprite_url.clone(),
        }
    }
}

/// The assembled aggregate, as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pokemon {
    pub id: Uuid,
    pub name: String,
    pub height: i32,
    pub weight: i32,
    pub pokemon_id: i32,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sprite_url: String,
    pub types: Vec<String>,
    pub abilities: Vec<String>,
    #[serde(serialize_with = "serialize_stats_or_empty")]
    pub base_stats: Option<BaseStats>,
}

impl Pokemon {
    pub fn assemble(
        row: PokemonRow,
        types: Vec<String>,
        abilities: Vec<String>,
        base_stats: Option<BaseStats>,
    ) -> Self {
        Self {
            id: row.id,
            name: row.name,
            height: row.height,
            weight: row.weight,
            pokemon_id: row.pokemon_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            sprite_url: row.sprite_url,
            types,
            abilities,
            base_stats,
        }
    }
}

// A Pokémon without a stat block renders `"base_stats": {}`.
fn serialize_stats_or_empty<S>(stats: &Option<BaseStats>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match stats {
        Some(stats) => stats.serialize(serializer),
        None => Map::new().serialize(serializer),
    }
}

/// Create payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPokemon {
    pub fields: PokemonFields,
    pub types: Vec<String>,
    pub abilities: Vec<String>,
    pub base_stats: Option<BaseStats>,
}

impl NewPokemon {
    pub fn from_json(body: &JsonValue) -> CatalogResult<Self> {
        let mut reader = PayloadReader::new(body)?;
        let base_stats = reader.base_stats(UpdateMode::Full)?;

        let pokemon_id = reader.int("pokemon_id");
        let name = reader.name();
        let height = reader.int("height");
        let weight = reader.int("weight");
        let sprite_url = reader.url("sprite_url");
        let types = reader.tag_list(TagKind::Type);
        let abilities = reader.tag_list(TagKind::Ability);

        let mut errors = reader.finish();
        for (field, present) in [
            ("pokemon_id", pokemon_id.is_some()),
            ("name", name.is_some()),
            ("height", height.is_some()),
            ("weight", weight.is_some()),
            ("sprite_url", sprite_url.is_some()),
        ] {
            if !present && !errors.contains(field) {
                errors.required(field);
            }
        }

        match (pokemon_id, name, height, weight, sprite_url) {
            (Some(pokemon_id), Some(name), Some(height), Some(weight), Some(sprite_url))
                if !errors.has_errors() =>
            {
                Ok(Self {
                    fields: PokemonFields {
                        pokemon_id,
                        name,
                        height,
                        weight,
                        sprite_url,
                    },
                    types: types.unwrap_or_default(),
                    abilities: abilities.unwrap_or_default(),
                    base_stats,
                })
            }
            _ => Err(CatalogError::Validation(errors)),
        }
    }
}

/// PUT replaces the whole record, PATCH only what is supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Full,
    Partial,
}

/// Update payload; `None` means the key was omitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PokemonPatch {
    pub pokemon_id: Option<i32>,
    pub name: Option<String>,
    pub height: Option<i32>,
    pub weight: Option<i32>,
    pub sprite_url: Option<String>,
    pub types: Option<Vec<String>>,
    pub abilities: Option<Vec<String>>,
    pub base_stats: Option<BaseStats>,
}

impl PokemonPatch {
    pub fn from_json(body: &JsonValue, mode: UpdateMode) -> CatalogResult<Self> {
        let mut reader = PayloadReader::new(body)?;
        let stats_supplied = reader.has("base_stats");
        let base_stats = reader.base_stats(mode)?;

        let patch = Self {
            pokemon_id: reader.int("pokemon_id"),
            name: reader.name(),
            height: reader.int("height"),
            weight: reader.int("weight"),
            sprite_url: reader.url("sprite_url"),
            types: reader.tag_list(TagKind::Type),
            abilities: reader.tag_list(TagKind::Ability),
            base_stats,
        };

        let mut errors = reader.finish();
        if mode == UpdateMode::Full {
            for (field, present) in [
                ("pokemon_id", patch.pokemon_id.is_some()),
                ("name", patch.name.is_some()),
                ("height", patch.height.is_some()),
                ("weight", patch.weight.is_some()),
                ("sprite_url", patch.sprite_url.is_some()),
                ("types", patch.types.is_some()),
                ("abilities", patch.abilities.is_some()),
                ("base_stats", stats_supplied),
            ] {
                if !present && !errors.contains(field) {
                    errors.required(field);
                }
            }
        }

        errors.into_result(patch)
    }

    /// Overlay supplied scalars onto the stored values.
    pub fn apply_to(&self, current: &PokemonFields) -> PokemonFields {
        PokemonFields {
            pokemon_id: self.pokemon_id.unwrap_or(current.pokemon_id),
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            height: self.height.unwrap_or(current.height),
            weight: self.weight.unwrap_or(current.weight),
            sprite_url: self
                .sprite_url
                .clone()
                .unwrap_or_else(|| current.sprite_url.clone()),
        }
    }
}

/// Reads typed fields out of a JSON object, collecting per-field errors.
struct PayloadReader<'a> {
    object: &'a Map<String, JsonValue>,
    errors: FieldErrors,
}

impl<'a> PayloadReader<'a> {
    fn new(body: &'a JsonValue) -> CatalogResult<Self> {
        let object = body.as_object().ok_or_else(|| {
            let mut errors = FieldErrors::new();
            errors.add(
                "non_field_errors",
                format!("Invalid data. Expected an object, got {}.", json_kind(body)),
            );
            CatalogError::Validation(errors)
        })?;
        Ok(Self {
            object,
            errors: FieldErrors::new(),
        })
    }

    fn has(&self, field: &str) -> bool {
        self.object.contains_key(field)
    }

    fn present(&mut self, field: &str) -> Option<&'a JsonValue> {
        match self.object.get(field) {
            None => None,
            Some(JsonValue::Null) => {
                self.errors.add(field, "This field may not be null.");
                None
            }
            Some(value) => Some(value),
        }
    }

    fn int(&mut self, field: &str) -> Option<i32> {
        let value = self.present(field)?;
        let parsed = match value {
            JsonValue::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
            JsonValue::String(s) => s.trim().parse::<i32>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.errors.add(field, "A valid integer is required.");
        }
        parsed
    }

    fn string(&mut self, field: &str, max_len: usize) -> Option<String> {
        let value = self.present(field)?;
        match value.as_str() {
            Some(s) if s.trim().is_empty() => {
                self.errors.add(field, "This field may not be blank.");
                None
            }
            Some(s) if s.chars().count() > max_len => {
                self.errors.add(
                    field,
                    format!("Ensure this field has no more than {} characters.", max_len),
                );
                None
            }
            Some(s) => Some(s.to_string()),
            None => {
                self.errors.add(field, "Not a valid string.");
                None
            }
        }
    }

    fn name(&mut self) -> Option<String> {
        self.string("name", MAX_NAME_LEN)
    }

    fn url(&mut self, field: &str) -> Option<String> {
        let raw = self.string(field, usize::MAX)?;
        match url::Url::parse(&raw) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Some(raw),
            _ => {
                self.errors.add(field, "Enter a valid URL.");
                None
            }
        }
    }

    fn tag_list(&mut self, kind: TagKind) -> Option<Vec<String>> {
        let field = kind.field();
        let value = self.present(field)?;
        let Some(items) = value.as_array() else {
            self.errors.add(
                field,
                format!("Expected a list of items but got type \"{}\".", json_kind(value)),
            );
            return None;
        };

        let mut names = Vec::with_capacity(items.len());
        for item in items {
            match item.as_str() {
                Some(name) if name.is_empty() => {
                    self.errors.add(field, "Tag names may not be blank.")
                }
                Some(name) if name.chars().count() > MAX_TAG_NAME_LEN => self.errors.add(
                    field,
                    format!(
                        "Tag '{}' has more than {} characters.",
                        name, MAX_TAG_NAME_LEN
                    ),
                ),
                Some(name) => names.push(name.to_string()),
                None => self.errors.add(field, "Not a valid string."),
            }
        }
        Some(names)
    }

    /// Only a partial update may send `{}`, meaning "leave the stats alone".
    fn base_stats(&mut self, mode: UpdateMode) -> CatalogResult<Option<BaseStats>> {
        let Some(value) = self.present("base_stats") else {
            return Ok(None);
        };
        if mode == UpdateMode::Partial && value.as_object().is_some_and(|o| o.is_empty()) {
            return Ok(None);
        }
        BaseStats::from_value(value).map(Some)
    }

    fn finish(self) -> FieldErrors {
        self.errors
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "str",
        JsonValue::Array(_) => "list",
        JsonValue::Object(_) => "dict",
    }
}
