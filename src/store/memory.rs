//! In-memory catalog store
//!
//! State lives behind one tokio mutex. A unit of work takes the owned lock
//! and edits a clone of the state; commit swaps the clone in. Writers are
//! therefore serialized and rollback is just dropping the clone.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{CatalogStore, CatalogTx};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{BaseStats, Pokemon, PokemonFields, PokemonRow, Tag, TagKind};

#[derive(Debug, Clone, Default)]
struct TagTable {
    by_name: HashMap<String, i64>,
    by_id: BTreeMap<i64, String>,
    next_id: i64,
}

impl TagTable {
    fn get_or_create(&mut self, name: &str) -> Tag {
        if let Some(id) = self.by_name.get(name) {
            return Tag {
                id: *id,
                name: name.to_string(),
            };
        }
        self.next_id += 1;
        let id = self.next_id;
        self.by_name.insert(name.to_string(), id);
        self.by_id.insert(id, name.to_string());
        Tag {
            id,
            name: name.to_string(),
        }
    }

    fn names_for(&self, ids: Option<&BTreeSet<i64>>) -> Vec<String> {
        let mut names: Vec<String> = ids
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect();
        names.sort();
        names
    }
}

#[derive(Debug, Clone)]
struct StatRow {
    pokemon: Uuid,
    stats: BaseStats,
}

#[derive(Debug, Clone, Default)]
struct CatalogState {
    pokemon: BTreeMap<Uuid, PokemonRow>,
    types: TagTable,
    abilities: TagTable,
    type_edges: BTreeMap<Uuid, BTreeSet<i64>>,
    ability_edges: BTreeMap<Uuid, BTreeSet<i64>>,
    stats: BTreeMap<i64, StatRow>,
    next_stat_id: i64,
}

impl CatalogState {
    fn tags(&self, kind: TagKind) -> &TagTable {
        match kind {
            TagKind::Type => &self.types,
            TagKind::Ability => &self.abilities,
        }
    }

    fn tags_mut(&mut self, kind: TagKind) -> &mut TagTable {
        match kind {
            TagKind::Type => &mut self.types,
            TagKind::Ability => &mut self.abilities,
        }
    }

    fn edges_mut(&mut self, kind: TagKind) -> &mut BTreeMap<Uuid, BTreeSet<i64>> {
        match kind {
            TagKind::Type => &mut self.type_edges,
            TagKind::Ability => &mut self.ability_edges,
        }
    }

    fn find_by_pokemon_id(&self, pokemon_id: i32) -> Option<&PokemonRow> {
        self.pokemon.values().find(|row| row.pokemon_id == pokemon_id)
    }

    fn check_unique(&self, fields: &PokemonFields, excluding: Option<Uuid>) -> CatalogResult<()> {
        let others = || {
            self.pokemon
                .values()
                .filter(move |row| Some(row.id) != excluding)
        };
        if others().any(|row| row.pokemon_id == fields.pokemon_id) {
            return Err(CatalogError::DuplicateKey {
                field: "pokemon_id",
                value: fields.pokemon_id.to_string(),
            });
        }
        if others().any(|row| row.name == fields.name) {
            return Err(CatalogError::DuplicateKey {
                field: "name",
                value: fields.name.clone(),
            });
        }
        Ok(())
    }

    fn assemble(&self, row: &PokemonRow) -> Pokemon {
        let types = self.types.names_for(self.type_edges.get(&row.id));
        let abilities = self.abilities.names_for(self.ability_edges.get(&row.id));
        // Lowest id wins if more than one block ever existed.
        let base_stats = self
            .stats
            .values()
            .find(|stat| stat.pokemon == row.id)
            .map(|stat| stat.stats);
        Pokemon::assemble(row.clone(), types, abilities, base_stats)
    }

    fn remove_pokemon(&mut self, id: Uuid) {
        self.pokemon.remove(&id);
        self.type_edges.remove(&id);
        self.ability_edges.remove(&id);
        self.stats.retain(|_, stat| stat.pokemon != id);
    }
}

/// Catalog store kept entirely in process memory
#[derive(Clone, Default)]
pub struct MemoryCatalogStore {
    state: Arc<Mutex<CatalogState>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every tag name in one namespace, sorted.
    pub async fn tag_names(&self, kind: TagKind) -> Vec<String> {
        let state = self.state.lock().await;
        state.tags(kind).by_id.values().cloned().collect::<BTreeSet<_>>().into_iter().collect()
    }

    /// Number of stat block rows across all Pokémon.
    pub async fn stat_block_count(&self) -> usize {
        self.state.lock().await.stats.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn begin(&self) -> CatalogResult<Box<dyn CatalogTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn get_by_pokemon_id(&self, pokemon_id: i32) -> CatalogResult<Option<Pokemon>> {
        let state = self.state.lock().await;
        Ok(state.find_by_pokemon_id(pokemon_id).map(|row| state.assemble(row)))
    }

    async fn list_all(&self) -> CatalogResult<Vec<Pokemon>> {
        let state = self.state.lock().await;
        let mut all: Vec<Pokemon> = state.pokemon.values().map(|row| state.assemble(row)).collect();
        all.sort_by_key(|p| p.pokemon_id);
        Ok(all)
    }

    async fn delete_by_pokemon_id(&self, pokemon_id: i32) -> CatalogResult<bool> {
        let mut state = self.state.lock().await;
        match state.find_by_pokemon_id(pokemon_id).map(|row| row.id) {
            Some(id) => {
                state.remove_pokemon(id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> CatalogResult<()> {
        Ok(())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<CatalogState>,
    working: CatalogState,
}

impl MemoryTx {
    fn row(&self, id: Uuid) -> CatalogResult<&PokemonRow> {
        self.working
            .pokemon
            .get(&id)
            .ok_or_else(|| CatalogError::NotFound(format!("pokemon {}", id)))
    }
}

#[async_trait]
impl CatalogTx for MemoryTx {
    async fn find_by_pokemon_id(&mut self, pokemon_id: i32) -> CatalogResult<Option<PokemonRow>> {
        Ok(self.working.find_by_pokemon_id(pokemon_id).cloned())
    }

    async fn pokemon_id_taken(
        &mut self,
        pokemon_id: i32,
        excluding: Option<Uuid>,
    ) -> CatalogResult<bool> {
        Ok(self
            .working
            .pokemon
            .values()
            .any(|row| row.pokemon_id == pokemon_id && Some(row.id) != excluding))
    }

    async fn name_taken(&mut self, name: &str, excluding: Option<Uuid>) -> CatalogResult<bool> {
        Ok(self
            .working
            .pokemon
            .values()
            .any(|row| row.name == name && Some(row.id) != excluding))
    }

    async fn insert_pokemon(&mut self, fields: &PokemonFields) -> CatalogResult<PokemonRow> {
        self.working.check_unique(fields, None)?;
        let now = Utc::now();
        let row = PokemonRow {
            id: Uuid::new_v4(),
            pokemon_id: fields.pokemon_id,
            name: fields.name.clone(),
            height: fields.height,
            weight: fields.weight,
            sprite_url: fields.sprite_url.clone(),
            created_at: now,
            updated_at: now,
        };
        self.working.pokemon.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_pokemon(
        &mut self,
        id: Uuid,
        fields: &PokemonFields,
    ) -> CatalogResult<PokemonRow> {
        self.row(id)?;
        self.working.check_unique(fields, Some(id))?;
        let row = self
            .working
            .pokemon
            .get_mut(&id)
            .ok_or_else(|| CatalogError::NotFound(format!("pokemon {}", id)))?;
        row.pokemon_id = fields.pokemon_id;
        row.name = fields.name.clone();
        row.height = fields.height;
        row.weight = fields.weight;
        row.sprite_url = fields.sprite_url.clone();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn get_or_create_tag(&mut self, kind: TagKind, name: &str) -> CatalogResult<Tag> {
        Ok(self.working.tags_mut(kind).get_or_create(name))
    }

    async fn replace_tag_assignments(
        &mut self,
        pokemon: Uuid,
        kind: TagKind,
        tag_ids: &[i64],
    ) -> CatalogResult<()> {
        self.row(pokemon)?;
        let assigned: BTreeSet<i64> = tag_ids.iter().copied().collect();
        self.working.edges_mut(kind).insert(pokemon, assigned);
        Ok(())
    }

    async fn delete_stats(&mut self, pokemon: Uuid) -> CatalogResult<u64> {
        let before = self.working.stats.len();
        self.working.stats.retain(|_, stat| stat.pokemon != pokemon);
        Ok((before - self.working.stats.len()) as u64)
    }

    async fn insert_stats(&mut self, pokemon: Uuid, stats: &BaseStats) -> CatalogResult<()> {
        self.row(pokemon)?;
        self.working.next_stat_id += 1;
        let id = self.working.next_stat_id;
        self.working.stats.insert(
            id,
            StatRow {
                pokemon,
                stats: *stats,
            },
        );
        Ok(())
    }

    async fn load_aggregate(&mut self, id: Uuid) -> CatalogResult<Pokemon> {
        let row = self.row(id)?;
        Ok(self.working.assemble(row))
    }

    async fn commit(self: Box<Self>) -> CatalogResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
