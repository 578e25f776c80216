//! Persistence traits for the Pokémon catalog.
//!
//! The upsert service and tag reconciler only see these traits. Backends:
//! `MemoryCatalogStore` for tests and local runs, `PgCatalogStore` under the
//! `database` feature.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CatalogResult;
use crate::models::{BaseStats, Pokemon, PokemonFields, PokemonRow, Tag, TagKind};

pub mod memory;

pub use memory::MemoryCatalogStore;

/// Read paths plus the entry point for transactional writes.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Open a unit of work. Nothing written through it is visible to other
    /// readers until [`CatalogTx::commit`]; dropping it discards every write.
    async fn begin(&self) -> CatalogResult<Box<dyn CatalogTx>>;

    async fn get_by_pokemon_id(&self, pokemon_id: i32) -> CatalogResult<Option<Pokemon>>;

    /// Every stored aggregate, ordered by `pokemon_id`.
    async fn list_all(&self) -> CatalogResult<Vec<Pokemon>>;

    /// Remove a Pokémon with its stat block and tag edges. Tags survive.
    /// Returns `false` when nothing matched.
    async fn delete_by_pokemon_id(&self, pokemon_id: i32) -> CatalogResult<bool>;

    async fn ping(&self) -> CatalogResult<()>;
}

/// One all-or-nothing unit of work over the aggregate tables.
#[async_trait]
pub trait CatalogTx: Send {
    // ── Pokémon rows ──

    async fn find_by_pokemon_id(&mut self, pokemon_id: i32) -> CatalogResult<Option<PokemonRow>>;
    async fn pokemon_id_taken(&mut self, pokemon_id: i32, excluding: Option<Uuid>)
        -> CatalogResult<bool>;
    async fn name_taken(&mut self, name: &str, excluding: Option<Uuid>) -> CatalogResult<bool>;

    /// Insert a new row. Unique-key collisions surface as `DuplicateKey`.
    async fn insert_pokemon(&mut self, fields: &PokemonFields) -> CatalogResult<PokemonRow>;

    /// Overwrite the scalar columns and bump `updated_at`.
    async fn update_pokemon(&mut self, id: Uuid, fields: &PokemonFields)
        -> CatalogResult<PokemonRow>;

    // ── Tags ──

    /// Resolve a tag by exact name, creating it when absent.
    async fn get_or_create_tag(&mut self, kind: TagKind, name: &str) -> CatalogResult<Tag>;

    /// Replace the Pokémon's whole assignment for `kind` with `tag_ids`.
    async fn replace_tag_assignments(
        &mut self,
        pokemon: Uuid,
        kind: TagKind,
        tag_ids: &[i64],
    ) -> CatalogResult<()>;

    // ── Stat blocks ──

    async fn delete_stats(&mut self, pokemon: Uuid) -> CatalogResult<u64>;
    async fn insert_stats(&mut self, pokemon: Uuid, stats: &BaseStats) -> CatalogResult<()>;

    // ── Assembly ──

    /// Read the aggregate as this unit of work currently sees it.
    async fn load_aggregate(&mut self, id: Uuid) -> CatalogResult<Pokemon>;

    async fn commit(self: Box<Self>) -> CatalogResult<()>;
}
