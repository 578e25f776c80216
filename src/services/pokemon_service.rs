//! Pokémon upsert service
//!
//! Every write runs as one unit of work on the catalog store: the scalar
//! row, both tag reconciliations and the stat block replacement commit
//! together or not at all.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{CatalogError, CatalogResult};
use crate::models::{NewPokemon, Pokemon, PokemonFields, PokemonPatch, TagKind};
use crate::services::score::{calculate_score, PokemonScore, ScoreInput};
use crate::services::tag_reconciler::reconcile_tags;
use crate::store::{CatalogStore, CatalogTx};

#[derive(Clone)]
pub struct PokemonService {
    store: Arc<dyn CatalogStore>,
}

impl PokemonService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Create a Pokémon with its tags and optional stat block
    pub async fn create(&self, request: NewPokemon) -> CatalogResult<Pokemon> {
        let mut tx = self.store.begin().await?;

        info!(
            "Creating pokemon {} ({})",
            request.fields.pokemon_id, request.fields.name
        );

        // 1. Uniqueness, pokemon_id before name
        ensure_unique(tx.as_mut(), &request.fields, None).await?;

        // 2. Scalar row
        let row = tx.insert_pokemon(&request.fields).await?;

        // 3. Tags
        reconcile_tags(tx.as_mut(), row.id, TagKind::Type, &request.types).await?;
        reconcile_tags(tx.as_mut(), row.id, TagKind::Ability, &request.abilities).await?;

        // 4. Stat block
        if let Some(stats) = &request.base_stats {
            tx.insert_stats(row.id, stats).await?;
        }

        let created = tx.load_aggregate(row.id).await?;
        tx.commit().await?;

        info!(
            "Pokemon {} created with {} type(s), {} ability(ies)",
            created.pokemon_id,
            created.types.len(),
            created.abilities.len()
        );
        Ok(created)
    }

    /// Apply a full or partial update to the Pokémon stored under `pokemon_id`
    pub async fn update(&self, pokemon_id: i32, patch: PokemonPatch) -> CatalogResult<Pokemon> {
        let mut tx = self.store.begin().await?;

        info!("Updating pokemon {}", pokemon_id);

        // 1. Target must exist
        let current = tx
            .find_by_pokemon_id(pokemon_id)
            .await?
            .ok_or_else(|| CatalogError::not_found_pokemon(pokemon_id))?;

        // 2. Scalars, checked against every other Pokémon
        let fields = patch.apply_to(&PokemonFields::from(&current));
        ensure_unique(tx.as_mut(), &fields, Some(current.id)).await?;
        let row = tx.update_pokemon(current.id, &fields).await?;

        // 3. Tags, only when a non-empty list was supplied
        if let Some(types) = patch.types.as_ref().filter(|names| !names.is_empty()) {
            reconcile_tags(tx.as_mut(), row.id, TagKind::Type, types).await?;
        }
        if let Some(abilities) = patch.abilities.as_ref().filter(|names| !names.is_empty()) {
            reconcile_tags(tx.as_mut(), row.id, TagKind::Ability, abilities).await?;
        }

        // 4. Stat block replacement
        if let Some(stats) = &patch.base_stats {
            let removed = tx.delete_stats(row.id).await?;
            debug!("Replaced {} stat block(s) for pokemon {}", removed, row.pokemon_id);
            tx.insert_stats(row.id, stats).await?;
        }

        let updated = tx.load_aggregate(row.id).await?;
        tx.commit().await?;

        info!("Pokemon {} updated successfully", updated.pokemon_id);
        Ok(updated)
    }

    pub async fn get(&self, pokemon_id: i32) -> CatalogResult<Pokemon> {
        debug!("Fetching pokemon {}", pokemon_id);
        self.store
            .get_by_pokemon_id(pokemon_id)
            .await?
            .ok_or_else(|| CatalogError::not_found_pokemon(pokemon_id))
    }

    pub async fn list(&self) -> CatalogResult<Vec<Pokemon>> {
        let all = self.store.list_all().await?;
        debug!("Listing {} registered pokemon", all.len());
        Ok(all)
    }

    pub async fn delete(&self, pokemon_id: i32) -> CatalogResult<()> {
        if !self.store.delete_by_pokemon_id(pokemon_id).await? {
            return Err(CatalogError::not_found_pokemon(pokemon_id));
        }
        info!("Pokemon {} deleted successfully", pokemon_id);
        Ok(())
    }

    pub async fn score(&self, pokemon_id: i32) -> CatalogResult<PokemonScore> {
        let pokemon = self.get(pokemon_id).await?;
        calculate_score(&ScoreInput::from(&pokemon))
    }
}

async fn ensure_unique(
    tx: &mut dyn CatalogTx,
    fields: &PokemonFields,
    excluding: Option<uuid::Uuid>,
) -> CatalogResult<()> {
    if tx.pokemon_id_taken(fields.pokemon_id, excluding).await? {
        return Err(CatalogError::DuplicateKey {
            field: "pokemon_id",
            value: fields.pokemon_id.to_string(),
        });
    }
    if tx.name_taken(&fields.name, excluding).await? {
        return Err(CatalogError::DuplicateKey {
            field: "name",
            value: fields.name.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BaseStats, PokemonRow, Tag, UpdateMode};
    use crate::store::MemoryCatalogStore;
    use async_trait::async_trait;
    use serde_json::json;
    use uuid::Uuid;

    fn service() -> (MemoryCatalogStore, PokemonService) {
        let store = MemoryCatalogStore::new();
        let service = PokemonService::new(Arc::new(store.clone()));
        (store, service)
    }

    fn bulbasaur() -> NewPokemon {
        NewPokemon::from_json(&json!({
            "pokemon_id": 1,
            "name": "bulbasaur",
            "height": 7,
            "weight": 69,
            "sprite_url": "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/1.png",
            "types": ["grass", "poison"],
            "abilities": ["overgrow", "chlorophyll"],
            "base_stats": { "hp": 45, "attack": 49, "defense": 49, "special_attack": 65, "special_defense": 65, "speed": 45 }
        }))
        .unwrap()
    }

    fn charizard() -> NewPokemon {
        NewPokemon::from_json(&json!({
            "pokemon_id": 6,
            "name": "charizard",
            "height": 17,
            "weight": 905,
            "sprite_url": "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/6.png",
            "types": ["fire", "flying"],
            "abilities": ["blaze", "solar-power"],
            "base_stats": { "hp": 78, "attack": 84, "defense": 78, "special_attack": 109, "special_defense": 85, "speed": 100 }
        }))
        .unwrap()
    }

    fn partial(body: serde_json::Value) -> PokemonPatch {
        PokemonPatch::from_json(&body, UpdateMode::Partial).unwrap()
    }

    /// Memory store whose units of work fail on the last write step.
    struct StatsWriteFails(MemoryCatalogStore);

    struct StatsWriteFailsTx(Box<dyn CatalogTx>);

    #[async_trait]
    impl CatalogStore for StatsWriteFails {
        async fn begin(&self) -> CatalogResult<Box<dyn CatalogTx>> {
            Ok(Box::new(StatsWriteFailsTx(self.0.begin().await?)))
        }

        async fn get_by_pokemon_id(&self, pokemon_id: i32) -> CatalogResult<Option<Pokemon>> {
            self.0.get_by_pokemon_id(pokemon_id).await
        }

        async fn list_all(&self) -> CatalogResult<Vec<Pokemon>> {
            self.0.list_all().await
        }

        async fn delete_by_pokemon_id(&self, pokemon_id: i32) -> CatalogResult<bool> {
            self.0.delete_by_pokemon_id(pokemon_id).await
        }

        async fn ping(&self) -> CatalogResult<()> {
            self.0.ping().await
        }
    }

    #[async_trait]
    impl CatalogTx for StatsWriteFailsTx {
        async fn find_by_pokemon_id(
            &mut self,
            pokemon_id: i32,
        ) -> CatalogResult<Option<PokemonRow>> {
            self.0.find_by_pokemon_id(pokemon_id).await
        }

        async fn pokemon_id_taken(
            &mut self,
            pokemon_id: i32,
            excluding: Option<Uuid>,
        ) -> CatalogResult<bool> {
            self.0.pokemon_id_taken(pokemon_id, excluding).await
        }

        async fn name_taken(&mut self, name: &str, excluding: Option<Uuid>) -> CatalogResult<bool> {
            self.0.name_taken(name, excluding).await
        }

        async fn insert_pokemon(&mut self, fields: &PokemonFields) -> CatalogResult<PokemonRow> {
            self.0.insert_pokemon(fields).await
        }

        async fn update_pokemon(
            &mut self,
            id: Uuid,
            fields: &PokemonFields,
        ) -> CatalogResult<PokemonRow> {
            self.0.update_pokemon(id, fields).await
        }

        async fn get_or_create_tag(&mut self, kind: TagKind, name: &str) -> CatalogResult<Tag> {
            self.0.get_or_create_tag(kind, name).await
        }

        async fn replace_tag_assignments(
            &mut self,
            pokemon: Uuid,
            kind: TagKind,
            tag_ids: &[i64],
        ) -> CatalogResult<()> {
            self.0.replace_tag_assignments(pokemon, kind, tag_ids).await
        }

        async fn delete_stats(&mut self, pokemon: Uuid) -> CatalogResult<u64> {
            self.0.delete_stats(pokemon).await
        }

        async fn insert_stats(&mut self, _pokemon: Uuid, _stats: &BaseStats) -> CatalogResult<()> {
            Err(CatalogError::Internal(anyhow::anyhow!("stats table unavailable")))
        }

        async fn load_aggregate(&mut self, id: Uuid) -> CatalogResult<Pokemon> {
            self.0.load_aggregate(id).await
        }

        async fn commit(self: Box<Self>) -> CatalogResult<()> {
            self.0.commit().await
        }
    }

    #[tokio::test]
    async fn test_create_round_trips_tags() {
        let (_, service) = service();
        let created = service.create(bulbasaur()).await.unwrap();

        assert_eq!(created.types, vec!["grass", "poison"]);
        assert_eq!(created.abilities, vec!["chlorophyll", "overgrow"]);

        let fetched = service.get(1).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_duplicate_pokemon_id_is_checked_first() {
        let (store, service) = service();
        service.create(bulbasaur()).await.unwrap();

        // Same id and same name: pokemon_id wins.
        let err = service.create(bulbasaur()).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::DuplicateKey {
                field: "pokemon_id",
                ..
            }
        ));

        let mut renamed = charizard();
        renamed.fields.name = "bulbasaur".into();
        let err = service.create(renamed).await.unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateKey { field: "name", .. }));

        assert_eq!(service.list().await.unwrap().len(), 1);
        assert_eq!(store.stat_block_count().await, 1);
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let (_, service) = service();
        let created = service.create(bulbasaur()).await.unwrap();

        let updated = service.update(1, partial(json!({ "height": 10 }))).await.unwrap();

        assert_eq!(updated.height, 10);
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.types, created.types);
        assert_eq!(updated.abilities, created.abilities);
        assert_eq!(updated.base_stats, created.base_stats);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_empty_lists_leave_tags_unchanged() {
        let (_, service) = service();
        service.create(bulbasaur()).await.unwrap();

        let updated = service
            .update(1, partial(json!({ "types": [], "abilities": [], "base_stats": {} })))
            .await
            .unwrap();
        assert_eq!(updated.types, vec!["grass", "poison"]);
        assert_eq!(updated.abilities, vec!["chlorophyll", "overgrow"]);
        assert!(updated.base_stats.is_some());
    }

    #[tokio::test]
    async fn test_update_replaces_tags_and_stats() {
        let (store, service) = service();
        service.create(bulbasaur()).await.unwrap();

        let updated = service
            .update(
                1,
                partial(json!({
                    "types": ["grass"],
                    "base_stats": { "hp": 60, "attack": 62, "defense": 63, "special_attack": 80, "special_defense": 80, "speed": 60 }
                })),
            )
            .await
            .unwrap();

        assert_eq!(updated.types, vec!["grass"]);
        assert_eq!(
            updated.base_stats,
            Some(BaseStats::from_positional([60, 62, 63, 80, 80, 60]))
        );
        assert_eq!(store.stat_block_count().await, 1);
        assert_eq!(store.tag_names(TagKind::Type).await, vec!["grass", "poison"]);
    }

    #[tokio::test]
    async fn test_update_rename_collision_changes_nothing() {
        let (_, service) = service();
        service.create(bulbasaur()).await.unwrap();
        let before = service.create(charizard()).await.unwrap();

        let err = service
            .update(6, partial(json!({ "name": "bulbasaur", "types": ["dragon"] })))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateKey { field: "name", .. }));
        assert_eq!(service.get(6).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_update_may_keep_own_name() {
        let (_, service) = service();
        service.create(bulbasaur()).await.unwrap();

        let updated = service
            .update(1, partial(json!({ "name": "bulbasaur", "pokemon_id": 1 })))
            .await
            .unwrap();
        assert_eq!(updated.name, "bulbasaur");
    }

    #[tokio::test]
    async fn test_update_missing_pokemon() {
        let (_, service) = service();
        let err = service.update(151, partial(json!({ "height": 4 }))).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_keeps_shared_tags() {
        let (store, service) = service();
        service.create(bulbasaur()).await.unwrap();
        let mut oddish = charizard();
        oddish.fields.pokemon_id = 43;
        oddish.fields.name = "oddish".into();
        oddish.types = vec!["grass".into(), "poison".into()];
        service.create(oddish).await.unwrap();

        service.delete(1).await.unwrap();

        assert!(matches!(service.get(1).await, Err(CatalogError::NotFound(_))));
        assert!(matches!(service.delete(1).await, Err(CatalogError::NotFound(_))));
        assert_eq!(service.get(43).await.unwrap().types, vec!["grass", "poison"]);
        assert_eq!(store.stat_block_count().await, 1);
    }

    #[tokio::test]
    async fn test_list_is_ordered_and_empty_when_none() {
        let (_, service) = service();
        assert!(service.list().await.unwrap().is_empty());

        service.create(charizard()).await.unwrap();
        service.create(bulbasaur()).await.unwrap();
        let ids: Vec<i32> = service.list().await.unwrap().iter().map(|p| p.pokemon_id).collect();
        assert_eq!(ids, vec![1, 6]);
    }

    #[tokio::test]
    async fn test_score() {
        let (_, service) = service();
        service.create(charizard()).await.unwrap();
        assert_eq!(service.score(6).await.unwrap().pokemon_score, 253.6);
        assert!(matches!(service.score(7).await, Err(CatalogError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_score_without_stats_is_missing_field() {
        let (_, service) = service();
        let mut mew = charizard();
        mew.base_stats = None;
        service.create(mew).await.unwrap();
        assert!(matches!(
            service.score(6).await,
            Err(CatalogError::MissingField("base_stats"))
        ));
    }

    #[tokio::test]
    async fn test_late_failure_rolls_back_update() {
        let (store, service) = service();
        let before = service.create(bulbasaur()).await.unwrap();

        let failing = PokemonService::new(Arc::new(StatsWriteFails(store.clone())));
        let err = failing
            .update(
                1,
                partial(json!({
                    "name": "ivysaur",
                    "height": 10,
                    "types": ["dragon"],
                    "abilities": ["levitate"],
                    "base_stats": { "hp": 60, "attack": 62, "defense": 63, "special_attack": 80, "special_defense": 80, "speed": 60 }
                })),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Internal(_)));

        // Row, tag edges and the old stat block are all as before.
        assert_eq!(service.get(1).await.unwrap(), before);
        assert_eq!(store.stat_block_count().await, 1);
        assert_eq!(store.tag_names(TagKind::Type).await, vec!["grass", "poison"]);
        assert_eq!(
            store.tag_names(TagKind::Ability).await,
            vec!["chlorophyll", "overgrow"]
        );
    }

    #[tokio::test]
    async fn test_late_failure_rolls_back_create() {
        let (store, _) = service();
        let failing = PokemonService::new(Arc::new(StatsWriteFails(store.clone())));

        assert!(failing.create(charizard()).await.is_err());

        assert!(store.list_all().await.unwrap().is_empty());
        assert!(store.tag_names(TagKind::Type).await.is_empty());
        assert_eq!(store.stat_block_count().await, 0);
    }

    #[tokio::test]
    async fn test_tag_names_sort_by_byte_order() {
        let (_, service) = service();
        let mut pikachu = charizard();
        pikachu.types = vec!["electric".into(), "Electric".into(), "bug".into()];

        let created = service.create(pikachu).await.unwrap();
        assert_eq!(created.types, vec!["Electric", "bug", "electric"]);
    }
}
