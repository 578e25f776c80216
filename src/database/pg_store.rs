//! PostgreSQL catalog store
//!
//! Runtime-checked SQL over a shared `PgPool`. A unit of work wraps one
//! database transaction; dropping it without commit rolls back.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{BaseStats, Pokemon, PokemonFields, PokemonRow, Tag, TagKind};
use crate::store::{CatalogStore, CatalogTx};

const POKEMON_COLUMNS: &str =
    "id, pokemon_id, name, height, weight, sprite_url, created_at, updated_at";

const STAT_COLUMNS: &str = "hp, attack, defense, special_attack, special_defense, speed";

/// Catalog store backed by PostgreSQL
#[derive(Clone, Debug)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn begin(&self) -> CatalogResult<Box<dyn CatalogTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgCatalogTx { tx }))
    }

    async fn get_by_pokemon_id(&self, pokemon_id: i32) -> CatalogResult<Option<Pokemon>> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, PokemonRow>(&format!(
            "SELECT {} FROM pokemon WHERE pokemon_id = $1",
            POKEMON_COLUMNS
        ))
        .bind(pokemon_id)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => Ok(Some(assemble(&mut *conn, row).await?)),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> CatalogResult<Vec<Pokemon>> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, PokemonRow>(&format!(
            "SELECT {} FROM pokemon ORDER BY pokemon_id",
            POKEMON_COLUMNS
        ))
        .fetch_all(&mut *conn)
        .await?;

        let mut types = tag_names_by_pokemon(&mut *conn, TagKind::Type).await?;
        let mut abilities = tag_names_by_pokemon(&mut *conn, TagKind::Ability).await?;

        let stat_rows = sqlx::query_as::<_, (Uuid, i32, i32, i32, i32, i32, i32)>(&format!(
            "SELECT DISTINCT ON (pokemon_id) pokemon_id, {} FROM stats ORDER BY pokemon_id, id",
            STAT_COLUMNS
        ))
        .fetch_all(&mut *conn)
        .await?;
        let mut stats: HashMap<Uuid, BaseStats> = stat_rows
            .into_iter()
            .map(|(id, hp, atk, def, spa, spd, spe)| {
                (id, BaseStats::from_positional([hp, atk, def, spa, spd, spe]))
            })
            .collect();

        debug!("Loaded {} pokemon rows", rows.len());

        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                Pokemon::assemble(
                    row,
                    types.remove(&id).unwrap_or_default(),
                    abilities.remove(&id).unwrap_or_default(),
                    stats.remove(&id),
                )
            })
            .collect())
    }

    async fn delete_by_pokemon_id(&self, pokemon_id: i32) -> CatalogResult<bool> {
        let result = sqlx::query("DELETE FROM pokemon WHERE pokemon_id = $1")
            .bind(pokemon_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> CatalogResult<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

/// One PostgreSQL transaction
pub struct PgCatalogTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CatalogTx for PgCatalogTx {
    async fn find_by_pokemon_id(&mut self, pokemon_id: i32) -> CatalogResult<Option<PokemonRow>> {
        let row = sqlx::query_as::<_, PokemonRow>(&format!(
            "SELECT {} FROM pokemon WHERE pokemon_id = $1 FOR UPDATE",
            POKEMON_COLUMNS
        ))
        .bind(pokemon_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn pokemon_id_taken(
        &mut self,
        pokemon_id: i32,
        excluding: Option<Uuid>,
    ) -> CatalogResult<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM pokemon WHERE pokemon_id = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(pokemon_id)
        .bind(excluding)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(taken)
    }

    async fn name_taken(&mut self, name: &str, excluding: Option<Uuid>) -> CatalogResult<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM pokemon WHERE name = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(excluding)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(taken)
    }

    async fn insert_pokemon(&mut self, fields: &PokemonFields) -> CatalogResult<PokemonRow> {
        sqlx::query_as::<_, PokemonRow>(&format!(
            r#"
            INSERT INTO pokemon (id, pokemon_id, name, height, weight, sprite_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            POKEMON_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(fields.pokemon_id)
        .bind(&fields.name)
        .bind(fields.height)
        .bind(fields.weight)
        .bind(&fields.sprite_url)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_write_error(e, fields))
    }

    async fn update_pokemon(
        &mut self,
        id: Uuid,
        fields: &PokemonFields,
    ) -> CatalogResult<PokemonRow> {
        sqlx::query_as::<_, PokemonRow>(&format!(
            r#"
            UPDATE pokemon
            SET pokemon_id = $2, name = $3, height = $4, weight = $5, sprite_url = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            POKEMON_COLUMNS
        ))
        .bind(id)
        .bind(fields.pokemon_id)
        .bind(&fields.name)
        .bind(fields.height)
        .bind(fields.weight)
        .bind(&fields.sprite_url)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_write_error(e, fields))?
        .ok_or_else(|| CatalogError::NotFound(format!("pokemon {}", id)))
    }

    async fn get_or_create_tag(&mut self, kind: TagKind, name: &str) -> CatalogResult<Tag> {
        let sql = match kind {
            TagKind::Type => {
                "INSERT INTO types (name) VALUES ($1) \
                 ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name RETURNING id"
            }
            TagKind::Ability => {
                "INSERT INTO abilities (name) VALUES ($1) \
                 ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name RETURNING id"
            }
        };
        let id: i64 = sqlx::query_scalar(sql)
            .bind(name)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(Tag {
            id,
            name: name.to_string(),
        })
    }

    async fn replace_tag_assignments(
        &mut self,
        pokemon: Uuid,
        kind: TagKind,
        tag_ids: &[i64],
    ) -> CatalogResult<()> {
        let (clear, assign) = match kind {
            TagKind::Type => (
                "DELETE FROM pokemon_types WHERE pokemon_id = $1",
                "INSERT INTO pokemon_types (pokemon_id, type_id) \
                 SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING",
            ),
            TagKind::Ability => (
                "DELETE FROM pokemon_abilities WHERE pokemon_id = $1",
                "INSERT INTO pokemon_abilities (pokemon_id, ability_id) \
                 SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING",
            ),
        };

        sqlx::query(clear)
            .bind(pokemon)
            .execute(&mut *self.tx)
            .await?;

        if !tag_ids.is_empty() {
            sqlx::query(assign)
                .bind(pokemon)
                .bind(tag_ids.to_vec())
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }

    async fn delete_stats(&mut self, pokemon: Uuid) -> CatalogResult<u64> {
        let result = sqlx::query("DELETE FROM stats WHERE pokemon_id = $1")
            .bind(pokemon)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_stats(&mut self, pokemon: Uuid, stats: &BaseStats) -> CatalogResult<()> {
        sqlx::query(&format!(
            "INSERT INTO stats (pokemon_id, {}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            STAT_COLUMNS
        ))
        .bind(pokemon)
        .bind(stats.hp)
        .bind(stats.attack)
        .bind(stats.defense)
        .bind(stats.special_attack)
        .bind(stats.special_defense)
        .bind(stats.speed)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn load_aggregate(&mut self, id: Uuid) -> CatalogResult<Pokemon> {
        let row = sqlx::query_as::<_, PokemonRow>(&format!(
            "SELECT {} FROM pokemon WHERE id = $1",
            POKEMON_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("pokemon {}", id)))?;

        assemble(&mut *self.tx, row).await
    }

    async fn commit(self: Box<Self>) -> CatalogResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

async fn assemble(conn: &mut PgConnection, row: PokemonRow) -> CatalogResult<Pokemon> {
    let types = tag_names_for(conn, TagKind::Type, row.id).await?;
    let abilities = tag_names_for(conn, TagKind::Ability, row.id).await?;
    let base_stats = sqlx::query_as::<_, BaseStats>(&format!(
        "SELECT {} FROM stats WHERE pokemon_id = $1 ORDER BY id LIMIT 1",
        STAT_COLUMNS
    ))
    .bind(row.id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(Pokemon::assemble(row, types, abilities, base_stats))
}

async fn tag_names_for(
    conn: &mut PgConnection,
    kind: TagKind,
    pokemon: Uuid,
) -> CatalogResult<Vec<String>> {
    let sql = match kind {
        TagKind::Type => {
            "SELECT t.name FROM types t JOIN pokemon_types pt ON pt.type_id = t.id \
             WHERE pt.pokemon_id = $1 ORDER BY t.name COLLATE \"C\""
        }
        TagKind::Ability => {
            "SELECT a.name FROM abilities a JOIN pokemon_abilities pa ON pa.ability_id = a.id \
             WHERE pa.pokemon_id = $1 ORDER BY a.name COLLATE \"C\""
        }
    };
    let names: Vec<String> = sqlx::query_scalar(sql)
        .bind(pokemon)
        .fetch_all(&mut *conn)
        .await?;
    Ok(names)
}

async fn tag_names_by_pokemon(
    conn: &mut PgConnection,
    kind: TagKind,
) -> CatalogResult<HashMap<Uuid, Vec<String>>> {
    let sql = match kind {
        TagKind::Type => {
            "SELECT pt.pokemon_id, t.name FROM types t JOIN pokemon_types pt ON pt.type_id = t.id \
             ORDER BY t.name COLLATE \"C\""
        }
        TagKind::Ability => {
            "SELECT pa.pokemon_id, a.name FROM abilities a \
             JOIN pokemon_abilities pa ON pa.ability_id = a.id ORDER BY a.name COLLATE \"C\""
        }
    };
    let pairs: Vec<(Uuid, String)> = sqlx::query_as(sql).fetch_all(&mut *conn).await?;

    let mut grouped: HashMap<Uuid, Vec<String>> = HashMap::new();
    for (pokemon, name) in pairs {
        grouped.entry(pokemon).or_default().push(name);
    }
    Ok(grouped)
}

/// Unique violations become `DuplicateKey` for the offending column.
fn map_write_error(error: sqlx::Error, fields: &PokemonFields) -> CatalogError {
    if let sqlx::Error::Database(db_err) = &error {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some("pokemon_pokemon_id_key") => {
                    return CatalogError::DuplicateKey {
                        field: "pokemon_id",
                        value: fields.pokemon_id.to_string(),
                    }
                }
                Some("pokemon_name_key") => {
                    return CatalogError::DuplicateKey {
                        field: "name",
                        value: fields.name.clone(),
                    }
                }
                _ => {}
            }
        }
    }
    error.into()
}
