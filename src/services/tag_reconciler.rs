//! Tag reconciliation for types and abilities
//!
//! Rewrites a Pokémon's assignment for one tag namespace so it matches a
//! requested name list exactly, creating unknown tags on the way. Names are
//! matched byte for byte; "Fire" and "fire" are different tags.

use tracing::debug;
use uuid::Uuid;

use crate::error::CatalogResult;
use crate::models::{Tag, TagKind};
use crate::store::CatalogTx;

/// Resolve every requested name to a tag entity, first occurrence wins.
pub async fn resolve_tags(
    tx: &mut dyn CatalogTx,
    kind: TagKind,
    names: &[String],
) -> CatalogResult<Vec<Tag>> {
    let mut resolved: Vec<Tag> = Vec::with_capacity(names.len());
    for name in names {
        if resolved.iter().any(|tag| &tag.name == name) {
            continue;
        }
        resolved.push(tx.get_or_create_tag(kind, name).await?);
    }
    Ok(resolved)
}

/// Replace `pokemon`'s whole `kind` assignment with exactly `names`.
///
/// Runs inside the caller's unit of work; tags assigned to other Pokémon are
/// never touched.
pub async fn reconcile_tags(
    tx: &mut dyn CatalogTx,
    pokemon: Uuid,
    kind: TagKind,
    names: &[String],
) -> CatalogResult<Vec<Tag>> {
    let resolved = resolve_tags(tx, kind, names).await?;
    let ids: Vec<i64> = resolved.iter().map(|tag| tag.id).collect();
    tx.replace_tag_assignments(pokemon, kind, &ids).await?;
    debug!(
        "Reconciled {} {} tag(s) for pokemon {}",
        resolved.len(),
        kind,
        pokemon
    );
    Ok(resolved)
}
