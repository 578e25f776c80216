//! PokeAPI client
//!
//! Read-only proxy for `GET {base_url}/pokemon/{name-or-id}`. Nothing here
//! touches the catalog store.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use super::types::{PokeApiPokemon, PokemonData};
use crate::config::LookupConfig;
use crate::error::{CatalogError, CatalogResult};

#[derive(Debug, Clone)]
pub struct PokeApiClient {
    client: Client,
    base_url: Url,
}

impl PokeApiClient {
    pub fn new(config: &LookupConfig) -> CatalogResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                CatalogError::Internal(anyhow::anyhow!("Failed to create HTTP client: {}", e))
            })?;

        let base_url = Url::parse(config.base_url.trim_end_matches('/')).map_err(|e| {
            CatalogError::Internal(anyhow::anyhow!(
                "Invalid PokeAPI base URL '{}': {}",
                config.base_url,
                e
            ))
        })?;

        Ok(Self { client, base_url })
    }

    /// `{base_url}/pokemon/{query}`, with the query as one encoded segment.
    pub fn pokemon_url(&self, query: &str) -> CatalogResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                CatalogError::Internal(anyhow::anyhow!(
                    "PokeAPI base URL '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("pokemon")
            .push(query);
        Ok(url)
    }

    /// Fetch and normalize one Pokémon by name or numeric id.
    pub async fn lookup(&self, query: &str) -> CatalogResult<PokemonData> {
        if query.trim().is_empty() {
            return Err(CatalogError::NotFound("empty lookup query".to_string()));
        }

        let url = self.pokemon_url(query)?;
        debug!("Looking up '{}' at {}", query, url);

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!("PokeAPI request for '{}' failed: {}", query, e);
            CatalogError::UpstreamError(e.to_string())
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(format!("pokeapi has no pokemon '{}'", query)));
        }
        if status != StatusCode::OK {
            warn!("PokeAPI returned {} for '{}'", status, query);
            return Err(CatalogError::UpstreamError(format!(
                "PokeAPI returned {}",
                status
            )));
        }

        let body = response.text().await.map_err(|e| {
            CatalogError::UpstreamError(format!("Failed to read response body: {}", e))
        })?;

        let record: PokeApiPokemon = serde_json::from_str(&body)
            .map_err(|e| CatalogError::UnexpectedShape(e.to_string()))?;

        record.normalize()
    }
}
