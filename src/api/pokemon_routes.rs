//! Pokémon catalog API endpoints
//!
//! Mounted under `/pokemon`. Scoring and provider lookups
//! collapse their failures into a bare 404 (`{}` and `[]` respectively).

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::error::AppError;
use super::AppState;
use crate::error::CatalogError;
use crate::models::{NewPokemon, Pokemon, PokemonPatch, UpdateMode};

/// Routes relative to the `/pokemon` prefix
pub fn pokemon_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(add_pokemon))
        .route("/get/id/:pokemon_id", get(get_pokemon))
        .route("/get/id/:pokemon_id/", get(get_pokemon))
        .route("/score/:pokemon_id", get(score_pokemon))
        .route("/all-pokemons-registered", get(list_pokemon))
        .route("/find/name-id/:query", get(find_pokemon))
        .route("/delete/:pokemon_id", delete(delete_pokemon))
        .route(
            "/update/:pokemon_id",
            put(update_pokemon_full).patch(update_pokemon_partial),
        )
}

/// Path ids that are not integers address nothing.
fn parse_pokemon_id(raw: &str) -> Result<i32, AppError> {
    raw.parse::<i32>()
        .map_err(|_| AppError(CatalogError::NotFound(format!("pokemon '{}'", raw))))
}

/// POST /pokemon/add
async fn add_pokemon(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Pokemon>), AppError> {
    let Json(body) = body?;
    let request = NewPokemon::from_json(&body)?;
    let created = state.service.create(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /pokemon/get/id/:pokemon_id
async fn get_pokemon(
    State(state): State<AppState>,
    Path(pokemon_id): Path<String>,
) -> Result<Json<Pokemon>, AppError> {
    let pokemon_id = parse_pokemon_id(&pokemon_id)?;
    Ok(Json(state.service.get(pokemon_id).await?))
}

/// GET /pokemon/score/:pokemon_id
async fn score_pokemon(
    State(state): State<AppState>,
    Path(pokemon_id): Path<String>,
) -> Response {
    let Ok(pokemon_id) = pokemon_id.parse::<i32>() else {
        return (StatusCode::NOT_FOUND, Json(json!({}))).into_response();
    };
    match state.service.score(pokemon_id).await {
        Ok(score) => Json(score).into_response(),
        Err(e) => {
            debug!("Score for pokemon {} unavailable: {}", pokemon_id, e);
            (StatusCode::NOT_FOUND, Json(json!({}))).into_response()
        }
    }
}

/// GET /pokemon/all-pokemons-registered
async fn list_pokemon(State(state): State<AppState>) -> Result<Json<Vec<Pokemon>>, AppError> {
    Ok(Json(state.service.list().await?))
}

/// GET /pokemon/find/name-id/:query
async fn find_pokemon(State(state): State<AppState>, Path(query): Path<String>) -> Response {
    match state.lookup.lookup(&query).await {
        Ok(data) => Json(vec![data]).into_response(),
        Err(e) => {
            info!("Lookup for '{}' returned nothing: {}", query, e);
            (StatusCode::NOT_FOUND, Json(json!([]))).into_response()
        }
    }
}

/// DELETE /pokemon/delete/:pokemon_id
async fn delete_pokemon(
    State(state): State<AppState>,
    Path(pokemon_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let pokemon_id = parse_pokemon_id(&pokemon_id)?;
    state.service.delete(pokemon_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /pokemon/update/:pokemon_id
async fn update_pokemon_full(
    state: State<AppState>,
    path: Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Pokemon>, AppError> {
    update_pokemon(state, path, body, UpdateMode::Full).await
}

/// PATCH /pokemon/update/:pokemon_id
async fn update_pokemon_partial(
    state: State<AppState>,
    path: Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Pokemon>, AppError> {
    update_pokemon(state, path, body, UpdateMode::Partial).await
}

async fn update_pokemon(
    State(state): State<AppState>,
    Path(pokemon_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
    mode: UpdateMode,
) -> Result<Json<Pokemon>, AppError> {
    let pokemon_id = parse_pokemon_id(&pokemon_id)?;
    // Unknown targets are a 404 even when the body is also invalid.
    state.service.get(pokemon_id).await?;
    let Json(body) = body?;
    let patch = PokemonPatch::from_json(&body, mode)?;
    Ok(Json(state.service.update(pokemon_id, patch).await?))
}
