//! Catalog handlers: public listing and protected admin edits.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::auth::CurrentUser;
use crate::catalog::MoviePayload;

/// Body of a successful admin mutation.
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub ok: bool,
    pub message: String,
}

impl MutationResponse {
    fn ok() -> Json<Value> {
        Json(json!({
            "response": MutationResponse {
                ok: true,
                message: String::new(),
            }
        }))
    }
}

fn id_from_path(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|rejection| ApiError::bad_request(format!("invalid id: {}", rejection.body_text())))
}

/// Get one movie by id.
pub async fn get_movie(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let id = id_from_path(path)?;
    let movie = state
        .catalog
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("movie {id}")))?;

    Ok(Json(json!({ "movie": movie })))
}

/// List every movie ordered by title.
pub async fn all_movies(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let movies = state.catalog.all(None).await?;
    Ok(Json(json!({ "movies": movies })))
}

/// List the movies linked to one genre.
pub async fn movies_by_genre(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let genre_id = id_from_path(path)?;
    let movies = state.catalog.all(Some(genre_id)).await?;
    Ok(Json(json!({ "movies": movies })))
}

/// List every genre ordered by name.
pub async fn all_genres(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let genres = state.catalog.genres_all().await?;
    Ok(Json(json!({ "genres": genres })))
}

/// Create (`id == "0"`) or update a movie.
pub async fn edit_movie(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<MoviePayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(payload) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let (id, input) = payload.parse().map_err(ApiError::bad_request)?;
    check_genres(&state, &payload.genre_ids).await?;

    let (status, movie_id) = if id == 0 {
        let created = state.catalog.insert(&input).await?;
        info!(account_id = user.id, movie_id = created, "movie created");
        (StatusCode::CREATED, created)
    } else {
        state.catalog.update(id, &input).await?;
        info!(account_id = user.id, movie_id = id, "movie updated");
        (StatusCode::OK, id)
    };

    for genre_id in &payload.genre_ids {
        state.catalog.add_genre(movie_id, *genre_id).await?;
    }

    Ok((status, MutationResponse::ok()))
}

async fn check_genres(state: &AppState, genre_ids: &[i64]) -> ApiResult<()> {
    if genre_ids.is_empty() {
        return Ok(());
    }

    let known = state.catalog.genres_all().await?;
    match genre_ids
        .iter()
        .find(|id| !known.iter().any(|genre| genre.id == **id))
    {
        Some(unknown) => Err(ApiError::bad_request(format!("unknown genre: {unknown}"))),
        None => Ok(()),
    }
}

/// Delete a movie.
pub async fn delete_movie(
    State(state): State<AppState>,
    user: CurrentUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let id = id_from_path(path)?;
    state.catalog.delete(id).await?;
    info!(account_id = user.id, movie_id = id, "movie deleted");
    Ok(MutationResponse::ok())
}
