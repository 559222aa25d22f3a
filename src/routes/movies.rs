use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    cached,
    db::CacheKey,
    error::{AppError, AppResult},
    middleware::AuthenticatedClient,
    models::Movie,
    routes::AppState,
};

/// Seconds a cached movie stays valid
const MOVIE_CACHE_TTL: u64 = 3600;

/// Fetches a single movie by id
pub async fn get_movie(
    State(state): State<AppState>,
    _client: AuthenticatedClient,
    Path(movie_id): Path<i32>,
) -> AppResult<Json<Movie>> {
    let lookup = async {
        state
            .catalog
            .get_movie(movie_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", movie_id)))
    };

    let movie: Movie = match &state.cache {
        Some(cache) => cached!(cache, CacheKey::Movie(movie_id), MOVIE_CACHE_TTL, lookup),
        None => lookup.await?,
    };

    Ok(Json(movie))
}
