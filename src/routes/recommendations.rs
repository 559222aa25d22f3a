use axum::{extract::State, Extension, Json};

use crate::{
    error::AppResult,
    middleware::{AuthenticatedClient, RequestId},
    models::{RecommendationRequest, RecommendationResponse},
    routes::AppState,
};

/// Records the reported ratings and recommends one unseen movie
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    client: AuthenticatedClient,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    tracing::info!(
        request_id = %request_id,
        client = %client.name,
        user_id = ?request.user.user_id,
        reports = request.list_movie.list_movie.len(),
        "Recommendation requested"
    );

    let response = state.recommender.recommend(&request).await?;
    Ok(Json(response))
}
