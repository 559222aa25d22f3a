use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::{Cache, Catalog},
    middleware::{make_span_with_request_id, request_id_middleware, JwtKeys},
    services::RecommendationService,
};

pub mod movies;
pub mod recommendations;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<RecommendationService>,
    pub catalog: Arc<dyn Catalog>,
    /// Movie cache; `None` when Redis is not configured
    pub cache: Option<Cache>,
    pub auth: Arc<JwtKeys>,
}

impl FromRef<AppState> for Arc<JwtKeys> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/recommendations", post(recommendations::recommend))
        .route("/movies/:movie_id", get(movies::get_movie))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
