use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use movie_reco_api::{
    config::Config,
    db::{create_pool, create_redis_client, run_migrations, Cache, PgStore},
    middleware::JwtKeys,
    routes::{create_router, AppState},
    services::{FailedUpdateSpill, GenreModel, RecommendationService},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,movie_reco_api=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(
        &config.database_url,
        config.db_max_connections,
        Duration::from_secs(config.db_acquire_timeout_secs),
    )
    .await
    .context("Failed to connect to PostgreSQL")?;
    run_migrations(&pool).await.context("Failed to run migrations")?;
    let store = Arc::new(PgStore::new(pool));

    let (cache, cache_writer) = match &config.redis_url {
        Some(url) => {
            let (cache, writer) = Cache::new(create_redis_client(url)?)
                .await
                .context("Failed to connect to Redis")?;
            (Some(cache), Some(writer))
        }
        None => {
            tracing::warn!("REDIS_URL not set, movie cache disabled");
            (None, None)
        }
    };

    let model = Arc::new(
        GenreModel::load(&config.model_path)
            .with_context(|| format!("Failed to load model {}", config.model_path.display()))?,
    );

    let recommender = RecommendationService::new(
        store.clone(),
        store.clone(),
        model,
        FailedUpdateSpill::new(&config.failed_updates_dir),
    );

    let state = AppState {
        recommender: Arc::new(recommender),
        catalog: store,
        cache,
        auth: Arc::new(JwtKeys::from_secret(&config.jwt_secret)),
    };
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
