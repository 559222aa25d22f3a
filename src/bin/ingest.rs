use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use movie_reco_api::{
    config::Config,
    db::{create_pool, run_migrations},
    services::ingest::ingest_all,
};

/// Loads the catalog CSV exports into PostgreSQL.
///
/// Usage: `ingest [DIR]`, where DIR defaults to `INGEST_DIR`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.ingest_dir.clone());

    let pool = create_pool(
        &config.database_url,
        config.db_max_connections,
        Duration::from_secs(config.db_acquire_timeout_secs),
    )
    .await
    .context("Failed to connect to PostgreSQL")?;
    run_migrations(&pool).await?;

    let reports = ingest_all(&pool, &root)
        .await
        .with_context(|| format!("Ingest of {} failed", root.display()))?;

    if reports.is_empty() {
        anyhow::bail!("No source files found under {}", root.display());
    }

    for report in &reports {
        match &report.bad_rows_path {
            Some(path) => tracing::warn!(
                table = %report.table,
                inserted = report.inserted,
                rejected = report.rejected,
                bad_rows = %path.display(),
                "Some rows were not ingested"
            ),
            None => tracing::info!(table = %report.table, inserted = report.inserted, "All rows ingested"),
        }
    }

    Ok(())
}
