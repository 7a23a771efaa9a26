//! services/api/src/bin/seed.rs
//!
//! Fills an empty database with the demo catalog and accounts.

use api_lib::{adapters::DbAdapter, config::Config, error::ApiError, seed::seed_demo_data};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    let db_adapter = DbAdapter::new(db_pool);
    db_adapter.run_migrations().await?;

    if let Some(counts) = seed_demo_data(&db_adapter).await? {
        info!(
            users = counts.users,
            courses = counts.courses,
            modules = counts.modules,
            resources = counts.resources,
            videos = counts.videos,
            pdfs = counts.pdfs,
            activities = counts.activities,
            "Sample data has been added"
        );
    }
    Ok(())
}
