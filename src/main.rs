use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dakregistry::{
    auth,
    config::AppConfig,
    db, routes,
    state::AppState,
    storage::{AttachmentStore, LocalAttachmentStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    config.ensure_directories()?;

    let pool = db::init_pool(&config.database_url)?;
    db::run_migrations(&pool)?;
    {
        let mut conn = pool.get().context("failed to acquire seeding connection")?;
        auth::seed_default_users(&mut conn)?;
    }

    let attachments: Arc<dyn AttachmentStore> =
        Arc::new(LocalAttachmentStore::new(config.upload_dir.clone()));
    let address = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::new(pool, config, attachments);
    let router = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(%address, "document registry listening");
    axum::serve(listener, router).await?;
    Ok(())
}
