use std::sync::Arc;

use hookstorm::{
    api,
    clock::{SystemClock, TtlPolicy},
    config::AppConfig,
    db::memory::MemoryStore,
    replay::ReplayEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hookstorm=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env().map_err(|err| anyhow::anyhow!(err.to_string()))?;
    tracing::info!(
        expiry_seconds = config.webhook_expiry_seconds,
        "webhook expiry configured"
    );

    let store = MemoryStore::new(
        Arc::new(SystemClock),
        TtlPolicy::new(config.webhook_expiry_seconds),
    );
    let app = api::router(api::AppState {
        store: Arc::new(store),
        replayer: ReplayEngine::new(config.replay_timeout)?,
        max_webhook_size_bytes: config.max_webhook_size_bytes,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
