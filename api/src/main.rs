use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use shared::Config;
use tracing::{error, info};
use vortex_engine::engine::{EngineSettings, StrategyEngine};
use vortex_engine::exchange::{OkxFeed, PaperClient};

mod routes;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting Vortex strategy server...");

    let config = Config::from_env()?;
    let settings = EngineSettings {
        tick_interval: Duration::from_secs(config.tick_interval_secs),
        order_timeout: Duration::from_secs(config.order_timeout_secs),
        initial_balance: config.initial_balance,
        state_file: Some(config.state_file.clone().into()),
    };

    let feed = Arc::new(OkxFeed::new(&config.okx_base_url));
    let client = Arc::new(PaperClient::new());
    let engine = Arc::new(StrategyEngine::new(settings, feed, client));

    if let Err(err) = engine.load_state().await {
        error!("failed to restore engine state, starting fresh: {err}");
    }

    tokio::spawn(engine.clone().run());
    tokio::spawn(
        engine
            .clone()
            .run_persistence(Duration::from_secs(config.persist_interval_secs)),
    );
    info!("Background service started: market data & bot logic running");

    let app = routes::router(engine);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("API server listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
