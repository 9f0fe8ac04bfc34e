mod api;
mod config;
mod engine;
mod error;
mod lookback;
mod store;
mod types;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::engine::SentimentEngine;
use crate::error::Result;
use crate::store::ElasticClient;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(LatencyStats::new());

    let client = ElasticClient::new(&cfg, Arc::clone(&health), Arc::clone(&latency))?;
    info!(
        "Document store: {}/{} (timeout {}s, max {} composite pages)",
        cfg.store_url, cfg.store_index, cfg.store_timeout_secs, cfg.composite_max_pages,
    );

    let engine = SentimentEngine::new(Arc::new(client), &cfg);
    info!(
        "Engine ready: {} roster entries, {} periods, season from {}",
        cfg.roster.len(),
        engine.lookbacks().profiles().len(),
        cfg.season_start.format("%Y-%m-%d"),
    );

    let app = router(ApiState {
        engine: Arc::new(engine),
        health,
        latency,
    });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
