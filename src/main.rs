mod api;
mod config;
mod db;
mod error;
mod ingest;
mod mail;
mod state;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::db::{MatchRegistry, SnapshotStore};
use crate::error::Result;
use crate::mail::{CodeProvider, DisabledCodeProvider, GmailCodeProvider};
use crate::state::{BatchClock, CycleState};

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
    // --- Database setup ---
    let pool = db::open(&cfg.db_path).await?;
    let last_ts = db::max_batch_ts(&pool).await?.unwrap_or(0);
    info!(last_batch_ts = last_ts, "Database ready at {}", cfg.db_path);

    let registry = MatchRegistry::new(pool.clone());
    let snapshots = SnapshotStore::new(
        pool.clone(),
        registry.clone(),
        Arc::new(BatchClock::seeded(last_ts)),
        cfg.read_concurrency,
    );

    // --- Verification code provider ---
    let codes: Arc<dyn CodeProvider> = match cfg.gmail_access_token.clone() {
        Some(token) => {
            info!(mailbox = %cfg.code_mailbox, sender = %cfg.code_sender_filter, "Gmail code provider enabled");
            Arc::new(GmailCodeProvider::new(&cfg, token)?)
        }
        None => {
            warn!("GMAIL_ACCESS_TOKEN not set, /api/get_code will always return null");
            Arc::new(DisabledCodeProvider)
        }
    };

    // --- HTTP API server ---
    let api_state = ApiState {
        registry,
        snapshots,
        health: Arc::new(HealthState::new()),
        latency: Arc::new(LatencyStats::new()),
        cycle: Arc::new(CycleState::new()),
        codes,
        code_mailbox: cfg.code_mailbox.clone(),
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
