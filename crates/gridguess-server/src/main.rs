//! Gridguess game server.

use gridguess_core::EnergyMixHints;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod data;
mod protocol;
mod server;
mod sessions;

use config::ServerConfig;
use server::ServerState;
use sessions::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    info!("Starting Gridguess server...");

    let catalog = Arc::new(data::load_catalog(&config)?);
    let sessions = SessionStore::new(config.max_attempts, config.session_ttl);
    let state = Arc::new(ServerState::new(catalog, sessions, Arc::new(EnergyMixHints)));

    let sweep_every = config.session_ttl.min(Duration::from_secs(60));
    tokio::spawn(server::sweep_sessions(Arc::clone(&state), sweep_every));

    server::run_server(config.addr, state).await
}
