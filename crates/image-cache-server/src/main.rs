//! Image Cache Server - read-through, write-through cache for status images
//!
//! Serves images keyed by HTTP status code from a local cache directory,
//! fetching misses from a single upstream origin.

mod config;
mod error;
mod origin;
mod server;

use crate::config::Config;
use crate::error::Result;
use crate::origin::OriginClient;
use crate::server::{start_server, ServerState, SharedState};
use clap::Parser;
use image_cache_store::ImageStore;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter =
        EnvFilter::from_default_env().add_directive("image_cache_server=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting image cache server...");

    let config = Config::parse();
    info!("Host: {}", config.host);
    info!("Port: {}", config.port);
    info!("Cache dir: {:?}", config.cache_dir);
    info!("Origin: {}", config.origin_url);

    let store = ImageStore::new(config.cache_dir.clone());
    store.init().await?;

    let origin = OriginClient::new(&config.origin_url)?;

    let state: SharedState = Arc::new(ServerState::new(store, origin));

    start_server(state, &config.host, config.port).await?;

    Ok(())
}
