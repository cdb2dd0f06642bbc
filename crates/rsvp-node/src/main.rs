//! # RSVP Node
//!
//! Runs one rendezvous node: loads configuration, opens the record store,
//! binds the HTTP listener and serves until Ctrl+C.
//!
//! Nodes that must rendezvous with each other share one record store and
//! reach each other at their configured public identity.

mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use rsvp_gateway::domain::config::StorageConfig;
use rsvp_gateway::{bind, InMemoryRsvpStore, RsvpStore, StorageBackend, SystemTimeSource};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Open the configured record store.
fn open_store(config: &StorageConfig) -> Result<Arc<dyn RsvpStore>> {
    match config.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory record store; RSVPs are lost on restart and not shared");
            Ok(Arc::new(InMemoryRsvpStore::new()))
        }
        #[cfg(feature = "rocksdb")]
        StorageBackend::Rocksdb => {
            let store = rsvp_gateway::RocksDbRsvpStore::open(&config.path).with_context(|| {
                format!("Failed to open RocksDB store at {}", config.path.display())
            })?;
            info!(path = %config.path.display(), "Opened RocksDB record store");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::Rocksdb => {
            anyhow::bail!("RocksDB storage requested but rsvp-node was built without the `rocksdb` feature")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(version = rsvp_gateway::VERSION, "Starting RSVP node");

    // Load configuration
    let config = config::load_config()?;
    let store = open_store(&config.storage)?;

    let server = bind(config, store, Arc::new(SystemTimeSource))
        .await
        .context("Failed to start RSVP node")?;
    info!(addr = %server.local_addr(), "Node is running. Press Ctrl+C to stop.");

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C, shutting down");
            }
        })
        .await
        .context("RSVP node terminated with an error")?;

    Ok(())
}
