// src/lib.rs

pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod notifier;
pub mod poller;
pub mod store;

use tokio::time::Duration;
use tracing::info;

use crate::config::{PollerConfig, StorageBackend};
use crate::error::Error;
use crate::feed::HttpFetcher;
use crate::notifier::LogglySink;
use crate::poller::Poller;
use crate::store::TableStore;
use crate::store::dynamo::DynamoStore;
use crate::store::memory::MemoryStore;

/// Wires the configured collaborators together and polls until a fatal error.
pub async fn run_poller(cfg: &PollerConfig) -> Result<(), Error> {
    match cfg.storage.backend {
        StorageBackend::Dynamodb => {
            let store = DynamoStore::connect(&cfg.storage).await;
            run_with_store(cfg, store).await
        }
        StorageBackend::Memory => {
            info!("🧪 Using in-memory table store; nothing will persist past this process.");
            run_with_store(cfg, MemoryStore::new()).await
        }
    }
}

async fn run_with_store<S: TableStore>(cfg: &PollerConfig, store: S) -> Result<(), Error> {
    let source = HttpFetcher::new(cfg.endpoint_url.clone());
    let sink = LogglySink::new(&cfg.log_sink);

    info!(
        "✅ Polling {} every {}s into table {}",
        source.url(),
        cfg.poll_interval_secs,
        cfg.table_name
    );

    let poller = Poller::new(
        source,
        store,
        sink,
        cfg.table_name.clone(),
        Duration::from_secs(cfg.poll_interval_secs),
    );
    poller.run().await
}
