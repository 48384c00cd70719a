use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::backend::Backend;
use crate::driver::{self, ClientHandle, DriverConfig};
use crate::{
    ClientId, ClientRecord, ClientStore, Error, Metrics, Pattern, Result, Snapshot,
    UpdateBatcher, aggregate,
};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Delay between short-poll status checks.
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Entry point for running simulated clients against a [`Backend`].
///
/// Must be used from within a tokio runtime: every added client is driven by its own task.
#[derive(Debug)]
pub struct Engine<B: Backend> {
    backend: Arc<B>,
    store: Arc<ClientStore>,
    batcher: Arc<UpdateBatcher>,
    config: EngineConfig,
    epoch: Instant,
}

impl<B: Backend> Engine<B> {
    pub fn new(backend: B, config: EngineConfig) -> Self {
        let store = Arc::new(ClientStore::default());
        let batcher = UpdateBatcher::new(store.clone());
        Self {
            backend: Arc::new(backend),
            store,
            batcher,
            config,
            epoch: Instant::now(),
        }
    }

    /// Creates `count` pending clients and starts one driver task per client.
    ///
    /// Returns as soon as the tasks are spawned.
    pub fn add_clients(&self, count: usize, pattern: Pattern) -> Result<Vec<ClientId>> {
        if count == 0 {
            return Err(Error::InvalidCount);
        }

        let (generation, ids) = self.store.create(pattern, count);
        tracing::info!(%pattern, count, generation, "adding clients");

        let driver_config = DriverConfig {
            poll_interval: self.config.poll_interval,
        };
        for &id in &ids {
            let handle = ClientHandle::new(
                id,
                generation,
                self.store.clone(),
                self.batcher.clone(),
                self.epoch,
            );
            tokio::spawn(driver::drive(self.backend.clone(), handle, driver_config));
        }

        self.batcher.publish_now();
        Ok(ids)
    }

    /// Discards every client. Drivers still in flight keep running but their writes are dropped.
    pub fn clear_clients(&self) {
        let generation = self.store.clear();
        tracing::info!(generation, "cleared clients");
        self.batcher.publish_now();
    }

    /// Current store contents, in creation order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ClientRecord> {
        self.store.snapshot()
    }

    #[must_use]
    pub fn metrics(&self) -> Metrics {
        aggregate(&self.store.snapshot())
    }

    /// Batched snapshots; bursts of driver writes show up as a single change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.batcher.subscribe()
    }

    /// Resolves once no client is pending or running.
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        loop {
            rx.borrow_and_update();
            if !self.store.has_in_flight() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
