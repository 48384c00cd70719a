use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use crate::{ClientRecord, ClientStore};

/// Point-in-time view of every client, as published to consumers.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Publication counter (0 = nothing published yet).
    pub version: u64,
    /// Store generation the records were read under.
    pub generation: u64,
    pub clients: Vec<ClientRecord>,
}

impl Snapshot {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.clients.iter().all(|c| c.status.is_terminal())
    }
}

/// Coalesces store writes into published snapshots.
///
/// Writes land in the [`ClientStore`] immediately. [`UpdateBatcher::notify`] only schedules a
/// publication; every notification raised before the scheduled task runs collapses into that
/// single publication, which reads the store at the time it runs.
#[derive(Debug)]
pub struct UpdateBatcher {
    store: Arc<ClientStore>,
    scheduled: AtomicBool,
    tx: watch::Sender<Arc<Snapshot>>,
}

impl UpdateBatcher {
    pub fn new(store: Arc<ClientStore>) -> Arc<Self> {
        let (tx, _rx) = watch::channel(Arc::new(Snapshot::default()));
        Arc::new(Self {
            store,
            scheduled: AtomicBool::new(false),
            tx,
        })
    }

    /// Schedules a publication on the current tokio runtime unless one is already pending.
    pub fn notify(self: &Arc<Self>) {
        if self.scheduled.swap(true, Ordering::AcqRel) {
            return;
        }

        let batcher = self.clone();
        tokio::spawn(async move {
            // Let the rest of this scheduling turn's writers run first.
            tokio::task::yield_now().await;
            batcher.scheduled.store(false, Ordering::Release);
            if batcher.store.is_dirty() {
                batcher.publish();
            }
        });
    }

    /// Publishes the current store contents right away.
    pub fn publish_now(&self) {
        self.publish();
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }

    fn publish(&self) {
        let (generation, clients) = self.store.take_snapshot();
        self.tx.send_modify(|current| {
            *current = Arc::new(Snapshot {
                version: current.version.wrapping_add(1),
                generation,
                clients,
            });
        });
        tracing::trace!(generation, "snapshot published");
    }
}
