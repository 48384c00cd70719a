use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{ClientId, ClientRecord, ClientUpdate, Pattern};

/// Result of a driver write against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// The writer's generation was invalidated by a clear.
    Stale,
    /// The update would break the status state machine.
    Rejected,
}

/// In-memory registry of simulated clients.
///
/// Records are keyed by [`ClientId`], whose ordering follows creation order, so snapshots come
/// out in insertion order. Every write carries the generation its driver was spawned under;
/// writes from an older generation are dropped.
#[derive(Debug, Default)]
pub struct ClientStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    generation: u64,
    next_seq: u64,
    records: BTreeMap<ClientId, ClientRecord>,
    dirty: bool,
}

impl ClientStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Allocates `count` pending records and returns the generation they belong to.
    pub fn create(&self, pattern: Pattern, count: usize) -> (u64, Vec<ClientId>) {
        let mut inner = self.lock();
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            inner.next_seq = inner.next_seq.wrapping_add(1);
            let id = ClientId::new(inner.next_seq, pattern);
            inner.records.insert(id, ClientRecord::pending(id));
            ids.push(id);
        }
        inner.dirty = true;
        (inner.generation, ids)
    }

    /// Merges `update` into the record for `id`, creating a pending record first if needed.
    pub fn upsert(&self, generation: u64, id: ClientId, update: ClientUpdate) -> WriteOutcome {
        let mut inner = self.lock();
        if inner.generation != generation {
            return WriteOutcome::Stale;
        }

        inner.next_seq = inner.next_seq.max(id.seq());
        let record = inner
            .records
            .entry(id)
            .or_insert_with(|| ClientRecord::pending(id));
        if !record.apply(update) {
            return WriteOutcome::Rejected;
        }

        inner.dirty = true;
        WriteOutcome::Applied
    }

    /// Drops every record and invalidates all in-flight writers. Returns the new generation.
    pub fn clear(&self) -> u64 {
        let mut inner = self.lock();
        inner.records.clear();
        inner.generation = inner.generation.wrapping_add(1);
        inner.dirty = true;
        inner.generation
    }

    #[must_use]
    pub fn get(&self, id: ClientId) -> Option<ClientRecord> {
        self.lock().records.get(&id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<ClientRecord> {
        self.lock().records.values().cloned().collect()
    }

    /// Snapshot together with the generation it was taken under; clears the dirty flag.
    pub(crate) fn take_snapshot(&self) -> (u64, Vec<ClientRecord>) {
        let mut inner = self.lock();
        inner.dirty = false;
        (inner.generation, inner.records.values().cloned().collect())
    }

    /// Returns whether anything changed since the last [`ClientStore::take_snapshot`].
    pub(crate) fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    #[must_use]
    pub fn has_in_flight(&self) -> bool {
        self.lock()
            .records
            .values()
            .any(|r| !r.status.is_terminal())
    }
}
