//! Per-client drivers, one variant per [`Pattern`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::backend::{Backend, BackendError, JobChannel};
use crate::{ClientId, ClientStore, ClientUpdate, Pattern, UpdateBatcher, WriteOutcome};

mod event_stream;
mod long_poll;
mod request_response;
mod short_poll;
mod socket_stream;

#[derive(Debug, Clone, Copy)]
pub(crate) struct DriverConfig {
    pub poll_interval: Duration,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum DriverError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Channel-level failure, reported with a generic cause.
    #[error("{0}")]
    Channel(&'static str),
}

/// Write side of one client record, owned by exactly one driver.
///
/// Carries the store generation the driver was spawned under; once a clear moves the store
/// past it every write is dropped and [`ClientHandle::is_current`] turns false.
#[derive(Debug)]
pub(crate) struct ClientHandle {
    id: ClientId,
    generation: u64,
    store: Arc<ClientStore>,
    batcher: Arc<UpdateBatcher>,
    epoch: Instant,
    started: Option<Instant>,
    polls: u32,
}

impl ClientHandle {
    pub(crate) fn new(
        id: ClientId,
        generation: u64,
        store: Arc<ClientStore>,
        batcher: Arc<UpdateBatcher>,
        epoch: Instant,
    ) -> Self {
        Self {
            id,
            generation,
            store,
            batcher,
            epoch,
            started: None,
            polls: 0,
        }
    }

    pub(crate) fn id(&self) -> ClientId {
        self.id
    }

    pub(crate) fn is_current(&self) -> bool {
        self.store.is_current(self.generation)
    }

    /// Time since [`ClientHandle::start`].
    pub(crate) fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    pub(crate) fn record_round_trip(&mut self) {
        self.polls = self.polls.saturating_add(1);
    }

    pub(crate) fn start(&mut self) {
        let now = Instant::now();
        self.started = Some(now);
        self.write(ClientUpdate::started(self.offset(now)));
    }

    pub(crate) fn progress(&mut self, progress: u8, latency: Option<Duration>) {
        self.write(ClientUpdate::progressed(progress, latency).with_polls(self.polls));
    }

    pub(crate) fn complete(&mut self, latency: Option<Duration>) {
        let at = self.offset(Instant::now());
        if self.write(ClientUpdate::completed(at, latency).with_polls(self.polls)) {
            tracing::info!(
                client = %self.id,
                duration_ms = saturating_millis(self.elapsed()),
                polls = self.polls,
                "client completed"
            );
        }
    }

    pub(crate) fn fail(&mut self, cause: &str) {
        let at = self.offset(Instant::now());
        if self.write(ClientUpdate::failed(at, cause).with_polls(self.polls)) {
            tracing::warn!(client = %self.id, cause, "client failed");
        }
    }

    fn offset(&self, at: Instant) -> Duration {
        at.saturating_duration_since(self.epoch)
    }

    fn write(&self, update: ClientUpdate) -> bool {
        match self.store.upsert(self.generation, self.id, update) {
            WriteOutcome::Applied => {
                self.batcher.notify();
                true
            }
            WriteOutcome::Stale => {
                tracing::trace!(client = %self.id, "dropping write from a cleared generation");
                false
            }
            WriteOutcome::Rejected => {
                tracing::debug!(client = %self.id, "dropping out-of-order write");
                false
            }
        }
    }
}

fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Runs one client to a terminal state. Never fails; errors become a `Failed` record.
pub(crate) async fn drive<B: Backend>(
    backend: Arc<B>,
    mut client: ClientHandle,
    config: DriverConfig,
) {
    client.start();
    tracing::debug!(client = %client.id(), "driver started");

    let backend = backend.as_ref();
    let outcome = match client.id().pattern() {
        Pattern::RequestResponse => request_response::run(backend, &mut client).await,
        Pattern::ShortPoll => short_poll::run(backend, &mut client, config.poll_interval).await,
        Pattern::LongPoll => long_poll::run(backend, &mut client).await,
        Pattern::EventStream => event_stream::run(backend, &mut client).await,
        Pattern::SocketStream => socket_stream::run(backend, &mut client).await,
    };

    if let Err(err) = outcome {
        client.fail(&err.to_string());
    }
}

/// Labels used for channel-level causes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChannelCauses {
    pub error: &'static str,
    pub ended: &'static str,
}

/// Consumes a push channel until completion, error, end of stream, or abandonment.
///
/// The caller owns closing the channel on every path.
pub(crate) async fn pump<C: JobChannel>(
    channel: &mut C,
    client: &mut ClientHandle,
    causes: ChannelCauses,
) -> Result<(), DriverError> {
    loop {
        let status = match channel.recv().await {
            None => return Err(DriverError::Channel(causes.ended)),
            Some(Err(err)) => {
                tracing::warn!(client = %client.id(), error = %err, "{}", causes.error);
                return Err(DriverError::Channel(causes.error));
            }
            Some(Ok(status)) => status,
        };

        client.record_round_trip();
        // Freshness relative to the driver's own start, not to when the message was produced.
        let freshness = client.elapsed();
        if status.is_completed() {
            client.complete(Some(freshness));
            return Ok(());
        }
        client.progress(status.progress, Some(freshness));

        if !client.is_current() {
            return Ok(());
        }
    }
}
