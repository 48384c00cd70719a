//! In-memory [`Backend`] with scripted answers, for driver and engine tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::backend::{Backend, BackendError, BackendResult, JobChannel, JobId, JobStatus};

#[derive(Debug, Clone)]
pub(crate) enum StreamItem {
    Status(JobStatus),
    Error,
}

fn connection_reset() -> BackendError {
    BackendError::Other("connection reset".to_string())
}

#[derive(Debug, Default)]
pub(crate) struct ScriptStats {
    submissions: AtomicU64,
    status_checks: AtomicU64,
    channels_opened: AtomicU64,
    channels_closed: AtomicU64,
    messages_delivered: AtomicU64,
}

impl ScriptStats {
    pub(crate) fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::Relaxed)
    }

    pub(crate) fn status_checks(&self) -> u64 {
        self.status_checks.load(Ordering::Relaxed)
    }

    pub(crate) fn channels_opened(&self) -> u64 {
        self.channels_opened.load(Ordering::Relaxed)
    }

    pub(crate) fn channels_closed(&self) -> u64 {
        self.channels_closed.load(Ordering::Relaxed)
    }

    pub(crate) fn messages_delivered(&self) -> u64 {
        self.messages_delivered.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub(crate) struct ScriptedBackend {
    statuses: Vec<StreamItem>,
    stream: Vec<StreamItem>,
    message_gap: Duration,
    result: JobStatus,
    result_delay: Duration,
    sync_delay: Duration,
    fail_with: Option<String>,
    fail_opens_with: Option<String>,
    cursors: Mutex<HashMap<JobId, usize>>,
    stats: Arc<ScriptStats>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            statuses: vec![StreamItem::Status(JobStatus::completed())],
            stream: vec![StreamItem::Status(JobStatus::completed())],
            message_gap: Duration::ZERO,
            result: JobStatus::completed(),
            result_delay: Duration::ZERO,
            sync_delay: Duration::ZERO,
            fail_with: None,
            fail_opens_with: None,
            cursors: Mutex::new(HashMap::new()),
            stats: Arc::new(ScriptStats::default()),
        }
    }
}

impl ScriptedBackend {
    /// Answers for successive status checks of each job; the last one repeats.
    pub(crate) fn with_statuses(self, statuses: Vec<JobStatus>) -> Self {
        self.with_status_script(statuses.into_iter().map(StreamItem::Status).collect())
    }

    /// Like [`Self::with_statuses`], but individual checks may fail.
    pub(crate) fn with_status_script(mut self, script: Vec<StreamItem>) -> Self {
        self.statuses = script;
        self
    }

    /// Messages every opened channel yields before it ends.
    pub(crate) fn with_stream(mut self, stream: Vec<StreamItem>) -> Self {
        self.stream = stream;
        self
    }

    pub(crate) fn with_message_gap(mut self, gap: Duration) -> Self {
        self.message_gap = gap;
        self
    }

    pub(crate) fn with_result(mut self, result: JobStatus) -> Self {
        self.result = result;
        self
    }

    pub(crate) fn with_result_delay(mut self, delay: Duration) -> Self {
        self.result_delay = delay;
        self
    }

    pub(crate) fn with_sync_delay(mut self, delay: Duration) -> Self {
        self.sync_delay = delay;
        self
    }

    /// Every call fails.
    pub(crate) fn failing(mut self, cause: &str) -> Self {
        self.fail_with = Some(cause.to_string());
        self
    }

    /// Only opening push channels fails.
    pub(crate) fn failing_stream_opens(mut self, cause: &str) -> Self {
        self.fail_opens_with = Some(cause.to_string());
        self
    }

    pub(crate) fn stats(&self) -> Arc<ScriptStats> {
        self.stats.clone()
    }

    fn check(&self) -> BackendResult<()> {
        match &self.fail_with {
            Some(cause) => Err(BackendError::Other(cause.clone())),
            None => Ok(()),
        }
    }

    fn open(&self) -> BackendResult<ScriptedChannel> {
        self.check()?;
        if let Some(cause) = &self.fail_opens_with {
            return Err(BackendError::Other(cause.clone()));
        }
        self.stats.channels_opened.fetch_add(1, Ordering::Relaxed);
        Ok(ScriptedChannel {
            items: self.stream.iter().cloned().collect(),
            gap: self.message_gap,
            stats: self.stats.clone(),
            closed: false,
        })
    }
}

impl Backend for ScriptedBackend {
    type EventChannel = ScriptedChannel;
    type DuplexChannel = ScriptedChannel;

    async fn submit_job(&self) -> BackendResult<JobId> {
        self.check()?;
        let n = self.stats.submissions.fetch_add(1, Ordering::Relaxed);
        Ok(JobId::new(format!("job-{n}")))
    }

    async fn get_status(&self, job: &JobId) -> BackendResult<JobStatus> {
        self.check()?;
        self.stats.status_checks.fetch_add(1, Ordering::Relaxed);
        let idx = {
            let mut cursors = self
                .cursors
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let cursor = cursors.entry(job.clone()).or_default();
            let idx = *cursor;
            *cursor += 1;
            idx
        };
        let last = self.statuses.len().saturating_sub(1);
        match self.statuses.get(idx.min(last)) {
            Some(StreamItem::Status(status)) => Ok(status.clone()),
            Some(StreamItem::Error) => Err(connection_reset()),
            None => Err(BackendError::Other("empty status script".to_string())),
        }
    }

    async fn get_result(&self, _job: &JobId) -> BackendResult<JobStatus> {
        self.check()?;
        tokio::time::sleep(self.result_delay).await;
        Ok(self.result.clone())
    }

    async fn open_event_channel(&self, _job: &JobId) -> BackendResult<ScriptedChannel> {
        self.open()
    }

    async fn open_duplex_channel(&self, _job: &JobId) -> BackendResult<ScriptedChannel> {
        self.open()
    }

    async fn process_synchronously(&self) -> BackendResult<JobStatus> {
        self.check()?;
        tokio::time::sleep(self.sync_delay).await;
        Ok(JobStatus::completed())
    }
}

#[derive(Debug)]
pub(crate) struct ScriptedChannel {
    items: VecDeque<StreamItem>,
    gap: Duration,
    stats: Arc<ScriptStats>,
    closed: bool,
}

impl JobChannel for ScriptedChannel {
    async fn recv(&mut self) -> Option<BackendResult<JobStatus>> {
        if self.closed {
            return None;
        }
        if !self.gap.is_zero() {
            tokio::time::sleep(self.gap).await;
        }
        match self.items.pop_front()? {
            StreamItem::Status(status) => {
                self.stats.messages_delivered.fetch_add(1, Ordering::Relaxed);
                Some(Ok(status))
            }
            StreamItem::Error => Some(Err(connection_reset())),
        }
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.stats.channels_closed.fetch_add(1, Ordering::Relaxed);
        }
    }
}
