//! The job backend the drivers talk to.

use std::fmt;
use std::future::Future;

use serde::Deserialize;

mod error;
mod http;
mod sse;
mod ws;

pub use error::{BackendError, BackendResult};
pub use http::{HttpBackend, HttpBackendConfig};
pub use sse::SseChannel;
pub use ws::{WsChannel, socket_url};

/// Backend-assigned job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum JobState {
    InProgress,
    Completed,
    NotFound,
    Timeout,
    #[strum(default)]
    Other(String),
}

/// A job status report as returned by polls and pushed by streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub state: JobState,
    /// Percentage, clamped to 0..=100.
    pub progress: u8,
}

#[derive(Debug, Deserialize)]
struct JobPayload {
    status: String,
    #[serde(default)]
    progress: Option<f64>,
}

impl JobStatus {
    #[must_use]
    pub fn in_progress(progress: u8) -> Self {
        Self {
            state: JobState::InProgress,
            progress: progress.min(100),
        }
    }

    #[must_use]
    pub fn completed() -> Self {
        Self {
            state: JobState::Completed,
            progress: 100,
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == JobState::Completed
    }

    /// Parses the backend's job JSON (`{"status": "...", "progress": 42, ...}`).
    pub fn from_json(bytes: &[u8]) -> BackendResult<Self> {
        let payload: JobPayload = serde_json::from_slice(bytes)?;
        let state = payload
            .status
            .parse::<JobState>()
            .unwrap_or_else(|_| JobState::Other(payload.status));
        let progress = payload
            .progress
            .filter(|p| p.is_finite())
            .map_or(0, |p| p.clamp(0.0, 100.0).round() as u8);
        Ok(Self { state, progress })
    }
}

/// An open push channel (event stream or websocket) for one job.
pub trait JobChannel: Send + 'static {
    /// Next status message; `None` once the channel has ended.
    fn recv(&mut self) -> impl Future<Output = Option<BackendResult<JobStatus>>> + Send;

    /// Releases the channel. Safe to call more than once.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// The job-processing collaborator driven by the pattern drivers.
pub trait Backend: Send + Sync + 'static {
    type EventChannel: JobChannel;
    type DuplexChannel: JobChannel;

    /// Enqueues a job and returns its identifier immediately.
    fn submit_job(&self) -> impl Future<Output = BackendResult<JobId>> + Send;

    /// Non-blocking status check.
    fn get_status(&self, job: &JobId) -> impl Future<Output = BackendResult<JobStatus>> + Send;

    /// Held open by the backend until the job reaches a terminal state.
    fn get_result(&self, job: &JobId) -> impl Future<Output = BackendResult<JobStatus>> + Send;

    fn open_event_channel(
        &self,
        job: &JobId,
    ) -> impl Future<Output = BackendResult<Self::EventChannel>> + Send;

    fn open_duplex_channel(
        &self,
        job: &JobId,
    ) -> impl Future<Output = BackendResult<Self::DuplexChannel>> + Send;

    /// Runs a whole job inside one call.
    fn process_synchronously(&self) -> impl Future<Output = BackendResult<JobStatus>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_job_json_with_extra_fields() {
        let status = JobStatus::from_json(
            br#"{"status":"in_progress","progress":37,"started_at":1700000000.5}"#,
        );
        assert!(matches!(
            status,
            Ok(JobStatus {
                state: JobState::InProgress,
                progress: 37
            })
        ));
    }

    #[test]
    fn unknown_states_and_missing_progress_are_tolerated() {
        match JobStatus::from_json(br#"{"status":"timeout"}"#) {
            Ok(s) => assert_eq!(s, JobStatus { state: JobState::Timeout, progress: 0 }),
            Err(err) => panic!("unexpected error: {err}"),
        }

        match JobStatus::from_json(br#"{"status":"queued","progress":250}"#) {
            Ok(s) => {
                assert_eq!(s.state, JobState::Other("queued".to_string()));
                assert_eq!(s.progress, 100);
            }
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    #[test]
    fn malformed_json_is_a_payload_error() {
        assert!(matches!(
            JobStatus::from_json(b"not json"),
            Err(BackendError::Payload(_))
        ));
    }
}
