use std::fmt;
use std::time::Duration;

use crate::Pattern;

/// Unique, stable identifier of a simulated client.
///
/// The sequence number comes from a store-wide counter that is never reset, so ids stay
/// unique even across bursts created within the same clock tick and across clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId {
    seq: u64,
    pattern: Pattern,
}

impl ClientId {
    pub(crate) fn new(seq: u64, pattern: Pattern) -> Self {
        Self { seq, pattern }
    }

    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub fn pattern(&self) -> Pattern {
        self.pattern
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.pattern, self.seq)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ClientStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ClientStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Pending -> Running -> {Completed, Failed}. Re-asserting Running is allowed.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientRecord {
    pub id: ClientId,
    pub pattern: Pattern,
    pub status: ClientStatus,
    /// Percentage, 0..=100.
    pub progress: u8,
    /// Offset from the engine epoch. Zero while pending.
    pub start_time: Duration,
    pub end_time: Option<Duration>,
    pub duration: Option<Duration>,
    /// Most recent round trip (or freshness estimate for streamed updates).
    pub latency: Option<Duration>,
    pub error: Option<String>,
    /// Backend round trips or stream messages attributed to this client.
    pub polls: u32,
}

impl ClientRecord {
    #[must_use]
    pub fn pending(id: ClientId) -> Self {
        Self {
            id,
            pattern: id.pattern(),
            status: ClientStatus::Pending,
            progress: 0,
            start_time: Duration::ZERO,
            end_time: None,
            duration: None,
            latency: None,
            error: None,
            polls: 0,
        }
    }

    /// Merges `update` into the record.
    ///
    /// Returns `false` (leaving the record untouched) when the record is already terminal or the
    /// update would move the status backwards.
    pub(crate) fn apply(&mut self, update: ClientUpdate) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if let Some(next) = update.status
            && !self.status.can_advance_to(next)
        {
            return false;
        }

        if let Some(start) = update.start_time {
            self.start_time = start;
        }
        if let Some(next) = update.status {
            self.status = next;
        }
        if let Some(p) = update.progress {
            self.progress = self.progress.max(p.min(100));
        }
        if let Some(latency) = update.latency {
            self.latency = Some(latency);
        }
        if let Some(polls) = update.polls {
            self.polls = polls;
        }
        if let Some(end) = update.end_time {
            self.end_time = Some(end);
            self.duration = Some(end.saturating_sub(self.start_time));
        }

        match self.status {
            ClientStatus::Completed => {
                self.progress = 100;
                self.error = None;
            }
            ClientStatus::Failed => {
                self.error = Some(
                    update
                        .error
                        .filter(|e| !e.is_empty())
                        .unwrap_or_else(|| "unknown error".to_string()),
                );
            }
            ClientStatus::Pending | ClientStatus::Running => {}
        }

        true
    }
}

/// Partial update of a [`ClientRecord`]; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientUpdate {
    pub status: Option<ClientStatus>,
    pub progress: Option<u8>,
    pub start_time: Option<Duration>,
    pub end_time: Option<Duration>,
    pub latency: Option<Duration>,
    pub error: Option<String>,
    pub polls: Option<u32>,
}

impl ClientUpdate {
    #[must_use]
    pub fn started(at: Duration) -> Self {
        Self {
            status: Some(ClientStatus::Running),
            progress: Some(0),
            start_time: Some(at),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn progressed(progress: u8, latency: Option<Duration>) -> Self {
        Self {
            progress: Some(progress),
            latency,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn completed(at: Duration, latency: Option<Duration>) -> Self {
        Self {
            status: Some(ClientStatus::Completed),
            progress: Some(100),
            end_time: Some(at),
            latency,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failed(at: Duration, error: impl Into<String>) -> Self {
        Self {
            status: Some(ClientStatus::Failed),
            end_time: Some(at),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_polls(mut self, polls: u32) -> Self {
        self.polls = Some(polls);
        self
    }
}
