#![forbid(unsafe_code)]

mod backend;
mod batcher;
mod driver;
mod engine;
mod error;
mod metrics;
mod pattern;
mod record;
mod store;

#[cfg(test)]
mod test_support;

pub use backend::{
    Backend, BackendError, BackendResult, HttpBackend, HttpBackendConfig, JobChannel, JobId,
    JobState, JobStatus, SseChannel, WsChannel, socket_url,
};
pub use batcher::{Snapshot, UpdateBatcher};
pub use engine::{Engine, EngineConfig};
pub use error::{Error, Result};
pub use metrics::{Metrics, PatternMetrics, Totals, aggregate};
pub use pattern::Pattern;
pub use record::{ClientId, ClientRecord, ClientStatus, ClientUpdate};
pub use store::{ClientStore, WriteOutcome};
