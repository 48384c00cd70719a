use std::time::Duration;

use tokio::time::Instant;

use super::{ClientHandle, DriverError};
use crate::backend::{Backend, BackendError, JobState};

/// Submit, then check status every `interval` until the job completes.
///
/// The first check goes out right after submission. A failed check, or any state other than
/// in-progress or completed, is terminal.
pub(super) async fn run<B: Backend>(
    backend: &B,
    client: &mut ClientHandle,
    interval: Duration,
) -> Result<(), DriverError> {
    let job = backend.submit_job().await?;

    loop {
        if !client.is_current() {
            return Ok(());
        }

        let sent = Instant::now();
        let status = backend.get_status(&job).await?;
        let round_trip = sent.elapsed();
        client.record_round_trip();

        match status.state {
            JobState::InProgress => client.progress(status.progress, Some(round_trip)),
            JobState::Completed => {
                client.complete(Some(round_trip));
                return Ok(());
            }
            state => return Err(BackendError::UnexpectedState(state).into()),
        }

        tokio::time::sleep(interval).await;
    }
}
