use tokio::time::Instant;

use super::{ClientHandle, DriverError};
use crate::backend::{Backend, BackendError};

/// Submit, then a single result request the backend holds open until the job is done.
pub(super) async fn run<B: Backend>(
    backend: &B,
    client: &mut ClientHandle,
) -> Result<(), DriverError> {
    let job = backend.submit_job().await?;

    let sent = Instant::now();
    let status = backend.get_result(&job).await?;
    let held = sent.elapsed();
    client.record_round_trip();

    if !status.is_completed() {
        return Err(BackendError::UnexpectedState(status.state).into());
    }
    client.complete(Some(held));
    Ok(())
}
