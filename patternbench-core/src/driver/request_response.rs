use super::{ClientHandle, DriverError};
use crate::backend::{Backend, BackendError};

/// One call that blocks for the whole job; no partial progress is ever visible.
pub(super) async fn run<B: Backend>(
    backend: &B,
    client: &mut ClientHandle,
) -> Result<(), DriverError> {
    let status = backend.process_synchronously().await?;
    client.record_round_trip();

    if !status.is_completed() {
        return Err(BackendError::UnexpectedState(status.state).into());
    }
    client.complete(None);
    Ok(())
}
