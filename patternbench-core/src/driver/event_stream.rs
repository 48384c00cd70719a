use super::{ChannelCauses, ClientHandle, DriverError, pump};
use crate::backend::{Backend, JobChannel as _};

const CAUSES: ChannelCauses = ChannelCauses {
    error: "SSE error",
    ended: "SSE stream closed before completion",
};

pub(super) async fn run<B: Backend>(
    backend: &B,
    client: &mut ClientHandle,
) -> Result<(), DriverError> {
    let job = backend.submit_job().await?;
    let mut channel = backend.open_event_channel(&job).await?;

    let outcome = pump(&mut channel, client, CAUSES).await;
    channel.close().await;
    outcome
}
