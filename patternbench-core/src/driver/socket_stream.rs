use super::{ChannelCauses, ClientHandle, DriverError, pump};
use crate::backend::{Backend, JobChannel as _};

const CAUSES: ChannelCauses = ChannelCauses {
    error: "WebSocket error",
    ended: "WebSocket closed before completion",
};

pub(super) async fn run<B: Backend>(
    backend: &B,
    client: &mut ClientHandle,
) -> Result<(), DriverError> {
    let job = backend.submit_job().await?;
    let mut channel = backend.open_duplex_channel(&job).await?;

    let outcome = pump(&mut channel, client, CAUSES).await;
    channel.close().await;
    outcome
}
