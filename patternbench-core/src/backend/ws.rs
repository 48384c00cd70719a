use std::fmt;

use futures_util::StreamExt as _;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::{BackendError, BackendResult, JobChannel, JobStatus};

/// Maps an `http(s)` endpoint onto the matching `ws(s)` URL.
pub fn socket_url(endpoint: &Url) -> BackendResult<Url> {
    let scheme = match endpoint.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(BackendError::InvalidBaseUrl(endpoint.to_string())),
    };

    let mut url = endpoint.clone();
    url.set_scheme(scheme)
        .map_err(|()| BackendError::InvalidBaseUrl(endpoint.to_string()))?;
    Ok(url)
}

/// Websocket channel for one job.
pub struct WsChannel {
    stream: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl fmt::Debug for WsChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsChannel")
            .field("open", &self.stream.is_some())
            .finish()
    }
}

impl WsChannel {
    pub async fn connect(url: &Url) -> BackendResult<Self> {
        let (stream, _resp) = tokio_tungstenite::connect_async(url.as_str()).await?;
        Ok(Self {
            stream: Some(stream),
        })
    }
}

impl JobChannel for WsChannel {
    async fn recv(&mut self) -> Option<BackendResult<JobStatus>> {
        let stream = self.stream.as_mut()?;
        loop {
            match stream.next().await? {
                Ok(Message::Text(text)) => return Some(JobStatus::from_json(text.as_bytes())),
                Ok(Message::Binary(bytes)) => return Some(JobStatus::from_json(&bytes)),
                Ok(Message::Close(_)) => return None,
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(err) => return Some(Err(err.into())),
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            // The peer may already be gone; nothing to report either way.
            let _ = stream.close(None).await;
        }
    }
}
