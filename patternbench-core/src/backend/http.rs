use std::time::Duration;

use bytes::Bytes;
use patternbench_http::{HttpClient, HttpRequest};
use url::Url;

use super::{
    Backend, BackendError, BackendResult, JobId, JobStatus, SseChannel, WsChannel, socket_url,
};

const SUBMIT_BODY: &[u8] = br#"{"data":{}}"#;

#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Base URL the `/api/...` routes are resolved against.
    pub base_url: Url,
    /// TCP connect timeout. Requests themselves are never timed out client-side.
    pub connect_timeout: Option<Duration>,
}

impl HttpBackendConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            connect_timeout: Some(Duration::from_secs(3)),
        }
    }
}

/// [`Backend`] over the HTTP, SSE and websocket routes of the job server.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: HttpClient,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> BackendResult<Self> {
        let base_url = config.base_url;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(Self {
            client: HttpClient::new(config.connect_timeout),
            base_url,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, segments: &[&str]) -> BackendResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, url: Url) -> BackendResult<Bytes> {
        let res = self.client.request(HttpRequest::get(url)).await?;
        if !res.is_success() {
            return Err(BackendError::HttpStatus(res.status));
        }
        Ok(res.body)
    }

    async fn post_json(&self, url: Url) -> BackendResult<Bytes> {
        let req = HttpRequest::post(url, Bytes::from_static(SUBMIT_BODY))
            .with_header("content-type", "application/json");
        let res = self.client.request(req).await?;
        if !res.is_success() {
            return Err(BackendError::HttpStatus(res.status));
        }
        Ok(res.body)
    }
}

impl Backend for HttpBackend {
    type EventChannel = SseChannel;
    type DuplexChannel = WsChannel;

    async fn submit_job(&self) -> BackendResult<JobId> {
        let url = self.endpoint(&["api", "polling", "process"])?;
        let body = self.post_json(url).await?;
        let id: String = serde_json::from_slice(&body)?;
        Ok(JobId::new(id))
    }

    async fn get_status(&self, job: &JobId) -> BackendResult<JobStatus> {
        let url = self.endpoint(&["api", "polling", "status", job.as_str()])?;
        let body = self.get_json(url).await?;
        JobStatus::from_json(&body)
    }

    async fn get_result(&self, job: &JobId) -> BackendResult<JobStatus> {
        let url = self.endpoint(&["api", "polling", "result", job.as_str()])?;
        let body = self.get_json(url).await?;
        JobStatus::from_json(&body)
    }

    async fn open_event_channel(&self, job: &JobId) -> BackendResult<SseChannel> {
        let url = self.endpoint(&["api", "sse", "stream", job.as_str()])?;
        let req = HttpRequest::get(url)
            .with_header("accept", "text/event-stream")
            .with_header("cache-control", "no-cache");
        let mut res = self.client.request_stream(req).await?;
        if !res.is_success() {
            res.body.close();
            return Err(BackendError::HttpStatus(res.status));
        }
        Ok(SseChannel::new(res.body))
    }

    async fn open_duplex_channel(&self, job: &JobId) -> BackendResult<WsChannel> {
        let url = socket_url(
            &self.endpoint(&["api", "websocket", "ws", job.as_str()])?,
        )?;
        WsChannel::connect(&url).await
    }

    async fn process_synchronously(&self) -> BackendResult<JobStatus> {
        let url = self.endpoint(&["api", "req_resp", "process"])?;
        let body = self.post_json(url).await?;
        JobStatus::from_json(&body)
    }
}
