use bytes::Bytes;
use http_body_util::BodyExt as _;
use hyper::body::Incoming;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
    /// Response headers (lowercased header names). Multiple values are joined with ", ".
    pub headers: Vec<(String, String)>,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A response whose body is consumed incrementally (e.g. `text/event-stream`).
#[derive(Debug)]
pub struct HttpStreamResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: HttpBodyStream,
}

impl HttpStreamResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug)]
pub struct HttpBodyStream {
    inner: Option<Incoming>,
}

impl HttpBodyStream {
    pub(crate) fn new(body: Incoming) -> Self {
        Self { inner: Some(body) }
    }

    /// Next data chunk, or `None` once the body is finished or closed.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let Some(body) = self.inner.as_mut() else {
            return Ok(None);
        };

        loop {
            match body.frame().await {
                None => {
                    self.inner = None;
                    return Ok(None);
                }
                Some(Err(err)) => {
                    self.inner = None;
                    return Err(err.into());
                }
                Some(Ok(frame)) => {
                    // Trailers carry no payload.
                    if let Ok(data) = frame.into_data() {
                        return Ok(Some(data));
                    }
                }
            }
        }
    }

    /// Drops the underlying connection body. Further reads return `None`.
    pub fn close(&mut self) {
        self.inner = None;
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: http::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: http::Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn post(url: impl Into<String>, body: Bytes) -> Self {
        Self {
            method: http::Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}
