use super::JobState;

pub type BackendResult<T> = std::result::Result<T, BackendError>;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error(transparent)]
    Http(#[from] patternbench_http::Error),

    #[error("websocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("invalid backend payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("backend answered with http status {0}")]
    HttpStatus(u16),

    #[error("job ended with status `{0}`")]
    UnexpectedState(JobState),

    #[error("invalid base url `{0}` (expected an http:// or https:// URL)")]
    InvalidBaseUrl(String),

    #[error("{0}")]
    Other(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for BackendError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}
