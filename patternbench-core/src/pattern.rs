/// One of the five client/server interaction patterns a simulated client can use.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Pattern {
    /// One blocking call that returns when the job is done.
    #[strum(to_string = "req_resp", serialize = "request-response", serialize = "rr")]
    RequestResponse,

    /// Submit, then check status on a fixed interval.
    #[strum(to_string = "short_polling", serialize = "short-polling", serialize = "short-poll")]
    ShortPoll,

    /// Submit, then one request held open by the server until the job is done.
    #[strum(to_string = "long_polling", serialize = "long-polling", serialize = "long-poll")]
    LongPoll,

    /// Submit, then a server-sent event stream.
    #[strum(to_string = "sse", serialize = "event-stream", serialize = "server-sent-events")]
    EventStream,

    /// Submit, then a websocket.
    #[strum(to_string = "websocket", serialize = "ws", serialize = "socket-stream")]
    SocketStream,
}

impl Pattern {
    /// Canonical order used for metrics and summaries.
    pub const ALL: [Pattern; 5] = [
        Pattern::RequestResponse,
        Pattern::ShortPoll,
        Pattern::LongPoll,
        Pattern::EventStream,
        Pattern::SocketStream,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Short human label for tables and progress bars.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::RequestResponse => "Req/Resp",
            Self::ShortPoll => "Short Poll",
            Self::LongPoll => "Long Poll",
            Self::EventStream => "SSE",
            Self::SocketStream => "WebSocket",
        }
    }
}
