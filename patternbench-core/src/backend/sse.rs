use std::collections::VecDeque;

use patternbench_http::HttpBodyStream;

use super::{BackendError, BackendResult, JobChannel, JobStatus};

/// Upper bound for one unterminated line and for the data of one pending event.
const MAX_EVENT_BYTES: usize = 64 * 1024;

/// Incremental `text/event-stream` decoder yielding the `data` payload of each event.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
    data: Vec<String>,
    data_len: usize,
}

impl SseDecoder {
    /// Feeds a chunk of the stream and returns the events it completed.
    ///
    /// Fails once a line or an event outgrows [`MAX_EVENT_BYTES`]; the decoder is unusable after.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> BackendResult<Vec<String>> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                    self.data_len = 0;
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            if field == "data" {
                self.data_len = self.data_len.saturating_add(value.len() + 1);
                if self.data_len > MAX_EVENT_BYTES {
                    return Err(oversized("event"));
                }
                self.data.push(value.to_string());
            }
        }

        if self.buf.len() > MAX_EVENT_BYTES {
            return Err(oversized("line"));
        }
        Ok(events)
    }
}

fn oversized(what: &str) -> BackendError {
    BackendError::Other(format!("SSE {what} exceeds {MAX_EVENT_BYTES} bytes"))
}

/// Server-sent event channel for one job.
#[derive(Debug)]
pub struct SseChannel {
    body: HttpBodyStream,
    decoder: SseDecoder,
    pending: VecDeque<String>,
}

impl SseChannel {
    pub(crate) fn new(body: HttpBodyStream) -> Self {
        Self {
            body,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
        }
    }
}

impl JobChannel for SseChannel {
    async fn recv(&mut self) -> Option<BackendResult<JobStatus>> {
        loop {
            if let Some(data) = self.pending.pop_front() {
                return Some(JobStatus::from_json(data.as_bytes()));
            }

            match self.body.next_chunk().await {
                Ok(Some(chunk)) => match self.decoder.push(&chunk) {
                    Ok(events) => self.pending.extend(events),
                    Err(err) => return Some(Err(err)),
                },
                Ok(None) => return None,
                Err(err) => return Some(Err(err.into())),
            }
        }
    }

    async fn close(&mut self) {
        self.pending.clear();
        self.body.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_events_split_across_chunks() -> anyhow::Result<()> {
        let mut dec = SseDecoder::default();
        assert!(dec.push(b"data: {\"status\":\"in_pro")?.is_empty());
        assert_eq!(
            dec.push(b"gress\",\"progress\":1}\n\ndata: {\"progress\":2}\n")?,
            vec![r#"{"status":"in_progress","progress":1}"#.to_string()]
        );
        assert_eq!(dec.push(b"\n")?, vec![r#"{"progress":2}"#.to_string()]);
        Ok(())
    }

    #[test]
    fn ignores_comments_and_other_fields_and_handles_crlf() -> anyhow::Result<()> {
        let mut dec = SseDecoder::default();
        let events =
            dec.push(b": keep-alive\r\nevent: job\r\nid: 7\r\ndata:a\r\ndata: b\r\n\r\n")?;
        assert_eq!(events, vec!["a\nb".to_string()]);
        Ok(())
    }

    #[test]
    fn blank_lines_without_data_do_not_emit() -> anyhow::Result<()> {
        let mut dec = SseDecoder::default();
        assert!(dec.push(b"\n\n\r\n")?.is_empty());
        Ok(())
    }

    #[test]
    fn unterminated_line_over_the_limit_is_an_error() {
        let mut dec = SseDecoder::default();
        let half = vec![b'x'; MAX_EVENT_BYTES / 2 + 1];
        assert!(matches!(dec.push(b"data: "), Ok(events) if events.is_empty()));
        assert!(matches!(dec.push(&half), Ok(events) if events.is_empty()));

        match dec.push(&half) {
            Err(err) => assert_eq!(
                err.to_string(),
                format!("SSE line exceeds {MAX_EVENT_BYTES} bytes")
            ),
            Ok(events) => panic!("expected an error, got {events:?}"),
        }
    }

    #[test]
    fn event_data_over_the_limit_is_an_error() {
        let mut dec = SseDecoder::default();
        let mut line = b"data: ".to_vec();
        line.extend(vec![b'x'; 1024]);
        line.push(b'\n');

        let mut result = Ok(Vec::new());
        for _ in 0..=MAX_EVENT_BYTES / 1024 {
            result = dec.push(&line);
            if result.is_err() {
                break;
            }
        }
        match result {
            Err(err) => assert!(err.to_string().contains("SSE event exceeds")),
            Ok(events) => panic!("expected an error, got {events:?}"),
        }
    }
}
