//! Incremental `text/event-stream` decoder.

use bytes::{Buf, BytesMut};

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name; `message` when the server sent none.
    pub event: String,
    /// Data lines joined with `\n`.
    pub data: String,
}

/// Splits a byte stream into [`SseEvent`]s.
///
/// Chunks may end anywhere, including inside a line or a UTF-8 sequence.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);
            let line = String::from_utf8_lossy(&line);
            let line = line.strip_suffix('\r').unwrap_or(&line);

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
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
            match field {
                "event" => self.event = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }

        events
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() && event.is_none() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: event.unwrap_or_else(|| "message".to_string()),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut d = SseDecoder::new();
        let events = d.push(b"event: put\ndata: {\"path\":\"/\",\"data\":\"Standby\"}\n\n");
        assert_eq!(
            events,
            vec![SseEvent {
                event: "put".into(),
                data: r#"{"path":"/","data":"Standby"}"#.into(),
            }]
        );
    }

    #[test]
    fn test_split_across_chunks() {
        let mut d = SseDecoder::new();
        assert!(d.push(b"event: keep-al").is_empty());
        assert!(d.push(b"ive\r\ndata: null\r\n").is_empty());
        let events = d.push(b"\r\nevent: put\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "keep-alive");
        assert_eq!(events[0].data, "null");
    }

    #[test]
    fn test_multiline_data_and_comments() {
        let mut d = SseDecoder::new();
        let events = d.push(b": comment\ndata: a\ndata: b\n\n");
        assert_eq!(events[0].event, "message");
        assert_eq!(events[0].data, "a\nb");
    }

    #[test]
    fn test_blank_lines_without_fields_are_ignored() {
        let mut d = SseDecoder::new();
        assert!(d.push(b"\n\n\n").is_empty());
    }
}
