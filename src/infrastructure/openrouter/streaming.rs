//! Server-Sent Events parsing for streamed chat completions.
//!
//! The endpoint sends `data: {json}` lines separated by blank lines and ends
//! the stream with `data: [DONE]`. Chunks from the network may split lines
//! anywhere, so input is buffered until a full line is available.

use tracing::warn;

use super::types::StreamChunk;

/// Parsed stream item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Text appended to the completion
    Delta(String),
    /// End-of-stream marker
    Done,
}

/// Incremental parser fed with raw network chunks.
#[derive(Debug, Default)]
pub struct SseChunkParser {
    buffer: String,
}

impl SseChunkParser {
    /// Parser with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return every event completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(line.trim_end_matches(|c| c == '\r' || c == '\n')) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(rest.trim())
    }
}

fn parse_line(line: &str) -> Option<SseEvent> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        return None;
    }
    if data == "[DONE]" {
        return Some(SseEvent::Done);
    }

    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .find_map(|c| c.delta.content)
            .filter(|text| !text.is_empty())
            .map(SseEvent::Delta),
        Err(err) => {
            warn!(error = %err, data, "skipping malformed stream chunk");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_deltas_and_done() {
        let mut parser = SseChunkParser::new();
        let events = parser.feed(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n\n",
        );
        assert_eq!(
            events,
            vec![
                SseEvent::Delta("Hel".into()),
                SseEvent::Delta("lo".into()),
                SseEvent::Done
            ]
        );
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut parser = SseChunkParser::new();
        assert!(parser.feed(b"data: {\"choices\":[{\"del").is_empty());
        let events = parser.feed(b"ta\":{\"content\":\"x\"}}]}\n");
        assert_eq!(events, vec![SseEvent::Delta("x".into())]);
    }

    #[test]
    fn test_ignores_comments_and_bad_json() {
        let mut parser = SseChunkParser::new();
        let events = parser.feed(b": OPENROUTER PROCESSING\n\ndata: {oops\n\nevent: ping\n");
        assert!(events.is_empty());
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut parser = SseChunkParser::new();
        parser.feed(b"data: [DONE]");
        assert_eq!(parser.finish(), Some(SseEvent::Done));
        assert_eq!(parser.finish(), None);
    }
}
