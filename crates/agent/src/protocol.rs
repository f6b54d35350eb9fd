//! Server-sent-events framing shared by the agent, the gateway and clients.
//!
//! Every event is a single `data: <payload>` line followed by a blank line.
//! The payload is either `[DONE]`, `{"content": "..."}` or `{"error": "..."}`.

use serde_json::{json, Value};

pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Incremental text to append to the assistant message
    Content(String),
    /// End of stream
    Done,
    /// Upstream failure; no more frames follow
    Error(String),
}

impl StreamFrame {
    /// Parse one line of an event stream.
    ///
    /// Returns `None` for lines that carry no frame: blank lines, non-`data`
    /// fields, and JSON payloads without `content` or `error`. Data that is
    /// not JSON at all is taken as plain-text content.
    pub fn parse_line(line: &str) -> Option<StreamFrame> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let data = line.strip_prefix("data:")?;
        let data = data.strip_prefix(' ').unwrap_or(data);

        if data == DONE_SENTINEL {
            return Some(StreamFrame::Done);
        }

        match serde_json::from_str::<Value>(data) {
            Ok(value) => {
                if let Some(error) = value.get("error") {
                    let message = match error {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    return Some(StreamFrame::Error(message));
                }
                match value.get("content").and_then(Value::as_str) {
                    Some(content) if !content.is_empty() => {
                        Some(StreamFrame::Content(content.to_string()))
                    }
                    _ => None,
                }
            }
            Err(_) if !data.trim().is_empty() => Some(StreamFrame::Content(data.to_string())),
            Err(_) => None,
        }
    }

    /// Render as a complete SSE event, including the terminating blank line
    pub fn to_sse(&self) -> String {
        let payload = match self {
            StreamFrame::Content(content) => json!({ "content": content }).to_string(),
            StreamFrame::Done => DONE_SENTINEL.to_string(),
            StreamFrame::Error(error) => json!({ "error": error }).to_string(),
        };
        format!("data: {payload}\n\n")
    }
}

/// Reassembles lines from arbitrarily fragmented byte chunks.
///
/// Chunk boundaries may fall anywhere, including inside a multi-byte UTF-8
/// character. Bytes are only decoded once a full line is available.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk and return every line it completed, without line terminators.
    /// Empty lines are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(line) = decode_line(&raw[..raw.len() - 1]) {
                lines.push(line);
            }
        }
        lines
    }

    /// Like [`push`](Self::push), but parse the completed lines into frames
    pub fn push_frames(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        self.push(chunk)
            .iter()
            .filter_map(|line| StreamFrame::parse_line(line))
            .collect()
    }

    /// Take whatever is left after the stream ended without a final newline
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        decode_line(&rest)
    }

    pub fn finish_frame(&mut self) -> Option<StreamFrame> {
        self.finish()
            .and_then(|line| StreamFrame::parse_line(&line))
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    if bytes.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(bytes).into_owned())
}
