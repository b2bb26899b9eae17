//! SSE (Server-Sent Events) frame decoding
//!
//! Turns arbitrarily split network chunks into complete lines, and complete
//! lines into review events.

use std::time::Instant;

use tracing::{debug, info, warn};

use super::event::ReviewEvent;
use crate::error::DecodeError;

/// Informational SSE fields that carry no event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseField {
    Event,
    Id,
    Retry,
    Comment,
}

/// One decoded line of the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A data line carrying a valid event
    Event(ReviewEvent),
    /// A data line whose JSON could not be decoded (dropped, stream continues)
    Malformed(DecodeError),
    /// `event:`, `id:`, `retry:` or a `:` comment
    Field { field: SseField, value: String },
    /// A line with no recognized prefix
    Unrecognized(String),
}

/// SSE line decoder that handles partial lines across chunks
pub struct FrameDecoder {
    /// Bytes of the trailing incomplete line from previous chunks
    partial_line: Vec<u8>,
    /// When decoding started
    stream_start: Instant,
    /// Lines processed
    line_count: usize,
    /// Events decoded
    event_count: usize,
    /// Bytes received counter
    bytes_received: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            partial_line: Vec::new(),
            stream_start: Instant::now(),
            line_count: 0,
            event_count: 0,
            bytes_received: 0,
        }
    }

    /// Total bytes pushed so far
    pub fn bytes_received(&self) -> usize {
        self.bytes_received
    }

    /// Total events decoded so far
    pub fn event_count(&self) -> usize {
        self.event_count
    }

    /// Feed one chunk and return frames for every line it completes
    ///
    /// Splitting happens on raw bytes so a multi-byte character cut in half
    /// by the network is reassembled before UTF-8 decoding.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.bytes_received += chunk.len();
        debug!(
            "SSE chunk received: {} bytes (total: {} bytes)",
            chunk.len(),
            self.bytes_received
        );
        self.partial_line.extend_from_slice(chunk);

        let Some(last_newline) = self.partial_line.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let rest = self.partial_line.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.partial_line, rest);

        complete
            .split(|b| *b == b'\n')
            .filter_map(|line| self.decode_line(line))
            .collect()
    }

    /// Flush a final line that arrived without a trailing newline
    pub fn finish(&mut self) -> Vec<Frame> {
        let leftover = std::mem::take(&mut self.partial_line);
        let frames: Vec<Frame> = self.decode_line(&leftover).into_iter().collect();
        info!(
            "SSE decoder finishing: {:?} elapsed, {} lines, {} events, {} bytes total",
            self.stream_start.elapsed(),
            self.line_count,
            self.event_count,
            self.bytes_received
        );
        frames
    }

    fn decode_line(&mut self, raw: &[u8]) -> Option<Frame> {
        let text = String::from_utf8_lossy(raw);
        let line = text.trim();

        // Blank lines separate records
        if line.is_empty() {
            return None;
        }
        self.line_count += 1;

        if let Some(comment) = line.strip_prefix(':') {
            debug!("SSE comment: {}", comment.trim());
            return Some(Frame::Field {
                field: SseField::Comment,
                value: comment.trim().to_string(),
            });
        }

        if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            if data.is_empty() {
                return None;
            }
            return Some(self.decode_payload(data));
        }

        for (prefix, field) in [
            ("event:", SseField::Event),
            ("id:", SseField::Id),
            ("retry:", SseField::Retry),
        ] {
            if let Some(value) = line.strip_prefix(prefix) {
                debug!("SSE field {:?}: {}", field, value.trim());
                return Some(Frame::Field {
                    field,
                    value: value.trim().to_string(),
                });
            }
        }

        // Some backends write bare JSON without the data prefix
        if line.starts_with('{') && line.ends_with('}') {
            debug!("SSE bare JSON line");
            return Some(self.decode_payload(line));
        }

        warn!("Unrecognized SSE line: {:?}", line);
        Some(Frame::Unrecognized(line.to_string()))
    }

    fn decode_payload(&mut self, data: &str) -> Frame {
        match ReviewEvent::parse(data) {
            Ok(event) => {
                self.event_count += 1;
                debug!(
                    "SSE event #{} at {:?}: type={}",
                    self.event_count,
                    self.stream_start.elapsed(),
                    event.kind()
                );
                Frame::Event(event)
            }
            Err(e) => {
                warn!("Failed to parse SSE JSON (line #{}): {}", self.line_count, e);
                Frame::Malformed(e)
            }
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
