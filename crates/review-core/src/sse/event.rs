//! Review stream event types

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Raw JSON shape carried by a `data:` line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub rule: Option<String>,
}

/// Events that can be decoded from the review stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReviewEvent {
    /// Connection acknowledgement sent before any block
    #[serde(rename = "connection")]
    Connection { message: String },

    /// A review block begins
    #[serde(rename = "start")]
    Start { rule: String },

    /// Text fragment of the open block
    #[serde(rename = "content")]
    Content { chunk: String },

    /// The open block is finished
    #[serde(rename = "end")]
    End,

    /// Backend-reported error message
    #[serde(rename = "error")]
    Error { message: String },

    /// Any other `type` value
    #[serde(rename = "unrecognized")]
    Unrecognized { kind: String },
}

impl ReviewEvent {
    /// Decode one JSON payload into an event
    pub fn parse(payload: &str) -> Result<Self, DecodeError> {
        let wire: WireEvent = serde_json::from_str(payload).map_err(|e| DecodeError {
            payload: payload.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from(wire))
    }

    /// Wire name of the event type
    pub fn kind(&self) -> &str {
        match self {
            ReviewEvent::Connection { .. } => "connection",
            ReviewEvent::Start { .. } => "start",
            ReviewEvent::Content { .. } => "content",
            ReviewEvent::End => "end",
            ReviewEvent::Error { .. } => "error",
            ReviewEvent::Unrecognized { kind } => kind,
        }
    }
}

impl From<WireEvent> for ReviewEvent {
    fn from(wire: WireEvent) -> Self {
        let chunk = wire.chunk.unwrap_or_default();
        match wire.kind.as_str() {
            "connection" => ReviewEvent::Connection { message: chunk },
            "start" => ReviewEvent::Start {
                rule: wire.rule.unwrap_or_default(),
            },
            "content" => ReviewEvent::Content { chunk },
            "end" => ReviewEvent::End,
            "error" => ReviewEvent::Error { message: chunk },
            _ => ReviewEvent::Unrecognized { kind: wire.kind },
        }
    }
}
