//! Session state tracking
//!
//! The observable view of one streaming attempt.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::assembler::{Block, CollectingState, ProtocolAnomaly, CURSOR_INDICATOR};
use crate::error::DecodeError;

/// Keep only the most recent anomalies in the snapshot
const MAX_RETAINED_ANOMALIES: usize = 32;

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Connecting,
    Streaming,
    Completed,
    Errored,
    Cancelled,
}

impl SessionStatus {
    /// A read loop is (or should be) running
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Connecting | SessionStatus::Streaming)
    }

    /// The session reached an end state
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Errored | SessionStatus::Cancelled
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Connecting => write!(f, "connecting"),
            SessionStatus::Streaming => write!(f, "streaming"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Errored => write!(f, "errored"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Anything irregular seen on the stream that did not end the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum StreamAnomaly {
    /// Data line with an undecodable payload
    Decode { payload: String, reason: String },
    /// Line with no recognized SSE prefix
    UnrecognizedLine { line: String },
    /// Event sequence irregularity
    Protocol(ProtocolAnomaly),
}

impl From<DecodeError> for StreamAnomaly {
    fn from(err: DecodeError) -> Self {
        StreamAnomaly::Decode {
            payload: err.payload,
            reason: err.reason,
        }
    }
}

impl From<ProtocolAnomaly> for StreamAnomaly {
    fn from(anomaly: ProtocolAnomaly) -> Self {
        StreamAnomaly::Protocol(anomaly)
    }
}

/// Snapshot of one streaming session, as seen by renderers
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSession {
    pub session_id: Uuid,
    /// Request identifier the stream was opened with
    pub session_key: String,
    pub status: SessionStatus,
    /// Finished blocks in arrival order
    pub completed_blocks: Vec<Block>,
    /// Block being streamed right now
    pub collecting: CollectingState,
    /// Most recent anomalies (bounded)
    pub anomalies: Vec<StreamAnomaly>,
    /// Total anomalies seen, including ones no longer retained
    pub anomaly_count: usize,
    pub bytes_received: usize,
    pub events_received: usize,
    /// Transport failure that ended the session
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Write generation; a read loop may only publish while this matches
    #[serde(skip)]
    pub(crate) epoch: u64,
}

impl ReviewSession {
    /// Fresh session in the connecting state
    pub(crate) fn connecting(session_key: &str, epoch: u64) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            session_key: session_key.to_string(),
            status: SessionStatus::Connecting,
            started_at: Some(Utc::now()),
            epoch,
            ..Default::default()
        }
    }

    pub(crate) fn record_anomaly(&mut self, anomaly: StreamAnomaly) {
        self.anomaly_count += 1;
        if self.anomalies.len() == MAX_RETAINED_ANOMALIES {
            self.anomalies.remove(0);
        }
        self.anomalies.push(anomaly);
    }

    pub(crate) fn finish(&mut self, status: SessionStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    /// In-progress text with a trailing cursor, or None when idle
    pub fn partial_view(&self) -> Option<String> {
        self.collecting
            .is_collecting
            .then(|| format!("{}{}", self.collecting.buffered_text, CURSOR_INDICATOR))
    }
}
