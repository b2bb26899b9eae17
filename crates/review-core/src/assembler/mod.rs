//! Block assembly state machine
//!
//! Turns `start` / `content` / `end` events into completed blocks.
//! Owns the "currently collecting" buffer; nothing else mutates it.

mod block;

pub use block::{Block, BlockId, BlockIdGenerator, CollectingState};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::sse::ReviewEvent;

/// Cursor shown after in-progress text
pub const CURSOR_INDICATOR: char = '▌';

/// What to do with an unfinished block when a new `start` arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverlapPolicy {
    /// Drop the unfinished buffer without emitting it (lossy)
    #[default]
    #[serde(rename = "discard")]
    Discard,
    /// Emit the unfinished buffer as a block, then start the new one
    #[serde(rename = "finalize")]
    FinalizeUnterminated,
}

/// Protocol-level irregularities. Ignored for session status, but logged
/// and surfaced to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "anomaly", rename_all = "snake_case")]
pub enum ProtocolAnomaly {
    /// `content` with no open block; the chunk was dropped
    ContentOutsideBlock { chunk_len: usize },
    /// `end` with no open block
    EndOutsideBlock,
    /// `start` while a block was open; the old buffer was discarded
    OverlappingStart {
        discarded_rule: String,
        discarded_len: usize,
    },
    /// Backend sent an `error` event
    BackendError { message: String },
    /// Unknown `type` value
    UnrecognizedType { kind: String },
}

impl std::fmt::Display for ProtocolAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolAnomaly::ContentOutsideBlock { chunk_len } => {
                write!(f, "content outside block ({} bytes dropped)", chunk_len)
            }
            ProtocolAnomaly::EndOutsideBlock => write!(f, "end outside block"),
            ProtocolAnomaly::OverlappingStart {
                discarded_rule,
                discarded_len,
            } => write!(
                f,
                "start while collecting '{}' ({} bytes discarded)",
                discarded_rule, discarded_len
            ),
            ProtocolAnomaly::BackendError { message } => write!(f, "backend error: {}", message),
            ProtocolAnomaly::UnrecognizedType { kind } => {
                write!(f, "unrecognized event type '{}'", kind)
            }
        }
    }
}

/// Result of applying one event
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Block finalized by this event
    pub completed: Option<Block>,
    /// Irregularity observed while applying it
    pub anomaly: Option<ProtocolAnomaly>,
    /// Whether the in-progress view changed
    pub partial_changed: bool,
}

/// The block lifecycle state machine
#[derive(Debug)]
pub struct BlockAssembler {
    collecting: CollectingState,
    policy: OverlapPolicy,
    ids: BlockIdGenerator,
}

impl BlockAssembler {
    pub fn new(policy: OverlapPolicy) -> Self {
        Self {
            collecting: CollectingState::default(),
            policy,
            ids: BlockIdGenerator::new(),
        }
    }

    /// Current in-progress buffer
    pub fn collecting(&self) -> &CollectingState {
        &self.collecting
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting.is_collecting
    }

    /// In-progress text with a trailing cursor, or None when idle
    pub fn partial_view(&self) -> Option<String> {
        self.is_collecting()
            .then(|| format!("{}{}", self.collecting.buffered_text, CURSOR_INDICATOR))
    }

    /// Apply one event to the state machine
    pub fn apply(&mut self, event: ReviewEvent) -> Transition {
        let mut transition = Transition::default();

        match event {
            ReviewEvent::Start { rule } => {
                if self.is_collecting() {
                    let (completed, anomaly) = self.resolve_overlap();
                    transition.completed = completed;
                    transition.anomaly = anomaly;
                }
                info!(rule = %rule, "Block start");
                self.collecting = CollectingState::open(rule);
                transition.partial_changed = true;
            }
            ReviewEvent::Content { chunk } => {
                if self.is_collecting() {
                    self.collecting.buffered_text.push_str(&chunk);
                    debug!(
                        "  -> Content: {} chars, buffer {} bytes",
                        chunk.chars().count(),
                        self.collecting.buffered_text.len()
                    );
                    transition.partial_changed = true;
                } else {
                    warn!("Dropping content outside block ({} bytes)", chunk.len());
                    transition.anomaly = Some(ProtocolAnomaly::ContentOutsideBlock {
                        chunk_len: chunk.len(),
                    });
                }
            }
            ReviewEvent::End => {
                if self.is_collecting() {
                    let block = self.finalize();
                    info!(
                        rule = %block.rule,
                        id = %block.id,
                        "Block complete: {} bytes",
                        block.content.len()
                    );
                    transition.completed = Some(block);
                    transition.partial_changed = true;
                } else {
                    warn!("Ignoring end outside block");
                    transition.anomaly = Some(ProtocolAnomaly::EndOutsideBlock);
                }
            }
            ReviewEvent::Connection { message } => {
                debug!("Connection acknowledged: {}", message);
            }
            ReviewEvent::Error { message } => {
                warn!("Backend error event: {}", message);
                transition.anomaly = Some(ProtocolAnomaly::BackendError { message });
            }
            ReviewEvent::Unrecognized { kind } => {
                debug!("Ignoring event type: {}", kind);
                transition.anomaly = Some(ProtocolAnomaly::UnrecognizedType { kind });
            }
        }

        transition
    }

    /// Decision point for a `start` that arrives while a block is open
    fn resolve_overlap(&mut self) -> (Option<Block>, Option<ProtocolAnomaly>) {
        match self.policy {
            OverlapPolicy::Discard => {
                let discarded = std::mem::take(&mut self.collecting);
                warn!(
                    rule = %discarded.rule,
                    "Discarding unterminated block ({} bytes)",
                    discarded.buffered_text.len()
                );
                (
                    None,
                    Some(ProtocolAnomaly::OverlappingStart {
                        discarded_rule: discarded.rule,
                        discarded_len: discarded.buffered_text.len(),
                    }),
                )
            }
            OverlapPolicy::FinalizeUnterminated => {
                let block = self.finalize();
                info!(rule = %block.rule, "Force-finalized unterminated block");
                (Some(block), None)
            }
        }
    }

    fn finalize(&mut self) -> Block {
        let state = std::mem::take(&mut self.collecting);
        Block {
            id: self.ids.next_id(),
            content: state.buffered_text,
            rule: state.rule,
            completed_at: Utc::now(),
        }
    }
}

impl Default for BlockAssembler {
    fn default() -> Self {
        Self::new(OverlapPolicy::default())
    }
}
