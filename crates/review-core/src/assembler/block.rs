//! Completed review blocks and their identifiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a block, unique within one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u64);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id source scoped to one session
#[derive(Debug, Default)]
pub struct BlockIdGenerator {
    last: u64,
}

impl BlockIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> BlockId {
        self.last += 1;
        BlockId(self.last)
    }
}

/// One complete review block, delimited by `start`/`end` events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,
    /// Concatenated `content` chunks
    pub content: String,
    /// Label captured from the `start` event
    pub rule: String,
    pub completed_at: DateTime<Utc>,
}

/// Transient buffer of the block currently being streamed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectingState {
    pub is_collecting: bool,
    pub buffered_text: String,
    pub rule: String,
}

impl CollectingState {
    /// Open a fresh buffer for `rule`
    pub fn open(rule: String) -> Self {
        Self {
            is_collecting: true,
            buffered_text: String::new(),
            rule,
        }
    }

    /// Reset to the empty, non-collecting form
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic_per_generator() {
        let mut first = BlockIdGenerator::new();
        assert_eq!(first.next_id(), BlockId(1));
        assert_eq!(first.next_id(), BlockId(2));

        // A new session starts over
        let mut second = BlockIdGenerator::new();
        assert_eq!(second.next_id(), BlockId(1));
    }

    #[test]
    fn test_clear_resets_collecting_state() {
        let mut state = CollectingState::open("r".to_string());
        state.buffered_text.push_str("text");
        state.clear();
        assert_eq!(state, CollectingState::default());
    }
}
