//! Tabulation and summary statistics for completed blocks

use serde::Serialize;

use crate::assembler::{Block, BlockId};
use crate::extract::{extract_fields, ReviewFields, Verdict};

/// One table row per completed block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRow {
    /// 1-based position in arrival order
    pub index: usize,
    pub block_id: BlockId,
    pub rule: String,
    pub fields: ReviewFields,
    pub verdict: Verdict,
}

impl ReviewRow {
    fn from_block(index: usize, block: &Block) -> Self {
        let fields = extract_fields(&block.content);
        let verdict = fields.verdict();
        Self {
            index,
            block_id: block.id,
            rule: block.rule.clone(),
            fields,
            verdict,
        }
    }
}

/// Extract every block into a row, keeping arrival order
pub fn tabulate(blocks: &[Block]) -> Vec<ReviewRow> {
    blocks
        .iter()
        .enumerate()
        .map(|(i, block)| ReviewRow::from_block(i + 1, block))
        .collect()
}

/// Verdict counts across a review
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStatistics {
    pub not_compliant: usize,
    pub pending: usize,
    pub compliant: usize,
}

impl ReviewStatistics {
    pub fn from_rows(rows: &[ReviewRow]) -> Self {
        rows.iter().fold(Self::default(), |mut stats, row| {
            stats.count(row.verdict);
            stats
        })
    }

    pub fn from_blocks(blocks: &[Block]) -> Self {
        Self::from_rows(&tabulate(blocks))
    }

    pub fn total(&self) -> usize {
        self.not_compliant + self.pending + self.compliant
    }

    fn count(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::NotCompliant => self.not_compliant += 1,
            Verdict::Pending => self.pending += 1,
            Verdict::Compliant => self.compliant += 1,
        }
    }
}
