//! Best-effort field extraction from a completed block's text
//!
//! Strategies are tried in order; the first one that assigns any field wins.
//! Extraction never fails: plain text lands in `related_text`.

mod keywords;
mod sections;
mod verdict;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use verdict::{classify, Verdict};

/// Structured view of one review block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFields {
    pub related_text: String,
    pub original_regulation: String,
    pub detailed_analysis: String,
    pub special_situations: String,
    pub conclusion: String,
}

impl ReviewFields {
    pub fn is_empty(&self) -> bool {
        self.related_text.is_empty()
            && self.original_regulation.is_empty()
            && self.detailed_analysis.is_empty()
            && self.special_situations.is_empty()
            && self.conclusion.is_empty()
    }

    /// Verdict derived from the conclusion
    pub fn verdict(&self) -> Verdict {
        classify(&self.conclusion)
    }

    fn set(&mut self, field: FieldKind, value: String) {
        let slot = match field {
            FieldKind::RelatedText => &mut self.related_text,
            FieldKind::OriginalRegulation => &mut self.original_regulation,
            FieldKind::DetailedAnalysis => &mut self.detailed_analysis,
            FieldKind::SpecialSituations => &mut self.special_situations,
            FieldKind::Conclusion => &mut self.conclusion,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    RelatedText,
    OriginalRegulation,
    DetailedAnalysis,
    SpecialSituations,
    Conclusion,
}

type Strategy = fn(&str) -> Option<ReviewFields>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("headed_sections", sections::headed_sections),
    ("keyword_scan", keywords::keyword_scan),
    ("identity", identity),
];

fn identity(text: &str) -> Option<ReviewFields> {
    Some(ReviewFields {
        related_text: text.to_string(),
        ..Default::default()
    })
}

/// Split block text into review fields
pub fn extract_fields(text: &str) -> ReviewFields {
    for (name, strategy) in STRATEGIES {
        if let Some(fields) = strategy(text) {
            debug!(strategy = name, "Extracted review fields");
            return fields;
        }
    }
    ReviewFields::default()
}
