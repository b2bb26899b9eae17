//! Conclusion classification

use serde::{Deserialize, Serialize};

/// Checked first so "不符合" never counts as "符合"
const NOT_COMPLIANT_KEYWORDS: &[&str] = &["不符合", "不合规", "违反"];
const PENDING_KEYWORDS: &[&str] = &["待定", "需要", "建议"];
const COMPLIANT_KEYWORDS: &[&str] = &["符合", "通过", "合规"];

/// Summary bucket of one block's conclusion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    NotCompliant,
    Pending,
    Compliant,
}

impl Verdict {
    /// Label shown in review tables
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::NotCompliant => "不符合",
            Verdict::Pending => "待定",
            Verdict::Compliant => "符合",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::NotCompliant => write!(f, "not-compliant"),
            Verdict::Pending => write!(f, "pending"),
            Verdict::Compliant => write!(f, "compliant"),
        }
    }
}

/// Classify an extracted conclusion. Empty or ambiguous text is pending.
pub fn classify(conclusion: &str) -> Verdict {
    let text = conclusion.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

    if mentions(NOT_COMPLIANT_KEYWORDS) {
        Verdict::NotCompliant
    } else if mentions(PENDING_KEYWORDS) {
        Verdict::Pending
    } else if mentions(COMPLIANT_KEYWORDS) {
        Verdict::Compliant
    } else {
        Verdict::Pending
    }
}
