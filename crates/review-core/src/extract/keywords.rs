//! Keyword-scan extraction for blocks without usable headings

use once_cell::sync::Lazy;
use regex::Regex;

use super::{FieldKind, ReviewFields};

/// Keyword patterns per field. Later patterns in a list override earlier matches.
const FIELD_KEYWORDS: &[(FieldKind, &[&str])] = &[
    (FieldKind::RelatedText, &["关联文本", "相关内容", "背景信息"]),
    (
        FieldKind::OriginalRegulation,
        &["条例原文", "原文内容", "第.*条"],
    ),
    (
        FieldKind::DetailedAnalysis,
        &["详细分析", "合规性评估", "评估结果"],
    ),
    (
        FieldKind::SpecialSituations,
        &["特殊情况", "注意事项", "说明"],
    ),
    (FieldKind::Conclusion, &["结论", "总结", "建议"]),
];

/// Any keyword; marks where a captured span ends
static ANY_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    let alternation = FIELD_KEYWORDS
        .iter()
        .flat_map(|(_, patterns)| patterns.iter().copied())
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i){}", alternation)).unwrap()
});

/// A keyword followed by an optional colon and whitespace
static FIELD_PATTERNS: Lazy<Vec<(FieldKind, Regex)>> = Lazy::new(|| {
    FIELD_KEYWORDS
        .iter()
        .flat_map(|(field, patterns)| {
            patterns.iter().map(move |pattern| {
                let regex = Regex::new(&format!(r"(?i){}[：:]?\s*", pattern)).unwrap();
                (*field, regex)
            })
        })
        .collect()
});

/// Span after the first occurrence of `pattern`, up to the next keyword
fn span_after<'a>(text: &'a str, pattern: &Regex) -> Option<&'a str> {
    let found = pattern.find(text)?;
    let rest = &text[found.end()..];
    let end = ANY_KEYWORD
        .find(rest)
        .map(|next| next.start())
        .unwrap_or(rest.len());
    let span = rest[..end].trim();
    (!span.is_empty()).then_some(span)
}

/// Scan the whole text for field keywords; None when nothing matched
pub(super) fn keyword_scan(text: &str) -> Option<ReviewFields> {
    let mut fields = ReviewFields::default();

    for (field, pattern) in FIELD_PATTERNS.iter() {
        if let Some(span) = span_after(text, pattern) {
            fields.set(*field, span.to_string());
        }
    }

    (!fields.is_empty()).then_some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_stops_at_next_keyword() {
        let text = "关联文本：合同付款约定 条例原文：第五条 结论：符合";
        let fields = keyword_scan(text).unwrap();
        assert_eq!(fields.related_text, "合同付款约定");
        assert_eq!(fields.conclusion, "符合");
    }

    #[test]
    fn test_span_runs_to_end_of_text() {
        let fields = keyword_scan("总结:\n整体合规").unwrap();
        assert_eq!(fields.conclusion, "整体合规");
    }

    #[test]
    fn test_keyword_immediately_followed_by_keyword_is_skipped() {
        // "结论" is directly followed by "建议", so only "建议" captures text
        let fields = keyword_scan("结论：建议补充材料").unwrap();
        assert_eq!(fields.conclusion, "补充材料");
    }

    #[test]
    fn test_no_keywords() {
        assert_eq!(keyword_scan("plain text without markers"), None);
    }
}
