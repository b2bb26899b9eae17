//! Heading-based extraction
//!
//! Splits block text on `# ` headings and routes each section by its title.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ReviewFields;

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#\s+").unwrap());
static SUB_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^##\s+").unwrap());

const RELATED_TITLES: &[&str] = &["关联文本", "related"];
const REGULATION_TITLES: &[&str] = &["条例原文", "原文", "regulation"];
const ASSESSMENT_TITLES: &[&str] = &["合规性评估", "评估", "compliance"];
const SPECIAL_TITLES: &[&str] = &["特殊情况", "说明", "special"];
const CONCLUSION_TITLES: &[&str] = &["结论", "conclusion"];

const ANALYSIS_SUBTITLES: &[&str] = &["详细分析", "分析"];
const SPECIAL_SUBTITLES: &[&str] = &["特殊情况", "说明"];

/// A heading line and the text under it
#[derive(Debug, PartialEq, Eq)]
struct Section {
    /// First line, lower-cased
    title: String,
    body: String,
}

impl Section {
    fn titled(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.title.contains(k))
    }
}

/// Text before the first marker becomes a section too; its first line is the title
fn split_sections(text: &str, marker: &Regex) -> Vec<Section> {
    marker
        .split(text)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let part = part.trim();
            let (title, body) = part.split_once('\n').unwrap_or((part, ""));
            Section {
                title: title.trim().to_lowercase(),
                body: body.trim().to_string(),
            }
        })
        .collect()
}

/// Route `# ` sections to fields; None without headings or when nothing was assigned
pub(super) fn headed_sections(text: &str) -> Option<ReviewFields> {
    if !HEADING.is_match(text) {
        return None;
    }

    let mut fields = ReviewFields::default();

    for section in split_sections(text, &HEADING) {
        if section.titled(RELATED_TITLES) {
            fields.related_text = section.body;
        } else if section.titled(REGULATION_TITLES) {
            fields.original_regulation = section.body;
        } else if section.titled(ASSESSMENT_TITLES) {
            assign_assessment(&mut fields, &section.body);
        } else if section.titled(SPECIAL_TITLES) {
            fields.special_situations = section.body;
        } else if section.titled(CONCLUSION_TITLES) {
            fields.conclusion = section.body;
        } else if fields.related_text.is_empty() && !section.body.is_empty() {
            fields.related_text = section.body;
        }
    }

    (!fields.is_empty()).then_some(fields)
}

/// The assessment section may carry `## ` sub-headings for analysis and special cases
fn assign_assessment(fields: &mut ReviewFields, body: &str) {
    if !SUB_HEADING.is_match(body) {
        fields.detailed_analysis = body.to_string();
        return;
    }

    for sub in split_sections(body, &SUB_HEADING) {
        if sub.titled(ANALYSIS_SUBTITLES) {
            fields.detailed_analysis = sub.body;
        } else if sub.titled(SPECIAL_SUBTITLES) {
            fields.special_situations = sub.body;
        } else if fields.detailed_analysis.is_empty() {
            fields.detailed_analysis = sub.body;
        }
    }
}
