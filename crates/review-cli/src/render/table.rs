//! Summary statistics and the paginated review table

use crossterm::style::Stylize;
use review_core::{PageMarker, Paginator, ReviewRow, ReviewStatistics, Verdict};

use super::markdown::to_plain_text;
use super::text::{pad_to_width, truncate_ellipsis, wrap_text};

/// Width of the field label column
const LABEL_WIDTH: usize = 10;
/// Narrowest value column before wrapping gives up on the terminal width
const MIN_VALUE_WIDTH: usize = 20;
const RULE_TITLE_WIDTH: usize = 60;

fn verdict_text(verdict: Verdict, decorate: bool) -> String {
    let label = verdict.label();
    if !decorate {
        return label.to_string();
    }
    match verdict {
        Verdict::NotCompliant => label.red().bold().to_string(),
        Verdict::Pending => label.yellow().to_string(),
        Verdict::Compliant => label.green().to_string(),
    }
}

pub fn statistics_line(stats: &ReviewStatistics, decorate: bool) -> String {
    format!(
        "{} {} · {} {} · {} {} (total {})",
        verdict_text(Verdict::NotCompliant, decorate),
        stats.not_compliant,
        verdict_text(Verdict::Pending, decorate),
        stats.pending,
        verdict_text(Verdict::Compliant, decorate),
        stats.compliant,
        stats.total()
    )
}

/// One table entry: a title line, then each non-empty field with its label
pub fn row_lines(row: &ReviewRow, width: usize, decorate: bool) -> Vec<String> {
    let rule = if row.rule.is_empty() {
        "(no rule)".to_string()
    } else {
        truncate_ellipsis(&row.rule, RULE_TITLE_WIDTH).into_owned()
    };
    let title = format!("{}. {}", row.index, rule);
    let title = if decorate {
        title.bold().to_string()
    } else {
        title
    };
    let mut lines = vec![format!(
        "{} [{}]",
        title,
        verdict_text(row.verdict, decorate)
    )];

    let fields = [
        ("关联文本", &row.fields.related_text),
        ("条例原文", &row.fields.original_regulation),
        ("详细分析", &row.fields.detailed_analysis),
        ("特殊情况", &row.fields.special_situations),
        ("结论", &row.fields.conclusion),
    ];
    let value_width = width.saturating_sub(LABEL_WIDTH + 2).max(MIN_VALUE_WIDTH);

    for (label, value) in fields {
        let plain = to_plain_text(value);
        if plain.is_empty() {
            continue;
        }
        let mut label_cell = pad_to_width(label, LABEL_WIDTH);
        for line in wrap_text(&plain, value_width) {
            lines.push(format!("  {}{}", label_cell, line).trim_end().to_string());
            label_cell = " ".repeat(LABEL_WIDTH);
        }
    }

    lines
}

/// Page navigator, e.g. `‹ 1 … 4 [5] 6 … 10 ›`
pub fn navigator_line(paginator: &Paginator, len: usize) -> String {
    let current = paginator.current_page();
    let marks: Vec<String> = paginator
        .page_numbers(len)
        .into_iter()
        .map(|marker| match marker {
            PageMarker::Page(n) if n == current => format!("[{}]", n),
            PageMarker::Page(n) => n.to_string(),
            PageMarker::Gap => "…".to_string(),
        })
        .collect();
    format!(
        "‹ {} ›  page {}/{}",
        marks.join(" "),
        current,
        paginator.total_pages(len)
    )
}

/// Horizontal rule spanning `width` columns
pub fn separator(width: usize) -> String {
    "─".repeat(width)
}
