//! Display-width aware text helpers
//!
//! Widths are terminal columns, not bytes or chars, so CJK review text lines
//! up with ASCII labels.

use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

#[inline]
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

#[inline]
fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Wrap one line to `max_width` columns
///
/// Latin words move to the next line whole when they fit on one; CJK text
/// breaks between any two characters. Words wider than a line are split.
pub fn wrap_line(line: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 || display_width(line) <= max_width {
        return vec![line.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut width = 0usize;
    // Byte offset in `current` where a break is allowed, and the width up to it
    let mut last_break: Option<(usize, usize)> = None;

    for c in line.chars() {
        let w = char_width(c);

        if width + w > max_width && !current.is_empty() {
            match last_break.take() {
                // Carry the unfinished Latin word over to the next line
                Some((at, before)) if w == 1 && !c.is_whitespace() && at < current.len() => {
                    let carried = current.split_off(at);
                    lines.push(current.trim_end().to_string());
                    width -= before;
                    current = carried;
                }
                _ => {
                    lines.push(current.trim_end().to_string());
                    current = String::new();
                    width = 0;
                }
            }
        }

        if c.is_whitespace() && current.is_empty() {
            continue;
        }
        current.push(c);
        width += w;
        if c.is_whitespace() || w > 1 {
            last_break = Some((current.len(), width));
        }
    }

    if !current.trim_end().is_empty() {
        lines.push(current.trim_end().to_string());
    }
    lines
}

/// Wrap multi-line text, keeping blank lines
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    text.lines()
        .flat_map(|line| {
            if line.trim().is_empty() {
                vec![String::new()]
            } else {
                wrap_line(line, max_width)
            }
        })
        .collect()
}

/// Cut to `max_width` columns with a trailing "..."
pub fn truncate_ellipsis(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width < 4 {
        return Cow::Owned(take_width(s, max_width));
    }
    Cow::Owned(format!("{}...", take_width(s, max_width - 3)))
}

fn take_width(s: &str, max_width: usize) -> String {
    let mut width = 0;
    s.chars()
        .take_while(|c| {
            width += char_width(*c);
            width <= max_width
        })
        .collect()
}

/// Right-pad with spaces to exactly `width` columns (no-op when already wider)
pub fn pad_to_width(s: &str, width: usize) -> String {
    let current = display_width(s);
    if current >= width {
        return s.to_string();
    }
    format!("{}{}", s, " ".repeat(width - current))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_line_untouched() {
        assert_eq!(wrap_line("hello", 10), vec!["hello"]);
    }

    #[test]
    fn test_wraps_at_word_boundary() {
        assert_eq!(wrap_line("hello world foo", 10), vec!["hello", "world foo"]);
    }

    #[test]
    fn test_long_word_is_split() {
        assert_eq!(
            wrap_line("superlongword", 5),
            vec!["super", "longw", "ord"]
        );
    }

    #[test]
    fn test_cjk_breaks_by_column() {
        // each character is two columns wide
        assert_eq!(
            wrap_line("甲方应于三十日内付款", 8),
            vec!["甲方应于", "三十日内", "付款"]
        );
    }

    #[test]
    fn test_mixed_text_fits_width() {
        for line in wrap_line("第十二条 payment within 60 days 不得超过六十日", 12) {
            assert!(display_width(&line) <= 12, "{:?} too wide", line);
        }
    }

    #[test]
    fn test_wrap_text_keeps_blank_lines() {
        assert_eq!(
            wrap_text("hello world\n\nfoo bar", 8),
            vec!["hello", "world", "", "foo bar"]
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate_ellipsis("short", 10), "short");
        assert_eq!(truncate_ellipsis("hello world", 8), "hello...");
        assert_eq!(truncate_ellipsis("合规性评估结果", 7), "合规...");
    }

    #[test]
    fn test_pad() {
        assert_eq!(pad_to_width("符合", 6), "符合  ");
        assert_eq!(pad_to_width("toolong", 3), "toolong");
    }
}
