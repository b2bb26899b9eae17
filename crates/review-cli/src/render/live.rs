//! Incremental terminal output for a streaming session
//!
//! Snapshots from the watch channel may coalesce several changes, so the
//! renderer diffs each one against what it already printed instead of
//! reacting to individual events.

use std::io::{self, Write};

use crossterm::cursor::MoveLeft;
use crossterm::queue;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use review_core::assembler::{Block, CURSOR_INDICATOR};
use review_core::ReviewSession;

/// Block whose text is being printed as it streams
#[derive(Debug)]
struct PartialBlock {
    rule: String,
    printed: String,
}

pub struct LiveRenderer<W: Write> {
    out: W,
    /// Colors and the cursor indicator; off when stdout is not a terminal
    decorate: bool,
    announced: usize,
    partial: Option<PartialBlock>,
    cursor_shown: bool,
    at_line_start: bool,
}

impl<W: Write> LiveRenderer<W> {
    pub fn new(out: W, decorate: bool) -> Self {
        Self {
            out,
            decorate,
            announced: 0,
            partial: None,
            cursor_shown: false,
            at_line_start: true,
        }
    }

    /// Print whatever changed since the previous snapshot
    pub fn render(&mut self, session: &ReviewSession) -> io::Result<()> {
        self.hide_cursor()?;

        let new_blocks = session
            .completed_blocks
            .get(self.announced..)
            .unwrap_or_default();
        for block in new_blocks {
            self.complete_block(block)?;
            self.announced += 1;
        }

        let collecting = &session.collecting;
        if collecting.is_collecting {
            self.stream_partial(&collecting.rule, &collecting.buffered_text)?;
            self.show_cursor()?;
        } else if self.partial.take().is_some() {
            self.note("incomplete block dropped")?;
        }

        self.out.flush()
    }

    /// Remove the cursor and end the current line
    pub fn finish(&mut self) -> io::Result<()> {
        self.hide_cursor()?;
        if self.partial.take().is_some() {
            self.note("incomplete block dropped")?;
        }
        self.end_line()?;
        self.out.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn complete_block(&mut self, block: &Block) -> io::Result<()> {
        match self.partial.take() {
            Some(partial)
                if partial.rule == block.rule && block.content.starts_with(&partial.printed) =>
            {
                self.write(&block.content[partial.printed.len()..])?;
            }
            previous => {
                if previous.is_some() {
                    self.note("unterminated block discarded")?;
                }
                self.header(&block.rule)?;
                self.write(&block.content)?;
            }
        }

        self.end_line()?;
        let footer = format!(
            "✔ {} {} · {} chars",
            block.id,
            block.rule,
            block.content.chars().count()
        );
        let footer = if self.decorate {
            footer.green().to_string()
        } else {
            footer
        };
        self.write(&footer)?;
        self.end_line()?;
        self.write("\n")
    }

    fn stream_partial(&mut self, rule: &str, text: &str) -> io::Result<()> {
        let continues = matches!(
            &self.partial,
            Some(partial) if partial.rule == rule && text.starts_with(&partial.printed)
        );

        if continues {
            let printed = self.partial.as_ref().map_or(0, |p| p.printed.len());
            self.write(&text[printed..])?;
        } else {
            if self.partial.is_some() {
                self.note("unterminated block discarded")?;
            }
            self.header(rule)?;
            self.write(text)?;
        }

        self.partial = Some(PartialBlock {
            rule: rule.to_string(),
            printed: text.to_string(),
        });
        Ok(())
    }

    fn header(&mut self, rule: &str) -> io::Result<()> {
        self.end_line()?;
        let title = format!("▶ {}", if rule.is_empty() { "(no rule)" } else { rule });
        let title = if self.decorate {
            title.cyan().bold().to_string()
        } else {
            title
        };
        self.write(&title)?;
        self.write("\n")
    }

    fn note(&mut self, message: &str) -> io::Result<()> {
        self.end_line()?;
        let text = format!("({})", message);
        let text = if self.decorate {
            text.dark_grey().to_string()
        } else {
            text
        };
        self.write(&text)?;
        self.write("\n")
    }

    fn show_cursor(&mut self) -> io::Result<()> {
        if self.decorate {
            write!(self.out, "{}", CURSOR_INDICATOR)?;
            self.cursor_shown = true;
        }
        Ok(())
    }

    fn hide_cursor(&mut self) -> io::Result<()> {
        if self.cursor_shown {
            queue!(self.out, MoveLeft(1), Clear(ClearType::UntilNewLine))?;
            self.cursor_shown = false;
        }
        Ok(())
    }

    fn end_line(&mut self) -> io::Result<()> {
        if self.at_line_start {
            Ok(())
        } else {
            self.write("\n")
        }
    }

    fn write(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.out.write_all(text.as_bytes())?;
        self.at_line_start = text.ends_with('\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use review_core::assembler::{BlockId, CollectingState};

    fn collecting(rule: &str, text: &str) -> CollectingState {
        let mut state = CollectingState::open(rule.to_string());
        state.buffered_text.push_str(text);
        state
    }

    fn block(id: u64, rule: &str, content: &str) -> Block {
        Block {
            id: BlockId(id),
            content: content.to_string(),
            rule: rule.to_string(),
            completed_at: Utc::now(),
        }
    }

    fn output(renderer: LiveRenderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn test_streams_deltas_then_footer() {
        let mut renderer = LiveRenderer::new(Vec::new(), false);
        let mut session = ReviewSession::default();

        session.collecting = collecting("第一条", "甲方");
        renderer.render(&session).unwrap();
        session.collecting = collecting("第一条", "甲方应付款");
        renderer.render(&session).unwrap();

        session.collecting = CollectingState::default();
        session.completed_blocks = vec![block(1, "第一条", "甲方应付款。")];
        renderer.render(&session).unwrap();

        assert_eq!(
            output(renderer),
            "▶ 第一条\n甲方应付款。\n✔ #1 第一条 · 6 chars\n\n"
        );
    }

    #[test]
    fn test_block_never_seen_partially_is_printed_whole() {
        let mut renderer = LiveRenderer::new(Vec::new(), false);
        let mut session = ReviewSession::default();
        session.completed_blocks = vec![block(1, "r", "text")];
        renderer.render(&session).unwrap();
        // Re-rendering the same snapshot prints nothing new
        renderer.render(&session).unwrap();

        assert_eq!(output(renderer), "▶ r\ntext\n✔ #1 r · 4 chars\n\n");
    }

    #[test]
    fn test_discarded_partial_is_noted() {
        let mut renderer = LiveRenderer::new(Vec::new(), false);
        let mut session = ReviewSession::default();
        session.collecting = collecting("old", "lost");
        renderer.render(&session).unwrap();
        session.collecting = collecting("new", "");
        renderer.render(&session).unwrap();

        assert_eq!(
            output(renderer),
            "▶ old\nlost\n(unterminated block discarded)\n▶ new\n"
        );
    }

    #[test]
    fn test_finish_notes_dropped_partial() {
        let mut renderer = LiveRenderer::new(Vec::new(), false);
        let mut session = ReviewSession::default();
        session.collecting = collecting("r", "half");
        renderer.render(&session).unwrap();
        renderer.finish().unwrap();

        assert_eq!(output(renderer), "▶ r\nhalf\n(incomplete block dropped)\n");
    }

    #[test]
    fn test_cursor_only_when_decorated() {
        let mut renderer = LiveRenderer::new(Vec::new(), true);
        let mut session = ReviewSession::default();
        session.collecting = collecting("r", "abc");
        renderer.render(&session).unwrap();
        assert!(output(renderer).ends_with(&format!("abc{}", CURSOR_INDICATOR)));
    }
}
