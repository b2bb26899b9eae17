//! Terminal rendering for review sessions

pub mod live;
pub mod markdown;
pub mod table;
pub mod text;

pub use live::LiveRenderer;

/// Terminal width in columns, or a default when not attached to a terminal
pub fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(cols, _)| cols as usize)
        .unwrap_or(100)
        .clamp(40, 160)
}
