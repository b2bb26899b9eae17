//! Review stream wire protocol
//!
//! - `decoder` - byte chunks to lines to frames
//! - `event` - typed events carried by `data:` lines

mod decoder;
mod event;

pub use decoder::{Frame, FrameDecoder, SseField};
pub use event::{ReviewEvent, WireEvent};
