//! Review sessions
//!
//! One session is one streaming attempt tied to a single request identifier.

mod cancellation;
mod controller;
mod state;

pub use cancellation::SessionCancellation;
pub use controller::{SessionController, SessionSettings};
pub use state::{ReviewSession, SessionStatus, StreamAnomaly};
