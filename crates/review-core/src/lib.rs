//! review-core: streaming compliance review consumer
//!
//! Decodes the backend's SSE stream into typed events, reassembles them into
//! review blocks, and publishes session snapshots to observers.

pub mod assembler;
pub mod config;
pub mod error;
pub mod extract;
pub mod presentation;
pub mod session;
pub mod sse;
pub mod transport;

pub use assembler::{Block, BlockAssembler, BlockId, OverlapPolicy, ProtocolAnomaly};
pub use config::ReviewConfig;
pub use error::{ConfigError, DecodeError, TransportError};
pub use extract::{classify, extract_fields, ReviewFields, Verdict};
pub use presentation::{tabulate, PageMarker, Paginator, ReviewRow, ReviewStatistics};
pub use session::{ReviewSession, SessionController, SessionSettings, SessionStatus};
pub use sse::{FrameDecoder, ReviewEvent};
pub use transport::{FixtureTransport, HttpTransport, ReviewTransport};
