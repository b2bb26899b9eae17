//! Stream transports
//!
//! A transport opens one long-lived stream for a session key and hands back
//! raw byte chunks. It knows nothing about frames or blocks.
//!
//! - `http` - live backend over reqwest
//! - `fixture` - replays a canned file with pacing, for development and tests

mod fixture;
mod http;

pub use fixture::{FixtureTiming, FixtureTransport};
pub use http::{HttpTransport, HttpTransportConfig, DEFAULT_STREAM_HEADERS};

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::TransportError;

/// Boxed stream of raw chunks. Ends when the server closes the connection.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Opens the event stream for one session
#[async_trait::async_trait]
pub trait ReviewTransport: Send + Sync {
    /// Submit the session key and return the response body as a chunk stream
    async fn open(&self, session_key: &str) -> Result<ByteStream, TransportError>;
}
