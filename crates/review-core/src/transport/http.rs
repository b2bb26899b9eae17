//! Live backend transport over HTTP

use std::collections::BTreeMap;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use tracing::{debug, info, warn};
use url::Url;

use super::{ByteStream, ReviewTransport};
use crate::error::TransportError;

/// Headers sent with every stream request to keep intermediaries from buffering
pub const DEFAULT_STREAM_HEADERS: &[(&str, &str)] = &[
    ("Accept", "text/event-stream"),
    ("Cache-Control", "no-cache, no-store, must-revalidate"),
    ("Pragma", "no-cache"),
    ("X-Accel-Buffering", "no"),
    ("X-Proxy-Buffering", "no"),
    ("Proxy-Buffering", "no"),
];

/// Settings for the HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Review endpoint the form is posted to
    pub endpoint: Url,
    /// Form field carrying the session key
    pub form_field: String,
    pub connect_timeout: Option<Duration>,
    /// Maximum silence between chunks before the stream is failed
    pub idle_timeout: Option<Duration>,
    /// Sent in addition to (or overriding) the default stream headers
    pub extra_headers: BTreeMap<String, String>,
}

/// POSTs the session key as form data and streams the response body
pub struct HttpTransport {
    client: reqwest::Client,
    config: HttpTransportConfig,
    headers: HeaderMap,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let headers = build_headers(&config.extra_headers)?;

        Ok(Self {
            client,
            config,
            headers,
        })
    }
}

fn build_headers(extra: &BTreeMap<String, String>) -> Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::new();
    let defaults = DEFAULT_STREAM_HEADERS
        .iter()
        .map(|(name, value)| (*name, *value));
    let extras = extra.iter().map(|(name, value)| (name.as_str(), value.as_str()));

    for (name, value) in defaults.chain(extras) {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("header {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidRequest(format!("header {name}: {e}")))?;
        headers.insert(name, value);
    }

    Ok(headers)
}

#[async_trait::async_trait]
impl ReviewTransport for HttpTransport {
    async fn open(&self, session_key: &str) -> Result<ByteStream, TransportError> {
        info!("Opening review stream at {}", self.config.endpoint);

        let form = reqwest::multipart::Form::new()
            .text(self.config.form_field.clone(), session_key.to_string());

        let response = self
            .client
            .post(self.config.endpoint.clone())
            .headers(self.headers.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("");
            let body = response.text().await.unwrap_or_default();
            warn!("Review backend returned {}: {}", status, body);
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: if body.is_empty() {
                    reason.to_string()
                } else {
                    body
                },
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !content_type.contains("text/event-stream") {
            warn!(
                "Backend did not return SSE content type ({:?}), continuing",
                content_type
            );
        }
        debug!("Review stream open: status={}", status);

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Read(e.to_string())));

        Ok(match self.config.idle_timeout {
            Some(idle) => with_idle_timeout(stream, idle),
            None => stream.boxed(),
        })
    }
}

/// Fail the stream if no chunk arrives within `idle`
fn with_idle_timeout<S>(stream: S, idle: Duration) -> ByteStream
where
    S: futures::Stream<Item = Result<bytes::Bytes, TransportError>> + Send + 'static,
{
    let secs = idle.as_secs();
    tokio_stream::StreamExt::timeout(stream, idle)
        .map(move |item| match item {
            Ok(chunk) => chunk,
            Err(_) => Err(TransportError::IdleTimeout(secs)),
        })
        .boxed()
}
