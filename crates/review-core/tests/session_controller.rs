//! End-to-end session behaviour against in-memory transports

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio_stream::wrappers::UnboundedReceiverStream;

use review_core::assembler::OverlapPolicy;
use review_core::session::StreamAnomaly;
use review_core::transport::ByteStream;
use review_core::{
    BlockId, ProtocolAnomaly, ReviewSession, ReviewTransport, SessionController,
    SessionSettings, SessionStatus, TransportError,
};

type Chunk = Result<Bytes, TransportError>;

/// Replays the same chunks on every open
struct ScriptedTransport {
    chunks: Vec<Chunk>,
}

impl ScriptedTransport {
    fn new(chunks: Vec<Chunk>) -> Arc<Self> {
        Arc::new(Self { chunks })
    }

    fn from_text(text: &str) -> Arc<Self> {
        Self::new(vec![Ok(Bytes::from(text.to_string()))])
    }
}

#[async_trait::async_trait]
impl ReviewTransport for ScriptedTransport {
    async fn open(&self, _session_key: &str) -> Result<ByteStream, TransportError> {
        Ok(futures::stream::iter(self.chunks.clone()).boxed())
    }
}

/// Hands out one caller-driven channel per open
struct ChannelTransport {
    receivers: Mutex<VecDeque<mpsc::UnboundedReceiver<Chunk>>>,
}

impl ChannelTransport {
    fn new(count: usize) -> (Arc<Self>, Vec<mpsc::UnboundedSender<Chunk>>) {
        let mut senders = Vec::new();
        let mut receivers = VecDeque::new();
        for _ in 0..count {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.push(tx);
            receivers.push_back(rx);
        }
        let transport = Arc::new(Self {
            receivers: Mutex::new(receivers),
        });
        (transport, senders)
    }
}

#[async_trait::async_trait]
impl ReviewTransport for ChannelTransport {
    async fn open(&self, _session_key: &str) -> Result<ByteStream, TransportError> {
        let rx = self
            .receivers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::Connect("no more channels".to_string()))?;
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }
}

struct FailingTransport(TransportError);

#[async_trait::async_trait]
impl ReviewTransport for FailingTransport {
    async fn open(&self, _session_key: &str) -> Result<ByteStream, TransportError> {
        Err(self.0.clone())
    }
}

fn data(payload: &str) -> String {
    format!("data: {}\n\n", payload)
}

fn block_text(rule: &str, chunks: &[&str]) -> String {
    let mut text = data(&format!(r#"{{"type":"start","rule":"{}"}}"#, rule));
    for chunk in chunks {
        text.push_str(&data(
            &serde_json::json!({"type": "content", "chunk": chunk}).to_string(),
        ));
    }
    text.push_str(&data(r#"{"type":"end"}"#));
    text
}

fn ok(text: &str) -> Chunk {
    Ok(Bytes::from(text.to_string()))
}

async fn wait_until(
    rx: &mut watch::Receiver<ReviewSession>,
    f: impl FnMut(&ReviewSession) -> bool,
) -> ReviewSession {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(f))
        .await
        .expect("timed out waiting for session state")
        .expect("session channel closed")
        .clone()
}

async fn run_to_end(transport: Arc<dyn ReviewTransport>, settings: SessionSettings) -> ReviewSession {
    let mut controller = SessionController::new(transport, settings);
    controller.start("review-1").await;
    controller.wait().await;
    controller.snapshot()
}

#[tokio::test]
async fn test_blocks_assembled_in_order() {
    let body = format!(
        ":ok\n\n{}{}{}",
        data(r#"{"type":"connection","chunk":"ready"}"#),
        block_text("第一条", &["甲方", "应付款"]),
        block_text("第二条", &["乙方"]),
    );
    let session = run_to_end(ScriptedTransport::from_text(&body), SessionSettings::default()).await;

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.session_key, "review-1");
    assert_eq!(session.completed_blocks.len(), 2);
    assert_eq!(session.completed_blocks[0].id, BlockId(1));
    assert_eq!(session.completed_blocks[0].rule, "第一条");
    assert_eq!(session.completed_blocks[0].content, "甲方应付款");
    assert_eq!(session.completed_blocks[1].content, "乙方");
    assert!(!session.collecting.is_collecting);
    assert!(session.anomalies.is_empty());
    assert_eq!(session.bytes_received, body.len());
    assert!(session.finished_at.is_some());
}

#[tokio::test]
async fn test_chunk_boundaries_do_not_matter() {
    let body = block_text("第三条", &["中文内容，跨越分片边界", "\n", "第二行"]);
    let chunks: Vec<Chunk> = body
        .as_bytes()
        .chunks(3)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();

    let session = run_to_end(ScriptedTransport::new(chunks), SessionSettings::default()).await;

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.completed_blocks.len(), 1);
    assert_eq!(
        session.completed_blocks[0].content,
        "中文内容，跨越分片边界\n第二行"
    );
}

#[tokio::test]
async fn test_malformed_line_recorded_and_stream_continues() {
    let body = format!(
        "{}{}{}{}",
        data(r#"{"type":"start","rule":"r"}"#),
        data(r#"{"type":"content","chu"#),
        data(r#"{"type":"content","chunk":"kept"}"#),
        data(r#"{"type":"end"}"#),
    );
    let session = run_to_end(ScriptedTransport::from_text(&body), SessionSettings::default()).await;

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.completed_blocks.len(), 1);
    assert_eq!(session.completed_blocks[0].content, "kept");
    assert_eq!(session.anomaly_count, 1);
    assert!(matches!(session.anomalies[0], StreamAnomaly::Decode { .. }));
}

#[tokio::test]
async fn test_protocol_anomalies_are_ignored() {
    let body = format!(
        "{}{}{}{}",
        data(r#"{"type":"content","chunk":"stray"}"#),
        data(r#"{"type":"end"}"#),
        data(r#"{"type":"heartbeat"}"#),
        block_text("r", &["ok"]),
    );
    let session = run_to_end(ScriptedTransport::from_text(&body), SessionSettings::default()).await;

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.completed_blocks.len(), 1);
    assert_eq!(session.completed_blocks[0].content, "ok");
    assert_eq!(
        session.anomalies,
        vec![
            StreamAnomaly::Protocol(ProtocolAnomaly::ContentOutsideBlock { chunk_len: 5 }),
            StreamAnomaly::Protocol(ProtocolAnomaly::EndOutsideBlock),
            StreamAnomaly::Protocol(ProtocolAnomaly::UnrecognizedType {
                kind: "heartbeat".to_string()
            }),
        ]
    );
}

#[tokio::test]
async fn test_overlapping_start_discards_by_default() {
    let body = format!(
        "{}{}{}",
        data(r#"{"type":"start","rule":"first"}"#),
        data(r#"{"type":"content","chunk":"lost"}"#),
        block_text("second", &["kept"]),
    );
    let session = run_to_end(ScriptedTransport::from_text(&body), SessionSettings::default()).await;

    assert_eq!(session.completed_blocks.len(), 1);
    assert_eq!(session.completed_blocks[0].rule, "second");
    assert_eq!(session.completed_blocks[0].content, "kept");
    assert_eq!(
        session.anomalies,
        vec![StreamAnomaly::Protocol(ProtocolAnomaly::OverlappingStart {
            discarded_rule: "first".to_string(),
            discarded_len: 4,
        })]
    );
}

#[tokio::test]
async fn test_overlapping_start_finalizes_when_configured() {
    let body = format!(
        "{}{}{}",
        data(r#"{"type":"start","rule":"first"}"#),
        data(r#"{"type":"content","chunk":"partial"}"#),
        block_text("second", &["kept"]),
    );
    let settings = SessionSettings {
        overlap_policy: OverlapPolicy::FinalizeUnterminated,
    };
    let session = run_to_end(ScriptedTransport::from_text(&body), settings).await;

    assert_eq!(session.completed_blocks.len(), 2);
    assert_eq!(session.completed_blocks[0].rule, "first");
    assert_eq!(session.completed_blocks[0].content, "partial");
    assert_eq!(session.completed_blocks[1].id, BlockId(2));
    assert!(session.anomalies.is_empty());
}

#[tokio::test]
async fn test_unterminated_block_at_end_of_stream_is_dropped() {
    let body = format!(
        "{}{}",
        block_text("done", &["a"]),
        data(r#"{"type":"start","rule":"open"}"#),
    );
    let session = run_to_end(ScriptedTransport::from_text(&body), SessionSettings::default()).await;

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.completed_blocks.len(), 1);
    assert!(!session.collecting.is_collecting);
    assert_eq!(session.partial_view(), None);
}

#[tokio::test]
async fn test_final_line_without_newline_is_applied() {
    let body = format!(
        "{}{}data: {}",
        data(r#"{"type":"start","rule":"r"}"#),
        data(r#"{"type":"content","chunk":"x"}"#),
        r#"{"type":"end"}"#,
    );
    let session = run_to_end(ScriptedTransport::from_text(&body), SessionSettings::default()).await;
    assert_eq!(session.completed_blocks.len(), 1);
}

#[tokio::test]
async fn test_transport_error_mid_stream() {
    let transport = ScriptedTransport::new(vec![
        ok(&block_text("r", &["saved"])),
        ok(&data(r#"{"type":"start","rule":"next"}"#)),
        Err(TransportError::Read("connection reset".to_string())),
    ]);
    let session = run_to_end(transport, SessionSettings::default()).await;

    assert_eq!(session.status, SessionStatus::Errored);
    assert_eq!(session.completed_blocks.len(), 1);
    assert!(!session.collecting.is_collecting);
    assert!(session.error.as_deref().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn test_open_failure_is_errored() {
    let transport = Arc::new(FailingTransport(TransportError::Status {
        status: 502,
        body: "Bad Gateway".to_string(),
    }));
    let session = run_to_end(transport, SessionSettings::default()).await;

    assert_eq!(session.status, SessionStatus::Errored);
    assert!(session.completed_blocks.is_empty());
    assert!(session.error.as_deref().unwrap().contains("502"));
}

#[tokio::test]
async fn test_partial_view_while_streaming() {
    let (transport, senders) = ChannelTransport::new(1);
    let mut controller = SessionController::new(transport, SessionSettings::default());
    let mut rx = controller.subscribe();
    controller.start("key").await;

    let tx = &senders[0];
    tx.send(ok(&data(r#"{"type":"start","rule":"r"}"#))).unwrap();
    tx.send(ok(&data(r#"{"type":"content","chunk":"部分"}"#))).unwrap();

    let session = wait_until(&mut rx, |s| s.collecting.buffered_text == "部分").await;
    assert_eq!(session.status, SessionStatus::Streaming);
    assert_eq!(session.partial_view().as_deref(), Some("部分▌"));
    assert!(session.completed_blocks.is_empty());

    tx.send(ok(&data(r#"{"type":"end"}"#))).unwrap();
    let session = wait_until(&mut rx, |s| s.completed_blocks.len() == 1).await;
    assert_eq!(session.partial_view(), None);
}

#[tokio::test]
async fn test_cancel_keeps_blocks_and_stops_mutation() {
    let (transport, senders) = ChannelTransport::new(1);
    let mut controller = SessionController::new(transport, SessionSettings::default());
    let mut rx = controller.subscribe();
    controller.start("key").await;

    let tx = &senders[0];
    tx.send(ok(&block_text("kept", &["one"]))).unwrap();
    tx.send(ok(&data(r#"{"type":"start","rule":"open"}"#))).unwrap();
    wait_until(&mut rx, |s| s.collecting.is_collecting).await;

    controller.cancel();
    let cancelled = controller.snapshot();
    assert_eq!(cancelled.status, SessionStatus::Cancelled);
    assert_eq!(cancelled.completed_blocks.len(), 1);
    assert!(!cancelled.collecting.is_collecting);

    // Late data must not land
    let _ = tx.send(ok(&data(r#"{"type":"content","chunk":"late"}"#)));
    let _ = tx.send(ok(&data(r#"{"type":"end"}"#)));
    assert_eq!(controller.wait().await, SessionStatus::Cancelled);

    let after = controller.snapshot();
    assert_eq!(after.completed_blocks.len(), 1);
    assert_eq!(after.events_received, cancelled.events_received);
    assert!(after.collecting.buffered_text.is_empty());
}

#[tokio::test]
async fn test_cancel_after_completion_is_noop() {
    let mut controller = SessionController::new(
        ScriptedTransport::from_text(&block_text("r", &["x"])),
        SessionSettings::default(),
    );
    controller.start("key").await;
    controller.wait().await;

    controller.cancel();
    assert_eq!(controller.status(), SessionStatus::Completed);
}

#[tokio::test]
async fn test_restart_resets_session() {
    let mut controller = SessionController::new(
        ScriptedTransport::from_text(&block_text("r", &["x"])),
        SessionSettings::default(),
    );
    controller.start("first").await;
    controller.wait().await;
    let first = controller.snapshot();

    controller.start("second").await;
    controller.wait().await;
    let second = controller.snapshot();

    assert_ne!(first.session_id, second.session_id);
    assert_eq!(second.session_key, "second");
    assert_eq!(second.completed_blocks.len(), 1);
    assert_eq!(second.completed_blocks[0].id, BlockId(1));
}

#[tokio::test]
async fn test_restart_supersedes_running_loop() {
    let (transport, senders) = ChannelTransport::new(2);
    let mut controller = SessionController::new(transport, SessionSettings::default());
    let mut rx = controller.subscribe();

    controller.start("a").await;
    senders[0]
        .send(ok(&data(r#"{"type":"start","rule":"old"}"#)))
        .unwrap();
    wait_until(&mut rx, |s| s.collecting.is_collecting).await;

    controller.start("b").await;
    let restarted = controller.snapshot();
    assert_eq!(restarted.session_key, "b");
    assert_eq!(restarted.status, SessionStatus::Connecting);
    assert!(!restarted.collecting.is_collecting);

    // The first loop is gone; its channel no longer feeds the session
    let _ = senders[0].send(ok(&data(r#"{"type":"end"}"#)));
    senders[1].send(ok(&block_text("new", &["fresh"]))).unwrap();
    let session = wait_until(&mut rx, |s| s.completed_blocks.len() == 1).await;
    assert_eq!(session.completed_blocks[0].rule, "new");

    drop(senders);
    assert_eq!(controller.wait().await, SessionStatus::Completed);
    assert_eq!(controller.snapshot().completed_blocks.len(), 1);
}

#[tokio::test]
async fn test_teardown_returns_to_idle() {
    let (transport, senders) = ChannelTransport::new(1);
    let mut controller = SessionController::new(transport, SessionSettings::default());
    controller.start("key").await;
    senders[0].send(ok(&block_text("r", &["x"]))).unwrap();

    controller.teardown().await;
    let session = controller.snapshot();
    assert_eq!(session.status, SessionStatus::Idle);
    assert!(session.completed_blocks.is_empty());
    assert!(session.session_key.is_empty());
}
