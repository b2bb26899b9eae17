//! Session controller
//!
//! Owns one end-to-end streaming attempt: opens the transport, runs the
//! read loop, and publishes snapshots to observers.
//!
//! The read loop is the only writer of the published session. Every write
//! goes through an epoch check under the watch channel's lock, so once
//! `cancel()` (or a new `start()`) bumps the epoch, a superseded loop can no
//! longer change anything observers see.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::cancellation::SessionCancellation;
use super::state::{ReviewSession, SessionStatus, StreamAnomaly};
use crate::assembler::{BlockAssembler, OverlapPolicy};
use crate::error::TransportError;
use crate::sse::{Frame, FrameDecoder};
use crate::transport::ReviewTransport;

/// Per-session behaviour knobs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSettings {
    pub overlap_policy: OverlapPolicy,
}

/// Drives streaming sessions against one transport
pub struct SessionController {
    transport: Arc<dyn ReviewTransport>,
    settings: SessionSettings,
    state: Arc<watch::Sender<ReviewSession>>,
    cancellation: SessionCancellation,
    task: Option<JoinHandle<()>>,
}

impl SessionController {
    pub fn new(transport: Arc<dyn ReviewTransport>, settings: SessionSettings) -> Self {
        let (state, _) = watch::channel(ReviewSession::default());
        Self {
            transport,
            settings,
            state: Arc::new(state),
            cancellation: SessionCancellation::new(),
            task: None,
        }
    }

    /// Receive a notification after every published change
    pub fn subscribe(&self) -> watch::Receiver<ReviewSession> {
        self.state.subscribe()
    }

    /// Copy of the current session
    pub fn snapshot(&self) -> ReviewSession {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    /// Start streaming for `session_key`
    ///
    /// Any previous attempt is cancelled and its read loop awaited before
    /// the session is reset, so two loops never write the same session.
    pub async fn start(&mut self, session_key: &str) {
        self.quiesce().await;
        self.cancellation.reset();

        let mut epoch = 0;
        self.state.send_modify(|session| {
            epoch = session.epoch + 1;
            *session = ReviewSession::connecting(session_key, epoch);
        });
        let session_id = self.state.borrow().session_id;
        info!(session = %session_id, key = %session_key, "Session connecting");

        let read_loop = ReadLoop {
            transport: Arc::clone(&self.transport),
            session_key: session_key.to_string(),
            token: self.cancellation.token(),
            publisher: SessionPublisher {
                state: Arc::clone(&self.state),
                epoch,
            },
            decoder: FrameDecoder::new(),
            assembler: BlockAssembler::new(self.settings.overlap_policy),
        };
        self.task = Some(tokio::spawn(read_loop.run()));
    }

    /// Abort the in-flight read
    ///
    /// Completed blocks are kept. After this returns no further change from
    /// the aborted loop becomes visible.
    pub fn cancel(&self) {
        self.cancellation.cancel();
        self.state.send_if_modified(|session| {
            session.epoch += 1;
            if session.status.is_active() {
                info!(session = %session.session_id, "Session cancelled");
                session.collecting.clear();
                session.finish(SessionStatus::Cancelled);
                true
            } else {
                false
            }
        });
    }

    /// Cancel and reset to an idle, empty session
    pub async fn teardown(&mut self) {
        self.quiesce().await;
        self.state.send_modify(|session| {
            *session = ReviewSession {
                epoch: session.epoch + 1,
                ..Default::default()
            };
        });
        debug!("Session torn down");
    }

    /// Wait for the current read loop to end and return the final status
    pub async fn wait(&mut self) -> SessionStatus {
        if let Some(task) = self.task.take() {
            join_read_loop(task).await;
        }
        self.status()
    }

    async fn quiesce(&mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            join_read_loop(task).await;
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

async fn join_read_loop(task: JoinHandle<()>) {
    if let Err(e) = task.await {
        if e.is_panic() {
            error!("Session read loop panicked: {}", e);
        }
    }
}

/// Epoch-checked write access to the published session
struct SessionPublisher {
    state: Arc<watch::Sender<ReviewSession>>,
    epoch: u64,
}

impl SessionPublisher {
    /// Apply `f` if this loop still owns the session; false once superseded
    fn update(&self, f: impl FnOnce(&mut ReviewSession)) -> bool {
        self.state.send_if_modified(|session| {
            if session.epoch != self.epoch {
                return false;
            }
            f(session);
            true
        })
    }
}

/// Single owner of the decoder and assembler for one session
struct ReadLoop {
    transport: Arc<dyn ReviewTransport>,
    session_key: String,
    token: CancellationToken,
    publisher: SessionPublisher,
    decoder: FrameDecoder,
    assembler: BlockAssembler,
}

impl ReadLoop {
    async fn run(mut self) {
        let opened = tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                debug!("Session cancelled before the stream opened");
                return;
            }
            result = self.transport.open(&self.session_key) => result,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    debug!("Read loop stopped by cancellation");
                    return;
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    let frames = self.decoder.push(&chunk);
                    if !self.apply_frames(frames, chunk.len()) {
                        return;
                    }
                }
                Some(Err(e)) => {
                    self.fail(e);
                    return;
                }
                None => {
                    let frames = self.decoder.finish();
                    if !self.apply_frames(frames, 0) {
                        return;
                    }
                    self.complete();
                    return;
                }
            }
        }
    }

    /// Apply decoded frames in order. Returns false once the loop lost ownership.
    fn apply_frames(&mut self, frames: Vec<Frame>, bytes: usize) -> bool {
        let owned = self.publisher.update(|session| {
            session.bytes_received += bytes;
            if session.status == SessionStatus::Connecting {
                info!(session = %session.session_id, "Session streaming");
                session.status = SessionStatus::Streaming;
            }
        });
        if !owned {
            return false;
        }

        for frame in frames {
            if self.token.is_cancelled() {
                return false;
            }

            let owned = match frame {
                Frame::Event(event) => {
                    let transition = self.assembler.apply(event);
                    let collecting = self.assembler.collecting();
                    self.publisher.update(|session| {
                        session.events_received += 1;
                        if let Some(block) = transition.completed {
                            session.completed_blocks.push(block);
                        }
                        if let Some(anomaly) = transition.anomaly {
                            session.record_anomaly(anomaly.into());
                        }
                        if transition.partial_changed {
                            session.collecting.clone_from(collecting);
                        }
                    })
                }
                Frame::Malformed(err) => self
                    .publisher
                    .update(|session| session.record_anomaly(err.into())),
                Frame::Unrecognized(line) => self.publisher.update(|session| {
                    session.record_anomaly(StreamAnomaly::UnrecognizedLine { line })
                }),
                Frame::Field { .. } => true,
            };

            if !owned {
                return false;
            }
        }

        true
    }

    fn complete(&self) {
        if self.assembler.is_collecting() {
            warn!(
                rule = %self.assembler.collecting().rule,
                "Stream ended inside a block; unterminated block dropped"
            );
        }
        self.publisher.update(|session| {
            session.collecting.clear();
            session.finish(SessionStatus::Completed);
            info!(
                session = %session.session_id,
                "Session completed: {} blocks, {} events, {} anomalies",
                session.completed_blocks.len(),
                session.events_received,
                session.anomaly_count
            );
        });
    }

    fn fail(&self, err: TransportError) {
        error!("Review stream failed: {}", err);
        self.publisher.update(|session| {
            session.collecting.clear();
            session.error = Some(err.to_string());
            session.finish(SessionStatus::Errored);
        });
    }
}
