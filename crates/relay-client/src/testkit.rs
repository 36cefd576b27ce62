//! Channel-backed transport fakes shared by the unit tests.
//!
//! [`pipe`] builds one sink/stream pair plus the matching [`ServerEnd`];
//! [`FakeTransport`] counts `open` calls and hands each accepted session's
//! server end to the test through an unbounded queue.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use relay_core::TransportError;
use relay_wire::{AckStatus, ClientFrame, ServerFrame};

use crate::transport::{BoxedSink, BoxedStream, FrameSink, FrameStream, Transport};

/// Server-side end of a fake transport pair.
pub(crate) struct ServerEnd {
    to_client: Mutex<Option<mpsc::UnboundedSender<Result<ServerFrame, TransportError>>>>,
    from_client: tokio::sync::Mutex<mpsc::UnboundedReceiver<ClientFrame>>,
}

impl ServerEnd {
    /// Deliver a frame (or a stream error) to the client.
    pub(crate) fn push(&self, frame: Result<ServerFrame, TransportError>) {
        if let Some(tx) = self.to_client.lock().as_ref() {
            let _ = tx.send(frame);
        }
    }

    /// Reply to a successful handshake.
    pub(crate) fn push_auth_success(&self) {
        self.push(Ok(ServerFrame::AuthAck {
            status: AckStatus::Success,
            user_id: None,
            error: None,
        }));
    }

    /// Close the server→client direction, as an abrupt peer close.
    pub(crate) fn close(&self) {
        *self.to_client.lock() = None;
    }

    /// Await the next frame the client sent.
    pub(crate) async fn recv(&self) -> Option<ClientFrame> {
        self.from_client.lock().await.recv().await
    }

    /// Drain every frame the client has sent so far.
    pub(crate) fn drain(&self) -> Vec<ClientFrame> {
        let mut frames = Vec::new();
        let mut rx = self
            .from_client
            .try_lock()
            .expect("server end receiver busy");
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

/// Await the next client frame, panicking if the client hung up.
pub(crate) async fn recv_frame(server: &ServerEnd) -> ClientFrame {
    server.recv().await.expect("client closed the transport")
}

struct FakeSink {
    tx: Option<mpsc::UnboundedSender<ClientFrame>>,
}

#[async_trait]
impl FrameSink for FakeSink {
    async fn send(&mut self, frame: ClientFrame) -> Result<(), TransportError> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(TransportError::SendFailed {
                reason: "sink closed".into(),
            });
        };
        tx.send(frame).map_err(|_| TransportError::SendFailed {
            reason: "server end dropped".into(),
        })
    }

    async fn close(&mut self) {
        self.tx = None;
    }
}

struct FakeStream {
    rx: mpsc::UnboundedReceiver<Result<ServerFrame, TransportError>>,
}

#[async_trait]
impl FrameStream for FakeStream {
    async fn next(&mut self) -> Option<Result<ServerFrame, TransportError>> {
        self.rx.recv().await
    }
}

/// Build one connected sink/stream pair and its server end.
pub(crate) fn pipe() -> (BoxedSink, BoxedStream, Arc<ServerEnd>) {
    let (client_tx, client_rx) = mpsc::unbounded_channel();
    let (server_tx, server_rx) = mpsc::unbounded_channel();
    let server = Arc::new(ServerEnd {
        to_client: Mutex::new(Some(server_tx)),
        from_client: tokio::sync::Mutex::new(client_rx),
    });
    (
        Box::new(FakeSink { tx: Some(client_tx) }),
        Box::new(FakeStream { rx: server_rx }),
        server,
    )
}

/// Transport fake that counts opens and queues accepted sessions.
pub(crate) struct FakeTransport {
    opens: AtomicUsize,
    scripted_failures: Mutex<VecDeque<TransportError>>,
    accept_tx: mpsc::UnboundedSender<Arc<ServerEnd>>,
}

impl FakeTransport {
    /// Create the transport and the queue of accepted server ends.
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Arc<ServerEnd>>) {
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                opens: AtomicUsize::new(0),
                scripted_failures: Mutex::new(VecDeque::new()),
                accept_tx,
            }),
            accept_rx,
        )
    }

    /// Number of transports opened so far.
    pub(crate) fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Make the next `open` call fail with `err`.
    pub(crate) fn fail_next_open(&self, err: TransportError) {
        self.scripted_failures.lock().push_back(err);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn open(&self, _endpoint: &str) -> Result<(BoxedSink, BoxedStream), TransportError> {
        let _ = self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.scripted_failures.lock().pop_front() {
            return Err(err);
        }
        let (sink, stream, server) = pipe();
        let _ = self.accept_tx.send(server);
        Ok((sink, stream))
    }
}

/// Background server that acknowledges every handshake and keeps each
/// accepted session alive for the test to drive.
pub(crate) struct AutoAckServer {
    pub(crate) sessions: Arc<Mutex<Vec<Arc<ServerEnd>>>>,
    _task: JoinHandle<()>,
}

impl AutoAckServer {
    /// The `index`-th accepted session, if it exists yet.
    pub(crate) fn session(&self, index: usize) -> Option<Arc<ServerEnd>> {
        self.sessions.lock().get(index).cloned()
    }

    /// Wait until at least `count` sessions have been accepted.
    pub(crate) async fn wait_for_sessions(&self, count: usize) {
        while self.sessions.lock().len() < count {
            tokio::task::yield_now().await;
        }
    }
}

/// Spawn a server that answers every auth frame with a success ack.
pub(crate) fn spawn_auto_ack(
    mut accept_rx: mpsc::UnboundedReceiver<Arc<ServerEnd>>,
) -> AutoAckServer {
    let sessions = Arc::new(Mutex::new(Vec::new()));
    let sessions2 = sessions.clone();
    let task = tokio::spawn(async move {
        while let Some(server) = accept_rx.recv().await {
            if let Some(ClientFrame::Auth { .. }) = server.recv().await {
                server.push_auth_success();
            }
            sessions2.lock().push(server);
        }
    });
    AutoAckServer {
        sessions,
        _task: task,
    }
}
