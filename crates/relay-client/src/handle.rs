//! Connection handle — owns at most one physical transport session,
//! the state machine around it, and the credential snapshot.
//!
//! The handle is clone-cheap and safe to share across tasks. State
//! transitions and the credential snapshot sit behind locks; connect
//! sequences are serialized through a shared-outcome registry so
//! overlapping `connect()` calls observe the single in-flight attempt
//! instead of opening a second transport. `disconnect()` bumps an attempt
//! epoch, which discards the eventual result of any superseded attempt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use relay_core::{
    ClientError, ConnectionState, Credentials, NotificationState, TransportError, UserId,
};
use relay_wire::{ClientFrame, ServerFrame};

use crate::config::ClientConfig;
use crate::events::ClientEvent;
use crate::handshake;
use crate::heartbeat::run_heartbeat;
use crate::transport::{BoxedSink, BoxedStream, Transport, WsTransport};

/// Outcome channel shared by every caller that joins one connect attempt.
type AttemptRx = watch::Receiver<Option<Result<(), ClientError>>>;

/// Role a `connect` caller ends up with after consulting the registry.
enum ConnectRole {
    /// Already connected; nothing to do.
    AlreadyConnected,
    /// An attempt is in flight; await its outcome.
    Join(AttemptRx),
    /// This caller drives a new attempt.
    Drive(watch::Sender<Option<Result<(), ClientError>>>),
}

/// Plumbing of one live session.
struct Session {
    id: u64,
    out_tx: mpsc::Sender<ClientFrame>,
    cancel: CancellationToken,
}

struct HandleInner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    state_tx: watch::Sender<ConnectionState>,
    events_tx: broadcast::Sender<ClientEvent>,
    credentials: Mutex<Option<Credentials>>,
    session: Mutex<Option<Session>>,
    attempt: Mutex<Option<AttemptRx>>,
    /// Bumped by every disconnect; an attempt only installs its session if
    /// the epoch is unchanged since the attempt began.
    epoch: AtomicU64,
    session_seq: AtomicU64,
}

impl HandleInner {
    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = self.state_tx.send_replace(next);
        if prev != next {
            debug!(%prev, %next, "connection state changed");
            self.emit(ClientEvent::StateChanged(next));
        }
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Tear down session `id` after a transport failure, unless a newer
    /// session or a disconnect already superseded it.
    fn fail_session(&self, id: u64, err: ClientError) {
        {
            let mut session = self.session.lock();
            match session.as_ref() {
                Some(current) if current.id == id => {
                    current.cancel.cancel();
                    *session = None;
                }
                _ => return,
            }
        }
        warn!(error = %err, "session failed");
        self.set_state(ConnectionState::Error);
        self.emit(ClientEvent::ConnectionError(err));
    }
}

/// Handle to the single logical session against the messaging server.
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<HandleInner>,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ConnectionHandle {
    /// Create a handle over an explicit transport (tests substitute an
    /// instrumented one here).
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self, ClientError> {
        config.validate()?;
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (events_tx, _) = broadcast::channel(config.event_capacity);
        Ok(Self {
            inner: Arc::new(HandleInner {
                config,
                transport,
                state_tx,
                events_tx,
                credentials: Mutex::new(None),
                session: Mutex::new(None),
                attempt: Mutex::new(None),
                epoch: AtomicU64::new(0),
                session_seq: AtomicU64::new(0),
            }),
        })
    }

    /// Create a handle over the production WebSocket transport.
    pub fn with_ws_transport(config: ClientConfig) -> Result<Self, ClientError> {
        Self::new(config, Arc::new(WsTransport))
    }

    /// The handle's configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    /// Subscribe to state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Subscribe to the event stream.
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Whether a credential snapshot is currently held.
    pub fn has_credentials(&self) -> bool {
        self.inner.credentials.lock().is_some()
    }

    /// User of the current credential snapshot.
    pub fn current_user(&self) -> Option<UserId> {
        self.inner
            .credentials
            .lock()
            .as_ref()
            .map(|c| c.user_id.clone())
    }

    /// Create a weak reference for registration objects that must not keep
    /// the handle alive.
    pub fn downgrade(&self) -> WeakHandle {
        WeakHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Connect with a fresh credential snapshot.
    ///
    /// Idempotent by state: when already connected this resolves
    /// immediately, and while an attempt is in flight every caller awaits
    /// that attempt's outcome — at most one transport is opened.
    pub async fn connect(&self, credentials: Credentials) -> Result<(), ClientError> {
        *self.inner.credentials.lock() = Some(credentials);
        self.connect_with_snapshot().await
    }

    /// Connect using the stored credential snapshot (hot-swapped tokens
    /// take effect here).
    pub async fn reconnect(&self) -> Result<(), ClientError> {
        if !self.has_credentials() {
            return Err(ClientError::MissingCredentials);
        }
        self.connect_with_snapshot().await
    }

    /// Replace the credential snapshot in place.
    ///
    /// Does not touch the transport and does not re-run the handshake: the
    /// session that already authenticated stays promoted, and the new pair
    /// takes effect for the next operation that needs credentials. A no-op
    /// when no snapshot exists yet (there is no user identity to rotate).
    pub fn update_credentials(
        &self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
    ) {
        let mut credentials = self.inner.credentials.lock();
        match credentials.as_ref() {
            Some(current) => {
                *credentials = Some(current.rotated(access_token, refresh_token));
                debug!("credentials hot-swapped in place");
            }
            None => debug!("credential update before any connect, ignoring"),
        }
    }

    /// Tear down the session, if any.
    ///
    /// Idempotent and infallible: safe from any state, stops future
    /// heartbeat ticks synchronously, and discards the eventual result of
    /// any in-flight connect attempt.
    pub fn disconnect(&self) {
        let _ = self.inner.epoch.fetch_add(1, Ordering::AcqRel);
        let prev = self.inner.session.lock().take();
        if let Some(session) = prev {
            session.cancel.cancel();
            info!("disconnected");
        }
        self.inner.set_state(ConnectionState::Disconnected);
    }

    /// Queue a frame on the live session.
    ///
    /// Fails fast with [`ClientError::NotConnected`] outside the
    /// `Connected` state — nothing is queued or silently dropped.
    pub fn send_frame(&self, frame: ClientFrame) -> Result<(), ClientError> {
        if !self.state().is_connected() {
            return Err(ClientError::NotConnected);
        }
        let session = self.inner.session.lock();
        let Some(session) = session.as_ref() else {
            return Err(ClientError::NotConnected);
        };
        session.out_tx.try_send(frame).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => ClientError::Transport(
                TransportError::SendFailed {
                    reason: "outbound queue full".into(),
                },
            ),
            mpsc::error::TrySendError::Closed(_) => ClientError::NotConnected,
        })
    }

    /// Send a chat message to `recipient_id`.
    pub fn send_chat(
        &self,
        recipient_id: UserId,
        content: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.send_frame(ClientFrame::Chat {
            recipient_id,
            msg: content.into(),
        })
    }

    // ─── Connect sequence ────────────────────────────────────────────────

    async fn connect_with_snapshot(&self) -> Result<(), ClientError> {
        let role = {
            let mut attempt = self.inner.attempt.lock();
            if let Some(rx) = attempt.as_ref().filter(|rx| rx.borrow().is_none()) {
                ConnectRole::Join(rx.clone())
            } else if self.inner.state().is_connected() {
                ConnectRole::AlreadyConnected
            } else {
                let (tx, rx) = watch::channel(None);
                *attempt = Some(rx);
                ConnectRole::Drive(tx)
            }
        };

        match role {
            ConnectRole::AlreadyConnected => Ok(()),
            ConnectRole::Join(rx) => await_outcome(rx).await,
            ConnectRole::Drive(outcome_tx) => {
                let outcome = self.drive_connect().await;
                let _ = outcome_tx.send(Some(outcome.clone()));
                *self.inner.attempt.lock() = None;
                outcome
            }
        }
    }

    async fn drive_connect(&self) -> Result<(), ClientError> {
        let Some(credentials) = self.inner.credentials.lock().clone() else {
            return Err(ClientError::MissingCredentials);
        };
        let epoch = self.inner.epoch.load(Ordering::Acquire);
        self.inner.set_state(ConnectionState::Connecting);
        info!(
            user_id = %credentials.user_id,
            endpoint = %self.inner.config.endpoint,
            "connecting"
        );

        match self.open_and_handshake(&credentials).await {
            Ok((sink, stream)) => match self.install_session(sink, stream, epoch) {
                Ok(()) => {
                    info!("connected");
                    Ok(())
                }
                Err((mut sink, _stream)) => {
                    debug!("connect attempt superseded by disconnect, discarding result");
                    sink.close().await;
                    Err(TransportError::ConnectionClosed {
                        reason: "connect attempt superseded by disconnect".into(),
                    }
                    .into())
                }
            },
            Err(err) => {
                if self.inner.epoch.load(Ordering::Acquire) == epoch {
                    warn!(error = %err, "connect failed");
                    self.inner.set_state(ConnectionState::Error);
                    self.inner.emit(ClientEvent::ConnectionError(err.clone()));
                }
                Err(err)
            }
        }
    }

    async fn open_and_handshake(
        &self,
        credentials: &Credentials,
    ) -> Result<(BoxedSink, BoxedStream), ClientError> {
        let (mut sink, mut stream) = self
            .inner
            .transport
            .open(&self.inner.config.endpoint)
            .await?;
        match handshake::run(
            sink.as_mut(),
            stream.as_mut(),
            credentials,
            self.inner.config.handshake_timeout,
        )
        .await
        {
            Ok(()) => Ok((sink, stream)),
            Err(err) => {
                sink.close().await;
                Err(err)
            }
        }
    }

    /// Install the authenticated transport as the live session, start its
    /// I/O and heartbeat tasks, and promote the state — all under the
    /// session lock, so a racing `disconnect()` observes either no session
    /// or the fully-promoted one. Hands the transport back if a disconnect
    /// superseded the attempt.
    fn install_session(
        &self,
        sink: BoxedSink,
        stream: BoxedStream,
        epoch: u64,
    ) -> Result<(), (BoxedSink, BoxedStream)> {
        let id = self.inner.session_seq.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let (out_tx, out_rx) = mpsc::channel(self.inner.config.send_capacity);

        let mut session = self.inner.session.lock();
        if self.inner.epoch.load(Ordering::Acquire) != epoch {
            return Err((sink, stream));
        }

        let _ = tokio::spawn(io_loop(
            Arc::downgrade(&self.inner),
            id,
            sink,
            stream,
            out_rx,
            cancel.clone(),
        ));
        let heartbeat_out = out_tx.clone();
        let heartbeat_events = self.inner.events_tx.clone();
        let heartbeat_cancel = cancel.clone();
        let interval = self.inner.config.heartbeat_interval;
        let _ = tokio::spawn(async move {
            let _ = run_heartbeat(interval, heartbeat_out, heartbeat_events, heartbeat_cancel)
                .await;
        });

        *session = Some(Session { id, out_tx, cancel });
        self.inner.set_state(ConnectionState::Connected);
        Ok(())
    }
}

/// Weak reference to a connection handle.
///
/// Used by registration objects (the token hot-swap bridge) that must
/// become no-ops once the handle is torn down instead of keeping it alive.
#[derive(Clone)]
pub struct WeakHandle {
    inner: Weak<HandleInner>,
}

impl WeakHandle {
    /// Upgrade back to a live handle, if one still exists.
    pub fn upgrade(&self) -> Option<ConnectionHandle> {
        self.inner.upgrade().map(|inner| ConnectionHandle { inner })
    }
}

async fn await_outcome(mut rx: AttemptRx) -> Result<(), ClientError> {
    loop {
        if let Some(outcome) = rx.borrow_and_update().clone() {
            return outcome;
        }
        if rx.changed().await.is_err() {
            return Err(TransportError::ConnectionClosed {
                reason: "connect attempt abandoned".into(),
            }
            .into());
        }
    }
}

/// Reason the I/O loop ended.
enum Teardown {
    Cancelled,
    Failed(ClientError),
}

/// Single I/O task per session: forwards queued outbound frames, routes
/// every inbound frame to exactly one handler, and tears the session down
/// on transport failure. Holds only a weak reference so an abandoned
/// handle unwinds instead of leaking the connection.
async fn io_loop(
    inner: Weak<HandleInner>,
    session_id: u64,
    mut sink: BoxedSink,
    mut stream: BoxedStream,
    mut out_rx: mpsc::Receiver<ClientFrame>,
    cancel: CancellationToken,
) {
    let teardown = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break Teardown::Cancelled,
            outbound = out_rx.recv() => match outbound {
                Some(frame) => {
                    if let Err(err) = sink.send(frame).await {
                        break Teardown::Failed(err.into());
                    }
                }
                None => break Teardown::Cancelled,
            },
            inbound = stream.next() => match inbound {
                None => break Teardown::Failed(
                    TransportError::ConnectionClosed {
                        reason: "server closed the connection".into(),
                    }
                    .into(),
                ),
                Some(Err(err)) => break Teardown::Failed(err.into()),
                Some(Ok(frame)) => {
                    let Some(inner) = inner.upgrade() else {
                        break Teardown::Cancelled;
                    };
                    route_frame(&inner, frame);
                }
            },
        }
    };

    sink.close().await;
    if let Teardown::Failed(err) = teardown {
        if let Some(inner) = inner.upgrade() {
            inner.fail_session(session_id, err);
        }
    }
}

/// Dispatch one inbound frame to exactly one handler.
fn route_frame(inner: &HandleInner, frame: ServerFrame) {
    match frame {
        ServerFrame::Message { data } => {
            debug!(message_id = %data.message_id, "chat delivery");
            inner.emit(ClientEvent::MessageReceived(data.into()));
        }
        ServerFrame::Notification { sub_type, count } => {
            debug!(sub_type, count, "inbox notification");
            inner.emit(ClientEvent::Notification(NotificationState { sub_type, count }));
        }
        ServerFrame::AuthAck { .. } => {
            debug!("auth acknowledgment outside handshake, ignoring");
        }
        ServerFrame::Unknown => {
            debug!("unknown frame kind, ignoring");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
