//! Connection orchestrator — decides *when* to connect based on credential
//! availability, guards against duplicate attempts, and schedules
//! retry-after-failure with a fixed cooldown.
//!
//! Retry is an explicit state machine (`Idle`, `AwaitingConnect`,
//! `Cooldown`) with a single deadline owned by the orchestrator, so the
//! behavior is deterministically testable. Only transport failures arm the
//! cooldown; a rejected credential stays terminal until the credential
//! source publishes a new snapshot, at which point the orchestrator
//! attempts again regardless of the earlier rejection.
//!
//! The orchestrator also owns the consumer-facing session outputs: the
//! append-only message feed (with optimistic `Sent` entries), the inbox
//! notification slot (overwritten by each frame), the last-heartbeat
//! record, and the last error.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use relay_core::{
    ClientError, ConnectionState, Credentials, Direction, Message, MessageId, NotificationState,
    UserId,
};
use relay_wire::ClientFrame;

use crate::bridge::TokenBridge;
use crate::events::ClientEvent;
use crate::handle::ConnectionHandle;

/// Automatic-retry state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryState {
    /// No attempt in flight, no retry scheduled.
    Idle,
    /// An automatic connect attempt is in flight.
    AwaitingConnect,
    /// A transport failure occurred; the next automatic attempt is gated
    /// until the deadline.
    Cooldown {
        /// When another automatic attempt becomes permissible.
        until: Instant,
    },
}

/// Orchestrates one connection handle against a credential subscription.
pub struct Orchestrator {
    handle: ConnectionHandle,
    bridge: TokenBridge,
    credentials_rx: watch::Receiver<Option<Credentials>>,
    /// Last snapshot observed from the source.
    known: Mutex<Option<Credentials>>,
    feed: Mutex<Vec<Message>>,
    notification: Mutex<Option<NotificationState>>,
    last_heartbeat: Mutex<Option<DateTime<Utc>>>,
    last_error: Mutex<Option<ClientError>>,
    retry: Mutex<RetryState>,
}

impl Orchestrator {
    /// Create an orchestrator over `handle`, driven by a credential
    /// subscription (see [`CredentialSource::subscribe`]).
    ///
    /// [`CredentialSource::subscribe`]: crate::bridge::CredentialSource::subscribe
    pub fn new(
        handle: ConnectionHandle,
        credentials_rx: watch::Receiver<Option<Credentials>>,
    ) -> Self {
        let bridge = TokenBridge::new();
        bridge.attach(&handle);
        Self {
            handle,
            bridge,
            credentials_rx,
            known: Mutex::new(None),
            feed: Mutex::new(Vec::new()),
            notification: Mutex::new(None),
            last_heartbeat: Mutex::new(None),
            last_error: Mutex::new(None),
            retry: Mutex::new(RetryState::Idle),
        }
    }

    /// The underlying connection handle.
    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.handle.state()
    }

    /// Subscribe to connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.handle.watch_state()
    }

    /// Current retry state.
    pub fn retry_state(&self) -> RetryState {
        *self.retry.lock()
    }

    /// Snapshot of the message feed.
    pub fn messages(&self) -> Vec<Message> {
        self.feed.lock().clone()
    }

    /// Clear the message feed. An explicit consumer action; reconnection
    /// never clears it.
    pub fn clear_messages(&self) {
        self.feed.lock().clear();
    }

    /// Latest inbox notification, if any arrived this session context.
    pub fn notification(&self) -> Option<NotificationState> {
        self.notification.lock().clone()
    }

    /// Instant of the last outbound presence frame.
    pub fn last_heartbeat(&self) -> Option<DateTime<Utc>> {
        *self.last_heartbeat.lock()
    }

    /// Most recent connection error, cleared on promotion.
    pub fn last_error(&self) -> Option<ClientError> {
        self.last_error.lock().clone()
    }

    /// Manually connect with the source's current credentials.
    ///
    /// Bypasses any cooldown, but still resolves to the in-flight attempt's
    /// outcome when one exists and succeeds trivially when already
    /// connected.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let credentials = self
            .credentials_rx
            .borrow()
            .clone()
            .ok_or(ClientError::MissingCredentials)?;
        self.handle.connect(credentials).await
    }

    /// Tear the session down.
    ///
    /// While credentials remain published, the running orchestrator will
    /// auto-connect again; clear the credential source to stay down.
    pub fn disconnect(&self) {
        *self.retry.lock() = RetryState::Idle;
        self.handle.disconnect();
    }

    /// Send a chat message, appending a provisional `Sent` entry to the
    /// feed synchronously, before any server acknowledgment.
    pub fn send_message(
        &self,
        recipient_id: UserId,
        content: impl Into<String>,
    ) -> Result<Message, ClientError> {
        let content = content.into();
        let sender_id = self.handle.current_user().ok_or(ClientError::NotConnected)?;
        self.handle.send_chat(recipient_id.clone(), content.clone())?;

        let message = Message {
            message_id: MessageId::provisional(),
            sender_id,
            recipient_id,
            content,
            timestamp: Utc::now(),
            kind: "text".into(),
            direction: Direction::Sent,
        };
        self.feed.lock().push(message.clone());
        Ok(message)
    }

    /// Send one presence frame on demand and record the send instant.
    pub fn send_heartbeat(&self) -> Result<DateTime<Utc>, ClientError> {
        self.handle.send_frame(ClientFrame::Presence)?;
        let now = Utc::now();
        *self.last_heartbeat.lock() = Some(now);
        Ok(now)
    }

    /// Run the orchestration loop until cancelled.
    ///
    /// A single event loop selects over credential changes, client events,
    /// and the cooldown deadline, so orchestration decisions are serialized
    /// and race-free.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut credentials_rx = self.credentials_rx.clone();
        let mut events = self.handle.events();

        // Reconcile whatever the source already holds before listening.
        let initial = credentials_rx.borrow_and_update().clone();
        self.on_credentials_changed(initial).await;

        loop {
            let cooldown = self.cooldown_deadline();
            tokio::select! {
                () = cancel.cancelled() => break,
                changed = credentials_rx.changed() => {
                    if changed.is_err() {
                        debug!("credential source dropped, stopping orchestration");
                        break;
                    }
                    let next = credentials_rx.borrow_and_update().clone();
                    self.on_credentials_changed(next).await;
                }
                event = events.recv() => match event {
                    Ok(event) => self.on_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "client event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                () = tokio::time::sleep_until(cooldown.unwrap_or_else(Instant::now)),
                    if cooldown.is_some() =>
                {
                    self.on_cooldown_elapsed().await;
                }
            }
        }
    }

    fn cooldown_deadline(&self) -> Option<Instant> {
        match *self.retry.lock() {
            RetryState::Cooldown { until } => Some(until),
            RetryState::Idle | RetryState::AwaitingConnect => None,
        }
    }

    async fn on_credentials_changed(&self, next: Option<Credentials>) {
        let prev = {
            let mut known = self.known.lock();
            std::mem::replace(&mut *known, next.clone())
        };

        match (prev, next) {
            (None, None) => {}
            (Some(_), None) => {
                info!("credentials lost, disconnecting");
                *self.retry.lock() = RetryState::Idle;
                self.handle.disconnect();
            }
            (None, Some(credentials)) => {
                info!(user_id = %credentials.user_id, "credentials available, connecting");
                self.auto_connect(credentials).await;
            }
            (Some(prev), Some(next)) => {
                if prev.user_id == next.user_id && prev.same_tokens(&next) {
                    return;
                }
                if self.state().is_connected() {
                    debug!("token rotation while connected, hot-swapping");
                    self.bridge
                        .apply(next.access_token.clone(), next.refresh_token.clone());
                } else {
                    // A new token may fix a prior rejection; retry
                    // regardless of the cooldown.
                    debug!("credentials changed while not connected, reattempting");
                    *self.retry.lock() = RetryState::Idle;
                    self.auto_connect(next).await;
                }
            }
        }
    }

    async fn on_event(&self, event: ClientEvent) {
        match event {
            ClientEvent::StateChanged(ConnectionState::Connected) => {
                *self.retry.lock() = RetryState::Idle;
                *self.last_error.lock() = None;
            }
            ClientEvent::StateChanged(ConnectionState::Disconnected) => {
                // A disconnect with credentials still published is transient:
                // reconnect, once, unless something is already scheduled.
                let credentials = self.known.lock().clone();
                if let Some(credentials) = credentials {
                    if self.retry_state() == RetryState::Idle {
                        self.auto_connect(credentials).await;
                    }
                }
            }
            ClientEvent::StateChanged(_) => {}
            ClientEvent::MessageReceived(message) => {
                self.feed.lock().push(message);
            }
            ClientEvent::Notification(notification) => {
                // Overwrite, never accumulate.
                *self.notification.lock() = Some(notification);
            }
            ClientEvent::Heartbeat(at) => {
                *self.last_heartbeat.lock() = Some(at);
            }
            ClientEvent::ConnectionError(err) => {
                *self.last_error.lock() = Some(err.clone());
                let has_credentials = self.known.lock().is_some();
                let next = if has_credentials && err.is_retryable() {
                    RetryState::Cooldown {
                        until: Instant::now() + self.handle.config().connect_cooldown,
                    }
                } else {
                    // Auth rejections are terminal until credentials change.
                    RetryState::Idle
                };
                *self.retry.lock() = next;
            }
        }
    }

    async fn on_cooldown_elapsed(&self) {
        {
            let mut retry = self.retry.lock();
            if !matches!(*retry, RetryState::Cooldown { .. }) {
                return;
            }
            *retry = RetryState::Idle;
        }
        let credentials = self.known.lock().clone();
        let Some(credentials) = credentials else { return };
        if self.state().is_connected() {
            return;
        }
        debug!("cooldown elapsed, retrying connect");
        self.auto_connect(credentials).await;
    }

    /// One guarded automatic attempt. The outcome flows back through the
    /// event stream, which updates the retry state.
    async fn auto_connect(&self, credentials: Credentials) {
        {
            let mut retry = self.retry.lock();
            if *retry == RetryState::AwaitingConnect {
                return;
            }
            *retry = RetryState::AwaitingConnect;
        }
        let _ = self.handle.connect(credentials).await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
