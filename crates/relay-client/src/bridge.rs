//! Token hot-swap bridge and the credential subscription interface.
//!
//! The credential-supplying layer owns a [`CredentialSource`] and publishes
//! whole snapshots through it; the orchestrator subscribes. A rotation
//! reaching an already-open handle goes through [`TokenBridge::apply`],
//! which replaces the in-memory snapshot without closing the transport or
//! re-running the handshake — the new pair takes effect for the next
//! operation that needs it.

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use relay_core::Credentials;

use crate::handle::{ConnectionHandle, WeakHandle};

/// Subscription interface owned by the credential-supplying layer.
///
/// This core never fetches or renews tokens itself: whoever does calls
/// [`set`](Self::set) with the complete new snapshot (or `None` on
/// logout/revocation), and every subscriber observes the change.
pub struct CredentialSource {
    tx: watch::Sender<Option<Credentials>>,
}

impl CredentialSource {
    /// Create a source with no credentials yet.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Publish a new snapshot atomically. `None` means credentials were
    /// lost (logout, revocation without replacement).
    pub fn set(&self, credentials: Option<Credentials>) {
        let _ = self.tx.send_replace(credentials);
    }

    /// Current snapshot.
    pub fn get(&self) -> Option<Credentials> {
        self.tx.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Credentials>> {
        self.tx.subscribe()
    }
}

impl Default for CredentialSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies externally-issued token rotations to a live connection handle.
///
/// Created detached and registered once per handle instance via
/// [`attach`](Self::attach). [`apply`](Self::apply) is a no-op both before
/// any handle exists and after the handle has been dropped — never an
/// error.
pub struct TokenBridge {
    slot: Mutex<Option<WeakHandle>>,
}

impl TokenBridge {
    /// Create a detached bridge.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Register the handle this bridge feeds.
    pub fn attach(&self, handle: &ConnectionHandle) {
        *self.slot.lock() = Some(handle.downgrade());
    }

    /// Whether a live handle is currently attached.
    pub fn is_attached(&self) -> bool {
        self.slot
            .lock()
            .as_ref()
            .and_then(WeakHandle::upgrade)
            .is_some()
    }

    /// Hot-swap the token pair into the attached handle.
    pub fn apply(&self, access_token: impl Into<String>, refresh_token: Option<String>) {
        let handle = self.slot.lock().as_ref().and_then(WeakHandle::upgrade);
        match handle {
            Some(handle) => handle.update_credentials(access_token, refresh_token),
            None => debug!("token rotation with no live handle, ignoring"),
        }
    }
}

impl Default for TokenBridge {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use relay_core::ConnectionState;

    use crate::config::ClientConfig;
    use crate::testkit::{FakeTransport, spawn_auto_ack};

    fn creds() -> Credentials {
        Credentials::new("u1", "tok-1", Some("ref-1".into()))
    }

    #[test]
    fn source_starts_empty() {
        let source = CredentialSource::new();
        assert!(source.get().is_none());
    }

    #[test]
    fn source_publishes_snapshots() {
        let source = CredentialSource::new();
        source.set(Some(creds()));
        assert_eq!(source.get().unwrap().access_token, "tok-1");
        source.set(None);
        assert!(source.get().is_none());
    }

    #[tokio::test]
    async fn subscribers_observe_changes() {
        let source = CredentialSource::new();
        let mut rx = source.subscribe();

        source.set(Some(creds()));
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_some());

        source.set(None);
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }

    #[test]
    fn set_without_subscribers_is_fine() {
        let source = CredentialSource::new();
        source.set(Some(creds()));
        assert!(source.get().is_some());
    }

    #[tokio::test]
    async fn apply_before_attach_is_noop() {
        let bridge = TokenBridge::new();
        assert!(!bridge.is_attached());
        // Must not panic or error.
        bridge.apply("tok-2", None);
    }

    #[tokio::test]
    async fn apply_after_handle_dropped_is_noop() {
        let (transport, _accept_rx) = FakeTransport::new();
        let handle =
            crate::handle::ConnectionHandle::new(ClientConfig::default(), transport).unwrap();
        let bridge = TokenBridge::new();
        bridge.attach(&handle);
        assert!(bridge.is_attached());

        drop(handle);
        assert!(!bridge.is_attached());
        bridge.apply("tok-2", None);
    }

    #[tokio::test]
    async fn apply_hot_swaps_without_state_change() {
        let (transport, accept_rx) = FakeTransport::new();
        let _server = spawn_auto_ack(accept_rx);
        let handle = crate::handle::ConnectionHandle::new(
            ClientConfig::default(),
            Arc::clone(&transport) as Arc<dyn crate::transport::Transport>,
        )
        .unwrap();
        let bridge = TokenBridge::new();
        bridge.attach(&handle);

        handle.connect(creds()).await.unwrap();
        bridge.apply("tok-2", Some("ref-2".into()));

        assert_eq!(handle.state(), ConnectionState::Connected);
        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test]
    async fn attach_replaces_previous_registration() {
        let (transport_a, _rx_a) = FakeTransport::new();
        let (transport_b, _rx_b) = FakeTransport::new();
        let handle_a =
            crate::handle::ConnectionHandle::new(ClientConfig::default(), transport_a).unwrap();
        let handle_b =
            crate::handle::ConnectionHandle::new(ClientConfig::default(), transport_b).unwrap();

        let bridge = TokenBridge::new();
        bridge.attach(&handle_a);
        bridge.attach(&handle_b);

        drop(handle_a);
        assert!(bridge.is_attached(), "bridge should track the latest handle");
        drop(handle_b);
        assert!(!bridge.is_attached());
    }
}
