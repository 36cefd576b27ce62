//! Connection lifecycle state.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a connection handle.
///
/// Exactly one value is current at any instant. The value is owned by the
/// connection handle and only observed by the orchestrator and consumers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No transport exists.
    #[default]
    Disconnected,
    /// Transport is opening or the auth handshake is pending.
    Connecting,
    /// Handshake completed successfully on the current transport.
    Connected,
    /// The last attempt or session failed; see the reported error.
    Error,
}

impl ConnectionState {
    /// Whether chat traffic may be sent in this state.
    #[must_use]
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }

    /// Whether a connect attempt is currently in flight.
    #[must_use]
    pub fn is_connecting(self) -> bool {
        self == Self::Connecting
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error => write!(f, "error"),
        }
    }
}
