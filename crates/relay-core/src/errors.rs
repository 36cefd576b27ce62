//! Error hierarchy for the relay connection manager.
//!
//! The taxonomy distinguishes the failure kinds the orchestrator treats
//! differently:
//!
//! - [`TransportError`]: network-level failures — eligible for automatic
//!   retry after the cooldown
//! - [`ClientError::AuthRejected`]: server-level credential refusal —
//!   terminal until credentials change
//! - [`ClientError::NotConnected`]: operation attempted outside the
//!   `Connected` state — reported synchronously, never queued or dropped
//!
//! All variants are `Clone` so a single connect attempt's outcome can be
//! handed to every concurrent caller that observed it in flight.

use thiserror::Error;

/// Network-level failure on the transport.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Opening the transport failed (refused, unreachable, TLS, …).
    #[error("failed to open transport to {endpoint}: {reason}")]
    ConnectFailed {
        /// Endpoint the open was attempted against.
        endpoint: String,
        /// Underlying failure description.
        reason: String,
    },

    /// The transport closed or errored after it was established.
    #[error("transport closed: {reason}")]
    ConnectionClosed {
        /// Close reason, if the peer supplied one.
        reason: String,
    },

    /// An inbound frame was not a valid frame.
    #[error("malformed frame: {detail}")]
    MalformedFrame {
        /// Parse failure description.
        detail: String,
    },

    /// The server never acknowledged the auth frame within the bound.
    #[error("no auth acknowledgment within {timeout_ms}ms")]
    HandshakeTimeout {
        /// Configured handshake timeout.
        timeout_ms: u64,
    },

    /// Writing an outbound frame failed.
    #[error("failed to send frame: {reason}")]
    SendFailed {
        /// Underlying failure description.
        reason: String,
    },
}

/// Top-level error type for connection-manager operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    /// Network-level failure; retry-eligible.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server refused the presented credentials.
    #[error("authentication rejected: {reason}")]
    AuthRejected {
        /// Server-supplied rejection reason.
        reason: String,
    },

    /// Operation requires the `Connected` state.
    #[error("not connected")]
    NotConnected,

    /// No credential snapshot is available to authenticate with.
    #[error("missing credentials")]
    MissingCredentials,

    /// Construction-time configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// Whether the orchestrator may retry automatically after the cooldown.
    ///
    /// Only transport failures qualify; a rejected credential stays
    /// rejected until the credential source supplies a new one.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn transport_errors_are_retryable() {
        let err = ClientError::from(TransportError::ConnectFailed {
            endpoint: "ws://localhost:8001/ws".into(),
            reason: "connection refused".into(),
        });
        assert!(err.is_retryable());

        let err = ClientError::from(TransportError::HandshakeTimeout { timeout_ms: 10_000 });
        assert!(err.is_retryable());
    }

    #[test]
    fn auth_rejected_is_terminal() {
        let err = ClientError::AuthRejected {
            reason: "token expired".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn not_connected_is_not_retryable() {
        assert!(!ClientError::NotConnected.is_retryable());
        assert!(!ClientError::MissingCredentials.is_retryable());
    }

    #[test]
    fn invalid_config_is_not_retryable() {
        assert!(!ClientError::InvalidConfig("heartbeat interval must be positive".into())
            .is_retryable());
    }

    #[test]
    fn transport_error_converts() {
        let err: ClientError = TransportError::ConnectionClosed {
            reason: "abrupt close".into(),
        }
        .into();
        assert_matches!(err, ClientError::Transport(TransportError::ConnectionClosed { .. }));
    }

    #[test]
    fn display_messages() {
        let err = ClientError::AuthRejected {
            reason: "bad token".into(),
        };
        assert_eq!(err.to_string(), "authentication rejected: bad token");

        let err = ClientError::NotConnected;
        assert_eq!(err.to_string(), "not connected");

        let err = ClientError::from(TransportError::MalformedFrame {
            detail: "expected object".into(),
        });
        assert_eq!(err.to_string(), "malformed frame: expected object");
    }

    #[test]
    fn errors_are_cloneable_and_comparable() {
        let err = ClientError::from(TransportError::HandshakeTimeout { timeout_ms: 5000 });
        let clone = err.clone();
        assert_eq!(err, clone);
    }
}
