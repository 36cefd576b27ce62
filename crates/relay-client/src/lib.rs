//! # relay-client
//!
//! The real-time connection manager: establishes, authenticates,
//! maintains, and tears down a persistent bidirectional messaging session,
//! reconciling its lifecycle with an external, independently-refreshing
//! authentication token.
//!
//! Components, leaf-first:
//!
//! - [`transport`]: the [`Transport`] seam and the production
//!   `tokio-tungstenite` implementation
//! - [`handle`]: the [`ConnectionHandle`] — one physical session at a
//!   time, connect/disconnect/send, inbound frame routing
//! - [`handshake`]: the auth exchange run before any chat traffic is
//!   trusted
//! - [`heartbeat`]: the periodic presence sender, active only while
//!   connected
//! - [`bridge`]: the [`CredentialSource`] subscription interface and the
//!   [`TokenBridge`] that hot-swaps rotated tokens into a live session
//! - [`orchestrator`]: the [`Orchestrator`] — credential-driven
//!   auto-connect with a fixed retry cooldown, plus the message feed,
//!   notification slot, and heartbeat record
//!
//! # Example
//!
//! ```no_run
//! use relay_client::{ClientConfig, ConnectionHandle, CredentialSource, Orchestrator};
//! use relay_core::Credentials;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), relay_core::ClientError> {
//! let handle = ConnectionHandle::with_ws_transport(ClientConfig::default())?;
//! let source = CredentialSource::new();
//! let orchestrator = Orchestrator::new(handle, source.subscribe());
//!
//! // Publishing credentials makes the running orchestrator connect.
//! source.set(Some(Credentials::new("u1", "token", None)));
//! orchestrator.run(CancellationToken::new()).await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod events;
pub mod handle;
pub mod handshake;
pub mod heartbeat;
pub mod orchestrator;
pub mod transport;

#[cfg(test)]
pub(crate) mod testkit;

pub use bridge::{CredentialSource, TokenBridge};
pub use config::ClientConfig;
pub use events::ClientEvent;
pub use handle::{ConnectionHandle, WeakHandle};
pub use heartbeat::HeartbeatResult;
pub use orchestrator::{Orchestrator, RetryState};
pub use transport::{Transport, WsTransport};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
