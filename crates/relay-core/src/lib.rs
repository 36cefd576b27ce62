//! # relay-core
//!
//! Foundation types for the relay connection manager.
//!
//! This crate provides the shared vocabulary the other relay crates depend on:
//!
//! - **Branded IDs**: `UserId`, `MessageId` as newtypes for type safety
//! - **Credentials**: immutable `(userId, accessToken, refreshToken)` snapshot
//! - **Connection state**: the `ConnectionState` enum owned by the handle
//! - **Messages**: the chat feed entry model with sent/received direction
//! - **Errors**: the `ClientError` hierarchy via `thiserror`

#![deny(unsafe_code)]

pub mod credentials;
pub mod errors;
pub mod ids;
pub mod message;
pub mod state;

pub use credentials::Credentials;
pub use errors::{ClientError, TransportError};
pub use ids::{MessageId, UserId};
pub use message::{Direction, Message, NotificationState};
pub use state::ConnectionState;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _id = MessageId::fresh();
        let _state = ConnectionState::Disconnected;
        let _err = ClientError::NotConnected;
    }
}
