//! Events emitted by a connection handle to its consumers.

use chrono::{DateTime, Utc};

use relay_core::{ClientError, ConnectionState, Message, NotificationState};

/// One event on the handle's broadcast stream.
///
/// Every inbound frame and every lifecycle transition maps to exactly one
/// event; consumers that only care about state can watch the state channel
/// instead.
#[derive(Clone, Debug)]
pub enum ClientEvent {
    /// The connection state changed.
    StateChanged(ConnectionState),
    /// An inbound chat message was delivered over the live session.
    MessageReceived(Message),
    /// An inbox notification arrived; the count overwrites any previous one.
    Notification(NotificationState),
    /// A presence frame was sent; carries the send instant.
    Heartbeat(DateTime<Utc>),
    /// A connect attempt or live session failed.
    ConnectionError(ClientError),
}
