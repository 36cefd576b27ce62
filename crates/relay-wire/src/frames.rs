//! Frame types for both directions of the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use relay_core::{Direction, Message, MessageId, UserId};

/// Frames sent client → server.
///
/// The auth frame carries the user ID and access token only — the refresh
/// token is local to the hot-swap bridge and never crosses this channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// Authenticate the freshly-opened transport.
    Auth {
        /// User being authenticated.
        user_id: UserId,
        /// Access token from the current credential snapshot.
        token: String,
    },
    /// Heartbeat liveness signal.
    Presence,
    /// Outbound chat message.
    Chat {
        /// Intended recipient.
        recipient_id: UserId,
        /// Message body.
        msg: String,
    },
}

/// Result discriminant of an `auth_ack` frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    /// Credentials accepted; the session is promoted.
    Success,
    /// Credentials refused.
    Failed,
}

/// Payload of an inbound `message` frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Server-assigned message ID.
    pub message_id: MessageId,
    /// Author of the message.
    pub sender_id: UserId,
    /// Recipient (this client's user).
    pub recipient_id: UserId,
    /// Message body.
    pub content: String,
    /// Server-side send time.
    pub timestamp: DateTime<Utc>,
    /// Message kind (e.g. `"text"`).
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<InboundMessage> for Message {
    fn from(inbound: InboundMessage) -> Self {
        Self {
            message_id: inbound.message_id,
            sender_id: inbound.sender_id,
            recipient_id: inbound.recipient_id,
            content: inbound.content,
            timestamp: inbound.timestamp,
            kind: inbound.kind,
            direction: Direction::Received,
        }
    }
}

/// Frames sent server → client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    /// Handshake acknowledgment.
    AuthAck {
        /// Accept/refuse discriminant.
        status: AckStatus,
        /// Echo of the authenticated user on success.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<UserId>,
        /// Rejection reason on failure.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Inbound chat delivery.
    Message {
        /// The delivered message.
        data: InboundMessage,
    },
    /// Inbox notification; each frame overwrites the previous count.
    Notification {
        /// Notification subtype (currently always `"inbox"`).
        sub_type: String,
        /// Undelivered item count.
        count: u32,
    },
    /// A frame kind this client version does not understand. Decoded
    /// without crashing and dropped by the router.
    #[serde(other)]
    Unknown,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
