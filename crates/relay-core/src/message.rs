//! Chat feed entries and the inbox notification slot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{MessageId, UserId};

/// Which way a message travelled relative to this client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Locally originated, appended optimistically at send time.
    Sent,
    /// Delivered by the server over the live session.
    Received,
}

/// One entry in the ordered message feed.
///
/// The feed is append-only for the lifetime of a session context. Sent
/// entries carry a provisional ID until the server assigns one; received
/// entries carry the server's ID verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique per message; provisional for locally-originated sends.
    pub message_id: MessageId,
    /// Author of the message.
    pub sender_id: UserId,
    /// Intended recipient.
    pub recipient_id: UserId,
    /// Message body.
    pub content: String,
    /// When the message was sent or received.
    pub timestamp: DateTime<Utc>,
    /// Message kind as reported by the server (e.g. `"text"`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Sent or received.
    pub direction: Direction,
}

/// Count of undelivered inbox items revealed by the server.
///
/// Each notification frame overwrites the previous value; counts are
/// never accumulated client-side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationState {
    /// Notification subtype; the server currently only emits `"inbox"`.
    pub sub_type: String,
    /// Number of undelivered items.
    pub count: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
