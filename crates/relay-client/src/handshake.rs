//! Auth handshake — authenticate the freshly-opened transport before any
//! chat traffic is trusted.
//!
//! Two outcomes are reachable from `connecting`: the acknowledgment
//! promotes the session, or the refusal surfaces as `AuthRejected`,
//! distinct from any network failure. The wait for the acknowledgment is
//! bounded; an unresponsive-but-open transport becomes a
//! `HandshakeTimeout` transport error instead of hanging forever.

use std::time::Duration;

use tracing::debug;

use relay_core::{ClientError, Credentials, TransportError};
use relay_wire::{AckStatus, ClientFrame, ServerFrame};

use crate::transport::{FrameSink, FrameStream};

/// Run the handshake on a freshly-opened transport.
///
/// Sends the auth frame (user ID and access token only — the refresh token
/// never crosses this channel) and waits for the server's `auth_ack` up to
/// `timeout`. Frames arriving before the acknowledgment are decoded and
/// dropped.
pub async fn run(
    sink: &mut dyn FrameSink,
    stream: &mut dyn FrameStream,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<(), ClientError> {
    sink.send(ClientFrame::Auth {
        user_id: credentials.user_id.clone(),
        token: credentials.access_token.clone(),
    })
    .await?;

    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    tokio::time::timeout(timeout, await_ack(stream))
        .await
        .map_err(|_| TransportError::HandshakeTimeout { timeout_ms })?
}

/// Wait for the acknowledgment, dropping anything else.
async fn await_ack(stream: &mut dyn FrameStream) -> Result<(), ClientError> {
    loop {
        match stream.next().await {
            None => {
                return Err(TransportError::ConnectionClosed {
                    reason: "closed before auth acknowledgment".into(),
                }
                .into());
            }
            Some(Err(e)) => return Err(e.into()),
            Some(Ok(ServerFrame::AuthAck { status, user_id, error })) => match status {
                AckStatus::Success => {
                    debug!(user_id = ?user_id, "auth acknowledged");
                    return Ok(());
                }
                AckStatus::Failed => {
                    return Err(ClientError::AuthRejected {
                        reason: error.unwrap_or_else(|| "credentials refused".into()),
                    });
                }
            },
            Some(Ok(ServerFrame::Message { data })) => {
                debug!(message_id = %data.message_id, "chat frame before auth acknowledgment, dropping");
            }
            Some(Ok(ServerFrame::Notification { .. })) => {
                debug!("notification before auth acknowledgment, dropping");
            }
            Some(Ok(ServerFrame::Unknown)) => {
                debug!("unknown frame before auth acknowledgment, dropping");
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
