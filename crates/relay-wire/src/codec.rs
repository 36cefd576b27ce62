//! Frame encode/decode over the text transport.

use relay_core::TransportError;

use crate::frames::{ClientFrame, ServerFrame};

/// Serialize an outbound frame to its wire text.
pub fn encode(frame: &ClientFrame) -> Result<String, TransportError> {
    serde_json::to_string(frame).map_err(|e| TransportError::SendFailed {
        reason: format!("frame serialization: {e}"),
    })
}

/// Parse an inbound wire text into a classified frame.
///
/// Text that is not a valid frame is a malformed-frame transport error;
/// a valid frame with an unrecognized `type` decodes to
/// [`ServerFrame::Unknown`] instead.
pub fn decode(text: &str) -> Result<ServerFrame, TransportError> {
    serde_json::from_str(text).map_err(|e| TransportError::MalformedFrame {
        detail: e.to_string(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
