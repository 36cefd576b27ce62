//! # relay-wire
//!
//! The wire protocol between the relay client and the messaging server:
//! one JSON object per frame, discriminated by a `type` field.
//!
//! Outbound frames are [`ClientFrame`] (`auth`, `presence`, `chat`);
//! inbound frames are [`ServerFrame`] (`auth_ack`, `message`,
//! `notification`). Classification is total: every inbound frame decodes
//! to exactly one variant, with unrecognized `type` values tolerated as
//! [`ServerFrame::Unknown`] rather than treated as protocol violations.

#![deny(unsafe_code)]

pub mod codec;
pub mod frames;

pub use codec::{decode, encode};
pub use frames::{AckStatus, ClientFrame, InboundMessage, ServerFrame};
