//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and implement
//! [`Default`] with production default values. `#[serde(default)]` allows
//! partial JSON — missing fields get their default during deserialization.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the relay connection manager.
///
/// Loaded from `~/.relay/settings.json` with defaults applied for missing
/// fields; `RELAY_*` environment variables override specific values.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// Settings schema version.
    pub version: String,
    /// Connection manager settings.
    pub connection: ConnectionSettings,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            connection: ConnectionSettings::default(),
        }
    }
}

impl RelaySettings {
    /// Validate every externally-supplied value before use.
    pub fn validate(&self) -> Result<()> {
        self.connection.validate()
    }
}

/// Connection manager settings.
///
/// The heartbeat interval must stay safely below the server's dead-client
/// timeout; that timeout is the server's contract and is not configured
/// here.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionSettings {
    /// Messaging server WebSocket endpoint.
    pub endpoint: String,
    /// Seconds between outbound presence frames while connected.
    pub heartbeat_interval_secs: u64,
    /// Fixed delay before another automatic connect attempt after a
    /// transport failure.
    pub connect_cooldown_secs: u64,
    /// Bound on the wait for the server's auth acknowledgment.
    pub handshake_timeout_secs: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:8001/ws".to_string(),
            heartbeat_interval_secs: 5,
            connect_cooldown_secs: 2,
            handshake_timeout_secs: 10,
        }
    }
}

impl ConnectionSettings {
    /// Reject empty endpoints and zero durations.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "endpoint must not be empty".into(),
            ));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "heartbeat interval must be positive".into(),
            ));
        }
        if self.connect_cooldown_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "connect cooldown must be positive".into(),
            ));
        }
        if self.handshake_timeout_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "handshake timeout must be positive".into(),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
