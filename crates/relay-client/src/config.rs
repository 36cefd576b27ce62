//! Client configuration.

use std::time::Duration;

use relay_core::ClientError;
use relay_settings::RelaySettings;

/// Configuration for a connection handle and its orchestrator.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Messaging server WebSocket endpoint.
    pub endpoint: String,
    /// Interval between outbound presence frames while connected.
    ///
    /// Must be safely smaller than the server's dead-client timeout,
    /// which is the server's contract and not configured here.
    pub heartbeat_interval: Duration,
    /// Fixed delay before another automatic connect attempt after a
    /// transport failure.
    pub connect_cooldown: Duration,
    /// Bound on the wait for the server's auth acknowledgment.
    pub handshake_timeout: Duration,
    /// Capacity of the client event broadcast channel.
    pub event_capacity: usize,
    /// Capacity of the outbound frame queue.
    pub send_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:8001/ws".into(),
            heartbeat_interval: Duration::from_secs(5),
            connect_cooldown: Duration::from_secs(2),
            handshake_timeout: Duration::from_secs(10),
            event_capacity: 256,
            send_capacity: 64,
        }
    }
}

impl ClientConfig {
    /// Build a config from loaded settings.
    #[must_use]
    pub fn from_settings(settings: &RelaySettings) -> Self {
        let conn = &settings.connection;
        Self {
            endpoint: conn.endpoint.clone(),
            heartbeat_interval: Duration::from_secs(conn.heartbeat_interval_secs),
            connect_cooldown: Duration::from_secs(conn.connect_cooldown_secs),
            handshake_timeout: Duration::from_secs(conn.handshake_timeout_secs),
            ..Self::default()
        }
    }

    /// Reject empty endpoints and zero durations before any use.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.endpoint.trim().is_empty() {
            return Err(ClientError::InvalidConfig("endpoint must not be empty".into()));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(ClientError::InvalidConfig(
                "heartbeat interval must be positive".into(),
            ));
        }
        if self.connect_cooldown.is_zero() {
            return Err(ClientError::InvalidConfig(
                "connect cooldown must be positive".into(),
            ));
        }
        if self.handshake_timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "handshake timeout must be positive".into(),
            ));
        }
        if self.event_capacity == 0 || self.send_capacity == 0 {
            return Err(ClientError::InvalidConfig(
                "channel capacities must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn default_heartbeat_interval() {
        assert_eq!(
            ClientConfig::default().heartbeat_interval,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn default_cooldown() {
        assert_eq!(
            ClientConfig::default().connect_cooldown,
            Duration::from_secs(2)
        );
    }

    #[test]
    fn empty_endpoint_rejected() {
        let config = ClientConfig {
            endpoint: "   ".into(),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_heartbeat_rejected() {
        let config = ClientConfig {
            heartbeat_interval: Duration::ZERO,
            ..ClientConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("heartbeat"));
    }

    #[test]
    fn zero_cooldown_rejected() {
        let config = ClientConfig {
            connect_cooldown: Duration::ZERO,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_handshake_timeout_rejected() {
        let config = ClientConfig {
            handshake_timeout: Duration::ZERO,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_capacity_rejected() {
        let config = ClientConfig {
            send_capacity: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_settings_maps_durations() {
        let mut settings = RelaySettings::default();
        settings.connection.endpoint = "wss://chat.example.com/ws".into();
        settings.connection.heartbeat_interval_secs = 7;
        settings.connection.connect_cooldown_secs = 3;
        settings.connection.handshake_timeout_secs = 20;

        let config = ClientConfig::from_settings(&settings);
        assert_eq!(config.endpoint, "wss://chat.example.com/ws");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(7));
        assert_eq!(config.connect_cooldown, Duration::from_secs(3));
        assert_eq!(config.handshake_timeout, Duration::from_secs(20));
    }
}
