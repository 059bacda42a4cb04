use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::net::{DEFAULT_PORT, PacketLossSimulation};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShotConfig {
    /// Distance gained per second the fire button is held.
    pub charge_rate: f64,
    pub max_distance: f64,
    /// Seconds for a shot to expand to its full blast radius.
    pub expand_secs: f64,
    pub blast_radius: f64,
}

impl Default for ShotConfig {
    fn default() -> Self {
        Self {
            charge_rate: 150.0,
            max_distance: 300.0,
            expand_secs: 0.5,
            blast_radius: 25.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_addr: SocketAddr,
    pub player_name: String,
    pub tick_interval_ms: u64,
    pub connect_timeout_secs: u64,
    pub disconnect_timeout_ms: u64,
    pub shot: ShotConfig,
    pub packet_loss: PacketLossSimulation,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            player_name: String::from("player"),
            tick_interval_ms: 5,
            connect_timeout_secs: 10,
            disconnect_timeout_ms: 1000,
            shot: ShotConfig::default(),
            packet_loss: PacketLossSimulation::default(),
        }
    }
}

impl ClientConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn disconnect_timeout(&self) -> Duration {
        Duration::from_millis(self.disconnect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.server_addr.port(), DEFAULT_PORT);
        assert_eq!(config.disconnect_timeout(), Duration::from_secs(1));
        assert_eq!(config.tick_interval(), Duration::from_millis(5));
        assert!(!config.packet_loss.enabled);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = ClientConfig::from_toml(
            r#"
            player_name = "Alice"
            server_addr = "10.0.0.2:6000"

            [shot]
            max_distance = 120.0

            [packet_loss]
            enabled = true
            loss_percent = 20.0
            "#,
        )
        .unwrap();

        assert_eq!(config.player_name, "Alice");
        assert_eq!(config.server_addr.port(), 6000);
        assert_eq!(config.shot.max_distance, 120.0);
        assert_eq!(config.shot.charge_rate, 150.0);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.packet_loss.loss_percent, 20.0);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let err = ClientConfig::from_toml("tick_interval_ms = \"fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
