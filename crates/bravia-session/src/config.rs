//! Session and discovery configuration loaded from TOML.

use std::time::Duration;

use bravia_types::ConnectionDescriptor;
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: SessionConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// Connection parameters for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_psk")]
    pub psk: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Quiet period between two IRCC codes of one batch.
    #[serde(default = "default_inter_command_delay_ms")]
    pub inter_command_delay_ms: u64,
}

impl SessionConfig {
    /// Defaults for everything but the host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Defaults pointed at a discovered device's control endpoint.
    pub fn for_device(descriptor: &ConnectionDescriptor) -> Self {
        Self {
            host: descriptor.host.clone(),
            port: descriptor.port,
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn inter_command_delay(&self) -> Duration {
        Duration::from_millis(self.inter_command_delay_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            psk: default_psk(),
            request_timeout_ms: default_request_timeout_ms(),
            inter_command_delay_ms: default_inter_command_delay_ms(),
        }
    }
}

/// Discovery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Length of the window during which beacon answers are collected.
    #[serde(default = "default_discovery_timeout_ms")]
    pub timeout_ms: u64,
}

impl DiscoveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_discovery_timeout_ms(),
        }
    }
}

fn default_port() -> u16 {
    80
}

fn default_psk() -> String {
    "0000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_inter_command_delay_ms() -> u64 {
    350
}

fn default_discovery_timeout_ms() -> u64 {
    3000
}
