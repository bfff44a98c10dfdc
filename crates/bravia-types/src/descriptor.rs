//! Connection descriptors produced by discovery.

use serde::{Deserialize, Serialize};

/// Everything needed to reach a discovered device's control endpoint.
///
/// `host` and `port` come from the control URL of the device's IRCC service,
/// not from the address the discovery beacon answered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: u16,
    #[serde(rename = "friendlyName")]
    pub friendly_name: String,
    pub manufacturer: String,
    #[serde(rename = "manufacturerURL")]
    pub manufacturer_url: String,
    #[serde(rename = "modelName")]
    pub model_name: String,
    /// Stable device identity (`uuid:...`).
    #[serde(rename = "UDN")]
    pub udn: String,
}

impl std::fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) at {}:{}",
            self.friendly_name, self.model_name, self.host, self.port
        )
    }
}
