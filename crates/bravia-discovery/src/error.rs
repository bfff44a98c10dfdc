//! Discovery subsystem errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("discovery beacon failed: {0}")]
    Beacon(String),

    #[error("failed to fetch device description from {location}: HTTP status {status}")]
    Fetch { location: String, status: u16 },

    #[error("malformed device description: {0}")]
    MalformedDescription(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] bravia_protocol::ProtocolError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
