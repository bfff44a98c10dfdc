//! Session errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown IRCC code {0}")]
    UnknownCode(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] bravia_protocol::ProtocolError),

    #[error("discovery error: {0}")]
    Discovery(#[from] bravia_discovery::DiscoveryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
