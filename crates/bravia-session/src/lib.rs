//! Device sessions for bravia-control.
//!
//! A [`DeviceSession`] ties together one device's JSON-RPC namespaces, its
//! lazily loaded IRCC code table and paced command dispatch. Discovery of
//! devices on the local network is exposed through [`DeviceSession::discover`].

pub mod config;
pub mod dispatch;
pub mod error;
pub mod namespace;
pub mod session;
pub mod setup;

pub use config::{Config, DiscoveryConfig, SessionConfig};
pub use dispatch::CommandBatch;
pub use error::SessionError;
pub use namespace::{MethodSignature, MethodTable, ProtocolNamespace, VersionMethods};
pub use session::DeviceSession;
