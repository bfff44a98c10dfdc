//! Shared types for bravia-control.
//!
//! This crate contains the value types shared across the bravia-control
//! workspace: discovered connection descriptors, the fixed set of JSON-RPC
//! namespaces, remote call descriptions, and IRCC command identifiers.

pub mod call;
pub mod code;
pub mod descriptor;
pub mod namespace;

pub use call::{RemoteCall, DEFAULT_VERSION};
pub use code::{CommandId, RemoteCode};
pub use descriptor::ConnectionDescriptor;
pub use namespace::{Namespace, ParseNamespaceError};

/// Service type advertised by devices that accept IRCC commands.
pub const IRCC_SERVICE_TYPE: &str = "urn:schemas-sony-com:service:IRCC:1";
