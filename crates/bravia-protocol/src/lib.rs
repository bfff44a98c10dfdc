//! HTTP transport layer and wire formats for bravia-control.
//!
//! This crate handles the HTTP exchange with a device (via reqwest behind the
//! [`Transport`] trait), the JSON-RPC and IRCC SOAP wire formats, and the
//! shared request path that attaches authentication and classifies failures.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod request;
pub mod transport;
pub mod wire;

pub use error::ProtocolError;
pub use request::DeviceEndpoint;
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
