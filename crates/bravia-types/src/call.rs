//! Remote procedure call descriptions.

use serde_json::{json, Value};

use crate::namespace::Namespace;

/// Protocol version used when the caller does not ask for one.
pub const DEFAULT_VERSION: &str = "1.0";

/// A single versioned call against one namespace.
///
/// The device accepts at most one positional parameter object per call, so
/// `params` holds zero or one element.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
    pub namespace: Namespace,
    pub method: String,
    pub version: String,
    pub params: Vec<Value>,
}

impl RemoteCall {
    /// Build a call, wrapping `params` into a one-element sequence when present.
    pub fn new(
        namespace: Namespace,
        method: impl Into<String>,
        version: impl Into<String>,
        params: Option<Value>,
    ) -> Self {
        Self {
            namespace,
            method: method.into(),
            version: version.into(),
            params: params.into_iter().collect(),
        }
    }

    /// JSON-RPC request body carrying the given request id.
    #[must_use]
    pub fn to_body(&self, id: u64) -> Value {
        json!({
            "id": id,
            "method": self.method,
            "version": self.version,
            "params": self.params,
        })
    }
}
