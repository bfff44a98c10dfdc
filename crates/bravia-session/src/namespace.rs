//! Versioned JSON-RPC namespaces.
//!
//! A [`ProtocolNamespace`] issues calls against one `/sony/{namespace}`
//! endpoint and lazily caches which methods the device supports at each
//! protocol version.

use std::sync::Arc;

use bravia_protocol::{wire, DeviceEndpoint, ProtocolError};
use bravia_types::{Namespace, RemoteCall, DEFAULT_VERSION};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::SessionError;

/// One method as described by `getMethodTypes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    pub params: Vec<String>,
    pub results: Vec<String>,
    pub version: String,
}

/// Methods available at one protocol version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMethods {
    pub version: String,
    pub methods: Vec<MethodSignature>,
}

/// Version → methods, in the order the device listed its versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodTable {
    entries: Vec<VersionMethods>,
}

impl MethodTable {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VersionMethods> {
        self.entries.iter()
    }

    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.version.as_str())
    }

    /// Methods supported at `version`.
    pub fn get(&self, version: &str) -> Option<&[MethodSignature]> {
        self.entries
            .iter()
            .find(|e| e.version == version)
            .map(|e| e.methods.as_slice())
    }

    /// Latest listed version at which `method` is available.
    pub fn version_of(&self, method: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.methods.iter().any(|m| m.name == method))
            .map(|e| e.version.as_str())
    }

    fn only(&self, version: &str) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|e| e.version == version)
                .cloned()
                .collect(),
        }
    }
}

/// Remote methods of one namespace on one device.
pub struct ProtocolNamespace {
    namespace: Namespace,
    endpoint: Arc<DeviceEndpoint>,
    // Held across population so concurrent first calls populate once.
    methods: Mutex<Option<MethodTable>>,
}

impl ProtocolNamespace {
    pub fn new(namespace: Namespace, endpoint: Arc<DeviceEndpoint>) -> Self {
        Self {
            namespace,
            endpoint,
            methods: Mutex::new(None),
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Invoke `method` at `version` with at most one parameter object.
    ///
    /// Resolves to the normalized reply: `results` verbatim, the meaningful
    /// element of `result`, or `None` for a void reply.
    pub async fn invoke(
        &self,
        method: &str,
        version: &str,
        params: Option<Value>,
    ) -> Result<Option<Value>, SessionError> {
        let call = RemoteCall::new(self.namespace, method, version, params);
        let body = self.endpoint.call(&call).await?;
        Ok(wire::normalize_reply(body)?)
    }

    /// Protocol versions the device supports for this namespace, in order.
    pub async fn get_versions(&self) -> Result<Vec<String>, SessionError> {
        match self.invoke("getVersions", DEFAULT_VERSION, None).await? {
            Some(value) => decode(value, "getVersions"),
            None => Ok(Vec::new()),
        }
    }

    /// Methods supported per version, optionally restricted to `version`.
    ///
    /// The first call fetches the version list and then the methods of each
    /// version, one version at a time in list order. Later calls answer from
    /// the cache.
    pub async fn get_method_types(
        &self,
        version: Option<&str>,
    ) -> Result<MethodTable, SessionError> {
        let mut cached = self.methods.lock().await;
        if cached.is_none() {
            *cached = Some(self.fetch_method_table().await?);
        }
        let table = cached.clone().unwrap_or_default();
        Ok(match version {
            Some(version) => table.only(version),
            None => table,
        })
    }

    /// Latest version at which the device offers `method`, if any.
    pub async fn resolve_version(&self, method: &str) -> Result<Option<String>, SessionError> {
        let table = self.get_method_types(None).await?;
        Ok(table.version_of(method).map(str::to_string))
    }

    /// Forget the cached method table.
    pub async fn invalidate(&self) {
        *self.methods.lock().await = None;
    }

    async fn fetch_method_table(&self) -> Result<MethodTable, SessionError> {
        let versions = self.get_versions().await?;
        let mut entries = Vec::with_capacity(versions.len());
        for version in versions {
            let methods = match self
                .invoke(
                    "getMethodTypes",
                    DEFAULT_VERSION,
                    Some(Value::String(version.clone())),
                )
                .await?
            {
                Some(value) => parse_signatures(value)?,
                None => Vec::new(),
            };
            debug!(
                namespace = %self.namespace,
                version = %version,
                count = methods.len(),
                "fetched method types"
            );
            entries.push(VersionMethods { version, methods });
        }
        Ok(MethodTable { entries })
    }
}

impl std::fmt::Debug for ProtocolNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolNamespace")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Result<T, SessionError> {
    serde_json::from_value(value.clone()).map_err(|e| {
        SessionError::Protocol(ProtocolError::malformed(
            format!("unexpected {what} reply: {e}"),
            value.to_string(),
        ))
    })
}

/// `getMethodTypes` lists each method as `[name, params, results, version]`.
fn parse_signatures(value: Value) -> Result<Vec<MethodSignature>, SessionError> {
    let rows: Vec<(String, Vec<String>, Vec<String>, String)> = decode(value, "getMethodTypes")?;
    Ok(rows
        .into_iter()
        .map(|(name, params, results, version)| MethodSignature {
            name,
            params,
            results,
            version,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn signatures_from_rows() {
        let value = json!([
            ["getPowerStatus", [], ["{\"status\":\"string\"}"], "1.0"],
            ["setPowerStatus", ["{\"status\":\"bool\"}"], [], "1.0"],
        ]);
        let methods = parse_signatures(value).unwrap();
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].name, "getPowerStatus");
        assert!(methods[0].params.is_empty());
        assert_eq!(methods[1].params, vec!["{\"status\":\"bool\"}".to_string()]);
    }

    #[test]
    fn bad_rows_are_malformed() {
        let err = parse_signatures(json!([["only-a-name"]])).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Protocol(ProtocolError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn table_lookup() {
        let sig = |name: &str, version: &str| MethodSignature {
            name: name.to_string(),
            params: Vec::new(),
            results: Vec::new(),
            version: version.to_string(),
        };
        let table = MethodTable {
            entries: vec![
                VersionMethods {
                    version: "1.0".to_string(),
                    methods: vec![sig("getVolumeInformation", "1.0"), sig("setAudioMute", "1.0")],
                },
                VersionMethods {
                    version: "1.1".to_string(),
                    methods: vec![sig("setAudioVolume", "1.1")],
                },
            ],
        };
        assert_eq!(table.versions().collect::<Vec<_>>(), vec!["1.0", "1.1"]);
        assert_eq!(table.get("1.1").unwrap().len(), 1);
        assert!(table.get("2.0").is_none());
        assert_eq!(table.version_of("setAudioVolume"), Some("1.1"));
        assert_eq!(table.version_of("setAudioMute"), Some("1.0"));
        assert_eq!(table.version_of("reboot"), None);
        assert_eq!(table.only("1.0").versions().collect::<Vec<_>>(), vec!["1.0"]);
    }
}
