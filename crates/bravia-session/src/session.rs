//! Device session: one device, its namespaces, and its IRCC code table.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bravia_discovery::{Beacon, SsdpBeacon};
use bravia_protocol::{DeviceEndpoint, ProtocolError, ReqwestTransport, Transport};
use bravia_types::{CommandId, ConnectionDescriptor, Namespace, RemoteCode, DEFAULT_VERSION};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::dispatch::{CommandBatch, CommandQueue};
use crate::error::SessionError;
use crate::namespace::ProtocolNamespace;

/// Symbolic name → raw code, as reported by `getRemoteControllerInfo`.
#[derive(Debug, Clone, Default)]
struct CodeTable {
    codes: Vec<RemoteCode>,
    by_name: HashMap<String, String>,
}

impl CodeTable {
    fn new(codes: Vec<RemoteCode>) -> Self {
        let by_name = codes
            .iter()
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect();
        Self { codes, by_name }
    }
}

/// A connection to one device.
///
/// Owns one [`ProtocolNamespace`] per known namespace and a lazily filled
/// IRCC code table that lives as long as the session.
pub struct DeviceSession {
    config: SessionConfig,
    endpoint: Arc<DeviceEndpoint>,
    namespaces: HashMap<Namespace, ProtocolNamespace>,
    codes: Mutex<Option<CodeTable>>,
    /// Serializes batches so codes from two `send` calls never interleave.
    dispatch: Mutex<()>,
}

impl DeviceSession {
    /// Create a session that talks HTTP through reqwest.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Create a session over the given transport.
    pub fn with_transport(config: SessionConfig, transport: Arc<dyn Transport>) -> Self {
        let endpoint = Arc::new(DeviceEndpoint::new(
            config.host.clone(),
            config.port,
            config.psk.clone(),
            config.request_timeout(),
            transport,
        ));
        let namespaces = Namespace::ALL
            .into_iter()
            .map(|ns| (ns, ProtocolNamespace::new(ns, Arc::clone(&endpoint))))
            .collect();

        Self {
            config,
            endpoint,
            namespaces,
            codes: Mutex::new(None),
            dispatch: Mutex::new(()),
        }
    }

    /// Find devices on the local network via SSDP.
    pub async fn discover(timeout: Duration) -> Result<Vec<ConnectionDescriptor>, SessionError> {
        let mut beacon = SsdpBeacon::new();
        Self::discover_with(&mut beacon, Arc::new(ReqwestTransport::new()), timeout).await
    }

    /// Find devices using the given beacon and transport.
    pub async fn discover_with(
        beacon: &mut dyn Beacon,
        transport: Arc<dyn Transport>,
        timeout: Duration,
    ) -> Result<Vec<ConnectionDescriptor>, SessionError> {
        Ok(bravia_discovery::discover(beacon, transport, timeout).await?)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    /// The namespace's remote methods.
    pub fn namespace(&self, namespace: Namespace) -> &ProtocolNamespace {
        &self.namespaces[&namespace]
    }

    /// Shorthand for the `system` namespace.
    pub fn system(&self) -> &ProtocolNamespace {
        self.namespace(Namespace::System)
    }

    /// The device's full IRCC code table, fetched on first use.
    pub async fn codes(&self) -> Result<Vec<RemoteCode>, SessionError> {
        let mut cached = self.codes.lock().await;
        let table = self.populated(&mut cached).await?;
        Ok(table.codes.clone())
    }

    /// Drop the cached code table so the next lookup fetches it again.
    pub async fn invalidate_codes(&self) {
        *self.codes.lock().await = None;
    }

    /// Raw IRCC code for a command.
    ///
    /// Raw codes pass through without touching the code table. Symbolic
    /// names are looked up, fetching the table once if needed.
    pub async fn resolve(&self, command: &CommandId) -> Result<String, SessionError> {
        match command {
            CommandId::Raw(code) => Ok(code.clone()),
            CommandId::Symbolic(name) => {
                let mut cached = self.codes.lock().await;
                let table = self.populated(&mut cached).await?;
                table
                    .by_name
                    .get(name)
                    .cloned()
                    .ok_or_else(|| SessionError::UnknownCode(name.clone()))
            }
        }
    }

    /// Send one command or an ordered batch.
    ///
    /// Codes go out one at a time, separated by the configured delay. The
    /// first failure stops the batch and is returned.
    pub async fn send(&self, commands: impl Into<CommandBatch>) -> Result<(), SessionError> {
        let batch = commands.into();
        let _dispatch = self.dispatch.lock().await;
        CommandQueue::new(self, self.config.inter_command_delay())
            .run(batch)
            .await
    }

    async fn populated<'a>(
        &self,
        cached: &'a mut Option<CodeTable>,
    ) -> Result<&'a CodeTable, SessionError> {
        if cached.is_none() {
            let codes = self.fetch_codes().await?;
            info!(count = codes.len(), "loaded IRCC code table");
            *cached = Some(CodeTable::new(codes));
        }
        Ok(cached.get_or_insert_with(CodeTable::default))
    }

    async fn fetch_codes(&self) -> Result<Vec<RemoteCode>, SessionError> {
        debug!("fetching IRCC code table");
        let Some(value) = self
            .system()
            .invoke("getRemoteControllerInfo", DEFAULT_VERSION, None)
            .await?
        else {
            return Ok(Vec::new());
        };
        serde_json::from_value(value.clone()).map_err(|e| {
            SessionError::Protocol(ProtocolError::malformed(
                format!("unexpected getRemoteControllerInfo reply: {e}"),
                value.to_string(),
            ))
        })
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("config", &self.config)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
