//! SSDP discovery of IRCC-capable devices for bravia-control.
//!
//! Defines the [`Beacon`] trait for broadcasting a search and listening for
//! answers, and [`discover`], which collects answers for a fixed window and
//! turns each one into a [`ConnectionDescriptor`] by fetching the device's
//! description document.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bravia_protocol::{HttpRequest, Transport};
use bravia_types::{ConnectionDescriptor, IRCC_SERVICE_TYPE};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

pub mod description;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod ssdp;

pub use description::parse_description;
pub use error::DiscoveryError;
pub use ssdp::SsdpBeacon;

/// Upper bound on one description fetch; shorter windows cap it further.
pub const DESCRIPTION_TIMEOUT: Duration = Duration::from_millis(5000);

/// One answer to a beacon search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconResponse {
    /// Status code of the answer.
    pub status: u16,
    /// Where the device-description document lives.
    pub location: String,
    /// Address the answer came from.
    pub from: SocketAddr,
}

/// Broadcast search for devices on the local network.
#[async_trait]
pub trait Beacon: Send + 'static {
    /// Issue a search for `service_type`, sending answers to the returned
    /// receiver until [`stop`](Beacon::stop) is called.
    async fn search(
        &mut self,
        service_type: &str,
    ) -> Result<mpsc::Receiver<BeaconResponse>, DiscoveryError>;

    /// Stop listening for answers.
    async fn stop(&mut self) -> Result<(), DiscoveryError>;
}

/// Collect IRCC-capable devices that answer within `window`.
///
/// Always runs for the full window: every well-formed answer that arrives in
/// time is kept, in arrival order. Answers that fail (bad status, fetch
/// error, malformed description) are logged and skipped without affecting
/// the others. Finding nothing is not an error.
pub async fn discover(
    beacon: &mut dyn Beacon,
    transport: Arc<dyn Transport>,
    window: Duration,
) -> Result<Vec<ConnectionDescriptor>, DiscoveryError> {
    let deadline = Instant::now() + window;
    let fetch_timeout = window.min(DESCRIPTION_TIMEOUT);
    let mut answers = beacon.search(IRCC_SERVICE_TYPE).await?;

    // One slot per accepted answer so results keep arrival order even though
    // description fetches finish in any order.
    let mut slots: Vec<Option<ConnectionDescriptor>> = Vec::new();
    let mut fetches = JoinSet::new();
    let mut listening = true;

    loop {
        tokio::select! {
            () = sleep_until(deadline) => break,

            answer = answers.recv(), if listening => match answer {
                Some(answer) if answer.status == 200 => {
                    debug!(from = %answer.from, location = %answer.location, "beacon answer");
                    let slot = slots.len();
                    slots.push(None);
                    let transport = Arc::clone(&transport);
                    fetches.spawn(async move {
                        let result =
                            describe(transport.as_ref(), &answer.location, fetch_timeout).await;
                        (slot, answer.location, result)
                    });
                }
                Some(answer) => {
                    debug!(from = %answer.from, status = answer.status, "ignoring beacon answer");
                }
                None => listening = false,
            },

            Some(joined) = fetches.join_next(), if !fetches.is_empty() => match joined {
                Ok((slot, _, Ok(Some(descriptor)))) => {
                    debug!(udn = %descriptor.udn, host = %descriptor.host, "device described");
                    slots[slot] = Some(descriptor);
                }
                Ok((_, location, Ok(None))) => {
                    debug!(location = %location, "device does not offer IRCC");
                }
                Ok((_, location, Err(e))) => {
                    warn!(location = %location, error = %e, "skipping discovery answer");
                }
                Err(e) => warn!(error = %e, "description fetch task failed"),
            },
        }
    }

    if let Err(e) = beacon.stop().await {
        warn!(error = %e, "failed to stop discovery beacon");
    }
    fetches.abort_all();

    let devices: Vec<ConnectionDescriptor> = slots.into_iter().flatten().collect();
    info!(count = devices.len(), "discovery finished");
    Ok(devices)
}

/// Fetch and parse one device-description document.
async fn describe(
    transport: &dyn Transport,
    location: &str,
    timeout: Duration,
) -> Result<Option<ConnectionDescriptor>, DiscoveryError> {
    let response = transport
        .execute(HttpRequest::get(location, timeout))
        .await?;
    if !response.is_success() {
        return Err(DiscoveryError::Fetch {
            location: location.to_string(),
            status: response.status,
        });
    }
    parse_description(&response.body, location)
}
