//! SSDP beacon: one multicast `M-SEARCH`, then unicast responses until stopped.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::DiscoveryError;
use crate::{Beacon, BeaconResponse};

/// Standard SSDP multicast group and port.
pub const SSDP_MULTICAST: SocketAddr =
    SocketAddr::V4(std::net::SocketAddrV4::new(std::net::Ipv4Addr::new(239, 255, 255, 250), 1900));

/// Seconds devices may wait before answering.
const MX: u8 = 2;

const MAX_DATAGRAM: usize = 2048;

/// [`Beacon`] speaking SSDP over a UDP socket.
pub struct SsdpBeacon {
    bind: SocketAddr,
    target: SocketAddr,
    listener: Option<JoinHandle<()>>,
}

impl SsdpBeacon {
    /// Search the standard multicast group from an ephemeral port.
    pub fn new() -> Self {
        Self::with_target(SSDP_MULTICAST)
    }

    /// Send the search to `target` instead of the multicast group.
    pub fn with_target(target: SocketAddr) -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 0)),
            target,
            listener: None,
        }
    }
}

impl Default for SsdpBeacon {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SsdpBeacon {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

#[async_trait]
impl Beacon for SsdpBeacon {
    async fn search(
        &mut self,
        service_type: &str,
    ) -> Result<mpsc::Receiver<BeaconResponse>, DiscoveryError> {
        let socket = UdpSocket::bind(self.bind)
            .await
            .map_err(|e| DiscoveryError::Beacon(format!("failed to bind SSDP socket: {e}")))?;

        socket
            .send_to(m_search(service_type).as_bytes(), self.target)
            .await
            .map_err(|e| DiscoveryError::Beacon(format!("failed to send M-SEARCH: {e}")))?;
        debug!(target = %self.target, st = service_type, "sent M-SEARCH");

        let (tx, rx) = mpsc::channel(64);
        let listener = tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                let (len, from) = match socket.recv_from(&mut buf).await {
                    Ok(received) => received,
                    Err(e) => {
                        warn!(error = %e, "SSDP receive failed");
                        break;
                    }
                };
                let text = String::from_utf8_lossy(&buf[..len]);
                match parse_response(&text, from) {
                    Some(response) => {
                        if tx.send(response).await.is_err() {
                            break;
                        }
                    }
                    None => trace!(from = %from, "ignoring unparsable SSDP datagram"),
                }
            }
        });

        if let Some(previous) = self.listener.replace(listener) {
            previous.abort();
        }
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), DiscoveryError> {
        if let Some(listener) = self.listener.take() {
            listener.abort();
            debug!("SSDP beacon stopped");
        }
        Ok(())
    }
}

/// The `M-SEARCH` request for one service type.
pub fn m_search(service_type: &str) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {SSDP_MULTICAST}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {MX}\r\n\
         ST: {service_type}\r\n\
         \r\n"
    )
}

/// Parse an SSDP search response: an HTTP status line and headers.
///
/// Returns `None` unless there is a status code and a `LOCATION` header.
pub fn parse_response(text: &str, from: SocketAddr) -> Option<BeaconResponse> {
    let mut lines = text.lines();
    let status_line = lines.next()?;
    if !status_line.starts_with("HTTP/") {
        return None;
    }
    let status = status_line.split_whitespace().nth(1)?.parse().ok()?;

    let location = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("LOCATION"))
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())?;

    Some(BeaconResponse {
        status,
        location,
        from,
    })
}
