//! Mock beacon for testing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::DiscoveryError;
use crate::{Beacon, BeaconResponse};

#[derive(Debug, Default)]
struct MockBeaconState {
    searches: Vec<String>,
    stopped: bool,
}

/// Mock discovery beacon.
///
/// Returns a `mpsc::Sender<BeaconResponse>` that tests use to inject answers.
/// The first `search()` hands the matching receiver to the caller.
pub struct MockBeacon {
    feed_rx: Option<mpsc::Receiver<BeaconResponse>>,
    state: Arc<Mutex<MockBeaconState>>,
}

/// Observes what a [`MockBeacon`] was asked to do.
#[derive(Clone)]
pub struct MockBeaconHandle {
    state: Arc<Mutex<MockBeaconState>>,
}

impl MockBeacon {
    /// Create a new mock beacon and a sender for injecting answers.
    pub fn new() -> (Self, mpsc::Sender<BeaconResponse>) {
        let (feed_tx, feed_rx) = mpsc::channel(64);
        let beacon = Self {
            feed_rx: Some(feed_rx),
            state: Arc::new(Mutex::new(MockBeaconState::default())),
        };
        (beacon, feed_tx)
    }

    pub fn handle(&self) -> MockBeaconHandle {
        MockBeaconHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl MockBeaconHandle {
    /// Service types searched for, in order.
    pub fn searches(&self) -> Vec<String> {
        self.state.lock().unwrap().searches.clone()
    }

    /// Whether `stop()` was called.
    pub fn is_stopped(&self) -> bool {
        self.state.lock().unwrap().stopped
    }
}

#[async_trait]
impl Beacon for MockBeacon {
    async fn search(
        &mut self,
        service_type: &str,
    ) -> Result<mpsc::Receiver<BeaconResponse>, DiscoveryError> {
        self.state
            .lock()
            .unwrap()
            .searches
            .push(service_type.to_string());
        self.feed_rx
            .take()
            .ok_or_else(|| DiscoveryError::Beacon("MockBeacon already searched".to_string()))
    }

    async fn stop(&mut self) -> Result<(), DiscoveryError> {
        self.state.lock().unwrap().stopped = true;
        Ok(())
    }
}
