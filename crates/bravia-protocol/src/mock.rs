//! Mock transport for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProtocolError;
use crate::transport::{HttpRequest, HttpResponse, Transport};

type Handler = Arc<dyn Fn(&HttpRequest) -> Result<HttpResponse, ProtocolError> + Send + Sync>;

#[derive(Default)]
struct MockTransportState {
    routes: HashMap<String, Handler>,
    requests: Vec<HttpRequest>,
}

/// Scripted [`Transport`] that records every request it receives.
///
/// Routes are keyed either by full URL or by URL path; unrouted requests get
/// an empty 404. Clones share state, so a test can keep one handle while the
/// code under test owns another.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockTransportState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route requests for `key` through `handler`.
    pub fn route<F>(&self, key: &str, handler: F)
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, ProtocolError> + Send + Sync + 'static,
    {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(key.to_string(), Arc::new(handler));
    }

    /// Always answer `key` with the given status and body.
    pub fn respond(&self, key: &str, status: u16, body: &str) {
        let body = body.to_string();
        self.route(key, move |_| Ok(HttpResponse::new(status, body.clone())));
    }

    /// Always answer `key` with a 200 JSON body.
    pub fn respond_json(&self, key: &str, body: Value) {
        self.respond(key, 200, &body.to_string());
    }

    /// Fail every request to `key` with a transport error.
    pub fn fail(&self, key: &str, message: &str) {
        let message = message.to_string();
        self.route(key, move |_| Err(ProtocolError::Transport(message.clone())));
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Requests whose URL or path matches `key`.
    pub fn requests_to(&self, key: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| matches_key(&r.url, key))
            .collect()
    }
}

/// Path component of an absolute URL.
fn path_of(url: &str) -> &str {
    let after_scheme = url.find("://").map_or(url, |i| &url[i + 3..]);
    after_scheme
        .find('/')
        .map_or("/", |i| &after_scheme[i..])
}

fn matches_key(url: &str, key: &str) -> bool {
    url == key || path_of(url) == key
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ProtocolError> {
        let handler = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());
            state
                .routes
                .get(&request.url)
                .or_else(|| state.routes.get(path_of(&request.url)))
                .cloned()
        };

        match handler {
            Some(handler) => handler(&request),
            None => Ok(HttpResponse::new(404, "")),
        }
    }
}
