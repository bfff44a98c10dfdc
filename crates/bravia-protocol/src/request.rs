//! Shared request path for every call against a device.
//!
//! Both the JSON-RPC namespaces and the IRCC endpoint go through
//! [`DeviceEndpoint`], which attaches the URL, authentication header and
//! timeout, and classifies failures in three layers: transport, HTTP status,
//! then application-level error payloads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bravia_types::RemoteCall;
use serde_json::Value;
use tracing::debug;

use crate::error::ProtocolError;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};
use crate::wire::{
    self, SoapFault, IRCC_PATH, JSON_CONTENT_TYPE, PSK_HEADER, SOAP_ACTION, SOAP_CONTENT_TYPE,
};

/// Connection parameters plus the transport used to reach one device.
pub struct DeviceEndpoint {
    host: String,
    port: u16,
    psk: String,
    timeout: Duration,
    transport: Arc<dyn Transport>,
    next_id: AtomicU64,
}

impl DeviceEndpoint {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        psk: impl Into<String>,
        timeout: Duration,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            psk: psk.into(),
            timeout,
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute URL for a path under the `/sony` root.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}:{}/sony{path}", self.host, self.port)
    }

    fn post(&self, path: &str, content_type: &str, body: String) -> HttpRequest {
        HttpRequest {
            method: Method::Post,
            url: self.url(path),
            headers: vec![
                ("Content-Type".to_string(), content_type.to_string()),
                (PSK_HEADER.to_string(), self.psk.clone()),
            ],
            body: Some(body),
            timeout: self.timeout,
        }
    }

    /// Post a JSON-RPC call to its namespace and return the decoded body.
    ///
    /// A body carrying an `error` field fails with
    /// [`ProtocolError::Application`].
    pub async fn call(&self, call: &RemoteCall) -> Result<Value, ProtocolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = call.to_body(id).to_string();
        let request = self.post(&call.namespace.path(), JSON_CONTENT_TYPE, body);

        debug!(
            namespace = %call.namespace,
            method = %call.method,
            version = %call.version,
            id,
            "invoking remote method"
        );
        let response = self.transport.execute(request).await?;

        if !response.is_success() {
            return Err(status_error(&response));
        }

        let decoded: Value = serde_json::from_str(&response.body)
            .map_err(|e| ProtocolError::malformed(format!("invalid JSON: {e}"), response.body))?;

        match wire::json_error(&decoded) {
            Some(err) => Err(err),
            None => Ok(decoded),
        }
    }

    /// Post one raw IRCC code to the control endpoint.
    pub async fn send_ircc(&self, code: &str) -> Result<(), ProtocolError> {
        let mut request = self.post(IRCC_PATH, SOAP_CONTENT_TYPE, wire::ircc_envelope(code));
        request
            .headers
            .push(("SOAPACTION".to_string(), SOAP_ACTION.to_string()));

        debug!(code, "sending IRCC code");
        let response = self.transport.execute(request).await?;

        if !response.is_success() {
            return Err(status_error(&response));
        }

        match wire::soap_fault(&response.body) {
            SoapFault::None => Ok(()),
            SoapFault::Described(message) => Err(ProtocolError::Application {
                code: None,
                message,
            }),
            SoapFault::Malformed(context) => {
                Err(ProtocolError::malformed(context, response.body))
            }
            SoapFault::Unparsable(context) => {
                debug!(status = response.status, reason = %context, "non-XML IRCC reply accepted");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for DeviceEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Build the error for a non-2xx response, keeping any device description.
fn status_error(response: &HttpResponse) -> ProtocolError {
    let detail = match serde_json::from_str::<Value>(&response.body) {
        Ok(json) => match wire::json_error(&json) {
            Some(ProtocolError::Application { message, .. }) => Some(message),
            _ => None,
        },
        Err(_) => match wire::soap_fault(&response.body) {
            SoapFault::Described(message) => Some(message),
            SoapFault::None | SoapFault::Malformed(_) | SoapFault::Unparsable(_) => None,
        },
    };
    ProtocolError::HttpStatus {
        status: response.status,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use bravia_types::{Namespace, RemoteCall};
    use serde_json::json;

    use super::*;
    use crate::mock::MockTransport;

    fn endpoint(mock: &MockTransport) -> DeviceEndpoint {
        DeviceEndpoint::new(
            "192.168.1.20",
            8080,
            "1234",
            Duration::from_millis(5000),
            Arc::new(mock.clone()),
        )
    }

    #[tokio::test]
    async fn call_builds_json_request() {
        let mock = MockTransport::new();
        mock.respond_json("/sony/system", json!({"result": [{"power": "active"}]}));
        let endpoint = endpoint(&mock);

        let call = RemoteCall::new(Namespace::System, "getPowerStatus", "1.0", None);
        let body = endpoint.call(&call).await.unwrap();
        assert_eq!(body["result"][0]["power"], "active");

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "http://192.168.1.20:8080/sony/system");
        assert_eq!(request.header("X-Auth-PSK"), Some("1234"));
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.timeout, Duration::from_millis(5000));

        let sent: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(sent["method"], "getPowerStatus");
        assert_eq!(sent["version"], "1.0");
        assert_eq!(sent["params"], json!([]));
    }

    #[tokio::test]
    async fn request_ids_increase() {
        let mock = MockTransport::new();
        mock.respond_json("/sony/system", json!({}));
        let endpoint = endpoint(&mock);
        let call = RemoteCall::new(Namespace::System, "getVersions", "1.0", None);
        endpoint.call(&call).await.unwrap();
        endpoint.call(&call).await.unwrap();

        let ids: Vec<u64> = mock
            .requests()
            .iter()
            .map(|r| {
                let body: Value = serde_json::from_str(r.body.as_deref().unwrap()).unwrap();
                body["id"].as_u64().unwrap()
            })
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn json_error_on_success_status_is_application_error() {
        let mock = MockTransport::new();
        mock.respond_json("/sony/audio", json!({"error": [12, "getFoo"]}));
        let endpoint = endpoint(&mock);

        let call = RemoteCall::new(Namespace::Audio, "getFoo", "1.0", None);
        let err = endpoint.call(&call).await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Application { code: Some(12), ref message } if message == "getFoo"
        ));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let mock = MockTransport::new();
        mock.respond("/sony/audio", 200, "<html>");
        let endpoint = endpoint(&mock);

        let call = RemoteCall::new(Namespace::Audio, "getFoo", "1.0", None);
        let err = endpoint.call(&call).await.unwrap_err();
        match err {
            ProtocolError::MalformedResponse { body, .. } => assert_eq!(body, "<html>"),
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_2xx_names_status() {
        let mock = MockTransport::new();
        mock.respond("/sony/system", 403, "");
        let endpoint = endpoint(&mock);

        let call = RemoteCall::new(Namespace::System, "getPowerStatus", "1.0", None);
        let err = endpoint.call(&call).await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::HttpStatus {
                status: 403,
                detail: None
            }
        ));
    }

    #[tokio::test]
    async fn transport_failure_passes_through() {
        let mock = MockTransport::new();
        mock.fail("/sony/system", "connection refused");
        let endpoint = endpoint(&mock);

        let call = RemoteCall::new(Namespace::System, "getPowerStatus", "1.0", None);
        let err = endpoint.call(&call).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn ircc_request_carries_soap_headers() {
        let mock = MockTransport::new();
        mock.respond("/sony/IRCC", 200, "");
        let endpoint = endpoint(&mock);

        endpoint.send_ircc("AAAAAQAAAAEAAAAvAw==").await.unwrap();

        let request = &mock.requests()[0];
        assert_eq!(request.url, "http://192.168.1.20:8080/sony/IRCC");
        assert_eq!(
            request.header("SOAPACTION"),
            Some("\"urn:schemas-sony-com:service:IRCC:1#X_SendIRCC\"")
        );
        assert_eq!(request.header("Content-Type"), Some("text/xml; charset=UTF-8"));
        assert_eq!(request.header("X-Auth-PSK"), Some("1234"));
        assert!(request
            .body
            .as_deref()
            .unwrap()
            .contains("<IRCCCode>AAAAAQAAAAEAAAAvAw==</IRCCCode>"));
    }

    #[tokio::test]
    async fn ircc_fault_keeps_status_and_description() {
        let fault = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><s:Fault><detail><UPnPError xmlns="urn:schemas-upnp-org:control-1-0"><errorCode>800</errorCode><errorDescription>Action Failed</errorDescription></UPnPError></detail></s:Fault></s:Body></s:Envelope>"#;
        let mock = MockTransport::new();
        mock.respond("/sony/IRCC", 500, fault);
        let endpoint = endpoint(&mock);

        let err = endpoint.send_ircc("AAAAAQAAAAEAAAAvAw==").await.unwrap_err();
        match err {
            ProtocolError::HttpStatus { status, detail } => {
                assert_eq!(status, 500);
                assert_eq!(detail.as_deref(), Some("Action Failed"));
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ircc_fault_on_success_status_is_application_error() {
        let fault = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><s:Fault><detail><UPnPError><errorDescription>Invalid Args</errorDescription></UPnPError></detail></s:Fault></s:Body></s:Envelope>"#;
        let mock = MockTransport::new();
        mock.respond("/sony/IRCC", 200, fault);
        let endpoint = endpoint(&mock);

        let err = endpoint.send_ircc("AAAAAQAAAAEAAAAvAw==").await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Application { code: None, ref message } if message == "Invalid Args"
        ));
    }

    #[tokio::test]
    async fn non_xml_reply_on_success_status_is_delivered() {
        let mock = MockTransport::new();
        mock.respond("/sony/IRCC", 200, "OK");
        let endpoint = endpoint(&mock);

        endpoint.send_ircc("AAAAAQAAAAEAAAAvAw==").await.unwrap();
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn non_xml_reply_on_error_status_has_no_detail() {
        let mock = MockTransport::new();
        mock.respond("/sony/IRCC", 503, "Service Unavailable");
        let endpoint = endpoint(&mock);

        let err = endpoint.send_ircc("AAAAAQAAAAEAAAAvAw==").await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::HttpStatus {
                status: 503,
                detail: None
            }
        ));
    }
}
