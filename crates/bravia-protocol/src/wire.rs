//! Wire formats: JSON-RPC replies, the IRCC SOAP envelope, and SOAP faults.

use bravia_types::IRCC_SERVICE_TYPE;
use serde_json::Value;

use crate::error::ProtocolError;

/// Path of the IRCC control endpoint, relative to `/sony`.
pub const IRCC_PATH: &str = "/IRCC";

/// `SOAPACTION` header value for sending one IRCC code.
pub const SOAP_ACTION: &str = "\"urn:schemas-sony-com:service:IRCC:1#X_SendIRCC\"";

pub const SOAP_CONTENT_TYPE: &str = "text/xml; charset=UTF-8";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Header carrying the pre-shared key.
pub const PSK_HEADER: &str = "X-Auth-PSK";

/// SOAP envelope invoking `X_SendIRCC` with a single code.
pub fn ircc_envelope(code: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0"?>"#,
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">"#,
            "<s:Body>",
            r#"<u:X_SendIRCC xmlns:u="{service}">"#,
            "<IRCCCode>{code}</IRCCCode>",
            "</u:X_SendIRCC>",
            "</s:Body>",
            "</s:Envelope>"
        ),
        service = IRCC_SERVICE_TYPE,
        code = code,
    )
}

/// Extract the device error carried by a JSON-RPC `error` field.
///
/// Returns `None` when the body has no `error` field. The field is an array
/// of `[code, message]`; anything else is malformed.
pub fn json_error(body: &Value) -> Option<ProtocolError> {
    let error = body.get("error")?;
    let message = error.get(1).and_then(Value::as_str);
    Some(match message {
        Some(message) => ProtocolError::Application {
            code: error.get(0).and_then(Value::as_i64),
            message: message.to_string(),
        },
        None => ProtocolError::malformed("malformed error response", error.to_string()),
    })
}

/// Normalize a decoded JSON-RPC reply.
///
/// Precedence: `error` fails, `results` resolves verbatim, `result` resolves
/// its element at index 1 when it has more than one element and index 0
/// otherwise, anything else resolves to no value.
pub fn normalize_reply(body: Value) -> Result<Option<Value>, ProtocolError> {
    if let Some(err) = json_error(&body) {
        return Err(err);
    }

    let Value::Object(mut fields) = body else {
        return Ok(None);
    };

    if let Some(results) = fields.remove("results") {
        return Ok(Some(results));
    }

    match fields.remove("result") {
        Some(Value::Array(mut items)) => {
            let index = usize::from(items.len() > 1);
            if items.len() > index {
                Ok(Some(items.swap_remove(index)))
            } else {
                Ok(None)
            }
        }
        Some(other) => Err(ProtocolError::malformed(
            "`result` is not an array",
            other.to_string(),
        )),
        None => Ok(None),
    }
}

/// Outcome of inspecting an XML body for a SOAP fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoapFault {
    /// No `Fault` element present.
    None,
    /// A fault with its human-readable description.
    Described(String),
    /// A fault from which no description could be read.
    Malformed(String),
    /// The body is not XML, so it carries no fault.
    Unparsable(String),
}

/// Inspect an XML body for a SOAP `Fault` and its UPnP `errorDescription`.
pub fn soap_fault(body: &str) -> SoapFault {
    if body.trim().is_empty() {
        return SoapFault::None;
    }

    let doc = match roxmltree::Document::parse(body) {
        Ok(doc) => doc,
        Err(e) => return SoapFault::Unparsable(format!("failed to parse the error response: {e}")),
    };

    let Some(fault) = doc.descendants().find(|n| n.has_tag_name("Fault")) else {
        return SoapFault::None;
    };

    fault
        .descendants()
        .find(|n| n.has_tag_name("errorDescription"))
        .and_then(|n| n.text())
        .map(|text| SoapFault::Described(text.trim().to_string()))
        .unwrap_or_else(|| SoapFault::Malformed("malformed error response".to_string()))
}
