//! UPnP device-description parsing.
//!
//! A description document looks like `root/device` with the device's
//! identity fields and a `serviceList` of `service` entries. Only the entry
//! whose `serviceType` is the IRCC service is of interest; its `controlURL`
//! is where commands go.

use bravia_types::{ConnectionDescriptor, IRCC_SERVICE_TYPE};
use roxmltree::{Document, Node};
use url::Url;

use crate::error::DiscoveryError;

const DEFAULT_PORT: u16 = 80;

/// Parse a description document fetched from `location` into a connection
/// descriptor. A relative `controlURL` resolves against `location`.
///
/// Returns `Ok(None)` when the device does not offer the IRCC service
/// (no service list, or no matching entry): that is a non-match, not an
/// error. Structural problems in an otherwise matching document are
/// errors.
pub fn parse_description(
    xml: &str,
    location: &str,
) -> Result<Option<ConnectionDescriptor>, DiscoveryError> {
    let doc = Document::parse(xml)
        .map_err(|e| DiscoveryError::MalformedDescription(format!("invalid XML: {e}")))?;

    let root = doc.root_element();
    if !root.has_tag_name("root") {
        return Err(DiscoveryError::MalformedDescription(format!(
            "unexpected root element <{}>",
            root.tag_name().name()
        )));
    }
    let device = child(root, "device")
        .ok_or_else(|| DiscoveryError::MalformedDescription("missing <device>".to_string()))?;

    let Some(service_list) = child(device, "serviceList") else {
        return Ok(None);
    };
    let Some(service) = service_list
        .children()
        .filter(|n| n.has_tag_name("service"))
        .find(|s| child_text(*s, "serviceType").ok() == Some(IRCC_SERVICE_TYPE))
    else {
        return Ok(None);
    };

    let control_url = child_text(service, "controlURL")?;
    let (host, port) = control_endpoint(control_url, location)?;

    Ok(Some(ConnectionDescriptor {
        host,
        port,
        friendly_name: child_text(device, "friendlyName")?.to_string(),
        manufacturer: child_text(device, "manufacturer")?.to_string(),
        manufacturer_url: child_text(device, "manufacturerURL")?.to_string(),
        model_name: child_text(device, "modelName")?.to_string(),
        udn: child_text(device, "UDN")?.to_string(),
    }))
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

/// Trimmed text of a required child element.
fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str, DiscoveryError> {
    child(node, name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            DiscoveryError::MalformedDescription(format!(
                "<{}> has no <{name}>",
                node.tag_name().name()
            ))
        })
}

/// Host and port of a control URL, defaulting the port to 80.
fn control_endpoint(control_url: &str, location: &str) -> Result<(String, u16), DiscoveryError> {
    let base = Url::parse(location).ok();
    let url = Url::options()
        .base_url(base.as_ref())
        .parse(control_url)
        .map_err(|e| {
            DiscoveryError::MalformedDescription(format!("invalid controlURL {control_url:?}: {e}"))
        })?;
    let host = url.host_str().ok_or_else(|| {
        DiscoveryError::MalformedDescription(format!("controlURL {control_url:?} has no host"))
    })?;
    Ok((host.to_string(), url.port().unwrap_or(DEFAULT_PORT)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const LOCATION: &str = "http://192.168.1.20:52323/dmr.xml";

    /// Description document for a device offering IRCC on `control_url`.
    pub(crate) fn description_xml(name: &str, udn: &str, control_url: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0" xmlns:av="urn:schemas-sony-com:av">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:Basic:1</deviceType>
    <friendlyName>{name}</friendlyName>
    <manufacturer>Sony Corporation</manufacturer>
    <manufacturerURL>http://www.sony.net/</manufacturerURL>
    <modelName>KDL-50W805B</modelName>
    <UDN>{udn}</UDN>
    <serviceList>
      <service>
        <serviceType>urn:schemas-sony-com:service:ScalarWebAPI:1</serviceType>
        <serviceId>urn:schemas-sony-com:serviceId:ScalarWebAPI</serviceId>
        <controlURL>http://192.168.1.20/sony</controlURL>
      </service>
      <service>
        <serviceType>urn:schemas-sony-com:service:IRCC:1</serviceType>
        <serviceId>urn:schemas-sony-com:serviceId:IRCC</serviceId>
        <SCPDURL>/sony/ircc/IRCCSCPD.xml</SCPDURL>
        <controlURL>{control_url}</controlURL>
        <eventSubURL></eventSubURL>
      </service>
    </serviceList>
  </device>
</root>"#
        )
    }

    #[test]
    fn parses_ircc_service() {
        let xml = description_xml("Living Room", "uuid:abc", "http://192.168.1.20:8080/sony/IRCC");
        let descriptor = parse_description(&xml, LOCATION).unwrap().unwrap();
        assert_eq!(descriptor.host, "192.168.1.20");
        assert_eq!(descriptor.port, 8080);
        assert_eq!(descriptor.friendly_name, "Living Room");
        assert_eq!(descriptor.manufacturer, "Sony Corporation");
        assert_eq!(descriptor.manufacturer_url, "http://www.sony.net/");
        assert_eq!(descriptor.model_name, "KDL-50W805B");
        assert_eq!(descriptor.udn, "uuid:abc");
    }

    #[test]
    fn port_defaults_to_80() {
        let xml = description_xml("TV", "uuid:abc", "http://192.168.1.20/sony/IRCC");
        assert_eq!(parse_description(&xml, LOCATION).unwrap().unwrap().port, 80);
    }

    #[test]
    fn missing_service_list_is_non_match() {
        let xml = r#"<root xmlns="urn:schemas-upnp-org:device-1-0"><device><friendlyName>Speaker</friendlyName></device></root>"#;
        assert!(parse_description(xml, LOCATION).unwrap().is_none());
    }

    #[test]
    fn other_services_only_is_non_match() {
        let xml = r#"<root><device><friendlyName>Router</friendlyName><serviceList><service><serviceType>urn:schemas-upnp-org:service:WANIPConnection:1</serviceType><controlURL>/ctl</controlURL></service></serviceList></device></root>"#;
        assert!(parse_description(xml, LOCATION).unwrap().is_none());
    }

    #[test]
    fn missing_device_is_malformed() {
        let err = parse_description("<root><specVersion/></root>", LOCATION).unwrap_err();
        assert!(matches!(err, DiscoveryError::MalformedDescription(_)));
    }

    #[test]
    fn invalid_xml_is_malformed() {
        let err = parse_description("<root><device>", LOCATION).unwrap_err();
        assert!(matches!(err, DiscoveryError::MalformedDescription(_)));
    }

    #[test]
    fn relative_control_url_resolves_against_location() {
        let xml = description_xml("TV", "uuid:abc", "/sony/IRCC");
        let descriptor = parse_description(&xml, LOCATION).unwrap().unwrap();
        assert_eq!(descriptor.host, "192.168.1.20");
        assert_eq!(descriptor.port, 52323);
    }

    #[test]
    fn unresolvable_control_url_is_malformed() {
        let xml = description_xml("TV", "uuid:abc", "/sony/IRCC");
        let err = parse_description(&xml, "not a url").unwrap_err();
        assert!(matches!(err, DiscoveryError::MalformedDescription(_)));
    }

    #[test]
    fn missing_identity_field_is_malformed() {
        let xml = description_xml("TV", "", "http://192.168.1.20/sony/IRCC");
        let err = parse_description(&xml, LOCATION).unwrap_err();
        assert!(err.to_string().contains("UDN"), "{err}");
    }
}
