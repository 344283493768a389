use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use chrono::DateTime;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::debug;
use x509_parser::der_parser::oid::Oid;
use x509_parser::prelude::*;

use crate::config::NetdashConfig;
use crate::error::{NetdashError, Result};

const HTTPS_PORT: u16 = 443;

/// Leaf certificate fields reported by the ssl-check endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateInfo {
    pub subject: BTreeMap<String, String>,
    pub issuer: BTreeMap<String, String>,
    pub version: u32,
    #[serde(rename = "serialNumber")]
    pub serial_number: String,
    #[serde(rename = "notBefore")]
    pub not_before: String,
    #[serde(rename = "notAfter")]
    pub not_after: String,
    #[serde(rename = "subjectAltName")]
    pub subject_alt_name: Vec<(String, String)>,
}

/// Build the shared TLS client configuration over the webpki root store.
pub fn connector() -> TlsConnector {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

/// Handshake with `domain:443` and report its leaf certificate.
///
/// Both the TCP connect and the handshake are individually bounded by
/// the configured timeout. A certificate the root store rejects fails
/// the handshake and surfaces as a certificate error, like any other
/// failure on this path.
pub async fn inspect(
    domain: &str,
    connector: &TlsConnector,
    config: &NetdashConfig,
) -> Result<CertificateInfo> {
    let cert_error = |message: String| NetdashError::Certificate {
        domain: domain.to_string(),
        message,
    };

    let server_name = ServerName::try_from(domain.to_string())
        .map_err(|_| cert_error(format!("invalid server name: {domain}")))?;

    debug!("inspecting certificate for {domain}");
    let tcp = timeout(config.tls_timeout(), TcpStream::connect((domain, HTTPS_PORT)))
        .await
        .map_err(|_| cert_error("connect timed out".to_string()))?
        .map_err(|e| cert_error(e.to_string()))?;

    let tls = timeout(config.tls_timeout(), connector.connect(server_name, tcp))
        .await
        .map_err(|_| cert_error("TLS handshake timed out".to_string()))?
        .map_err(|e| cert_error(e.to_string()))?;

    let (_, connection) = tls.get_ref();
    let der = connection
        .peer_certificates()
        .and_then(|certs| certs.first())
        .ok_or_else(|| cert_error("peer presented no certificate".to_string()))?;

    let (_, cert) =
        X509Certificate::from_der(der.as_ref()).map_err(|e| cert_error(e.to_string()))?;

    Ok(CertificateInfo {
        subject: name_attributes(cert.subject()),
        issuer: name_attributes(cert.issuer()),
        // X.509 stores the version zero-based; report it the way
        // inspection tools print it (v3 certificates as 3).
        version: cert.version().0 + 1,
        serial_number: cert.tbs_certificate.serial.to_str_radix(16).to_uppercase(),
        not_before: format_validity(cert.validity().not_before.timestamp()),
        not_after: format_validity(cert.validity().not_after.timestamp()),
        subject_alt_name: alt_names(&cert),
    })
}

/// Flatten a distinguished name into attribute/value pairs keyed by the
/// long attribute names certificate viewers show.
fn name_attributes(name: &X509Name<'_>) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    for attr in name.iter_attributes() {
        if let Ok(value) = attr.as_str() {
            attributes.insert(attribute_name(attr.attr_type()), value.to_string());
        }
    }
    attributes
}

fn attribute_name(oid: &Oid<'_>) -> String {
    match oid.to_id_string().as_str() {
        "2.5.4.3" => "commonName",
        "2.5.4.5" => "serialNumber",
        "2.5.4.6" => "countryName",
        "2.5.4.7" => "localityName",
        "2.5.4.8" => "stateOrProvinceName",
        "2.5.4.10" => "organizationName",
        "2.5.4.11" => "organizationalUnitName",
        "1.2.840.113549.1.9.1" => "emailAddress",
        other => return other.to_string(),
    }
    .to_string()
}

fn alt_names(cert: &X509Certificate<'_>) -> Vec<(String, String)> {
    let mut names = Vec::new();
    if let Ok(Some(san)) = cert.subject_alternative_name() {
        for general_name in &san.value.general_names {
            match general_name {
                GeneralName::DNSName(dns) => {
                    names.push(("DNS".to_string(), (*dns).to_string()));
                }
                GeneralName::IPAddress(bytes) => {
                    if let Some(ip) = ip_from_bytes(bytes) {
                        names.push(("IP Address".to_string(), ip.to_string()));
                    }
                }
                _ => {}
            }
        }
    }
    names
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}

/// OpenSSL-style GMT timestamp, e.g. `Jun  1 12:00:00 2025 GMT`.
fn format_validity(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(when) => when.format("%b %e %H:%M:%S %Y GMT").to_string(),
        None => timestamp.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_uses_the_openssl_presentation() {
        assert_eq!(format_validity(0), "Jan  1 00:00:00 1970 GMT");
        // 2025-06-15 08:30:00 UTC
        assert_eq!(format_validity(1_749_976_200), "Jun 15 08:30:00 2025 GMT");
    }

    #[test]
    fn well_known_attribute_oids_get_long_names() {
        let cn = Oid::from(&[2, 5, 4, 3]).unwrap();
        assert_eq!(attribute_name(&cn), "commonName");
        let org = Oid::from(&[2, 5, 4, 10]).unwrap();
        assert_eq!(attribute_name(&org), "organizationName");
    }

    #[test]
    fn unknown_oids_fall_back_to_dotted_form() {
        let odd = Oid::from(&[1, 3, 6, 1, 4, 1, 99]).unwrap();
        assert_eq!(attribute_name(&odd), "1.3.6.1.4.1.99");
    }

    #[test]
    fn ip_bytes_map_to_both_families() {
        assert_eq!(
            ip_from_bytes(&[127, 0, 0, 1]),
            Some(IpAddr::V4(Ipv4Addr::LOCALHOST))
        );
        assert_eq!(ip_from_bytes(&[0u8; 16]), Some(IpAddr::V6(Ipv6Addr::UNSPECIFIED)));
        assert_eq!(ip_from_bytes(&[1, 2, 3]), None);
    }
}
