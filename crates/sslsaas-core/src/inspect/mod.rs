//! Edge certificate inspection
//!
//! After issuance, connect to the hostname directly, complete a verified TLS
//! handshake and read the leaf certificate the edge actually serves. This is
//! independent of what the provider API claims.
//!
//! Inspection is best effort. Its `Result` is reported by the caller and never
//! changes the issuance outcome.

use crate::config::InspectConfig;
use crate::error::{Error, Result};
use crate::issuance::ActiveHostname;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{self, ClientConfig, RootCertStore};
use tracing::{debug, info};
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::{FromDer, X509Certificate};

/// Attributes of the leaf certificate served for a hostname
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateInfo {
    /// Serial number as colon-separated hex
    pub serial_number: String,
    /// Signature algorithm name (dotted OID when not recognised)
    pub signature_algorithm: String,
    /// Start of the validity window
    pub not_before: DateTime<Utc>,
    /// End of the validity window
    pub not_after: DateTime<Utc>,
    /// First CN of the subject, if any
    pub common_name: Option<String>,
    /// First CN of the issuer, if any
    pub issuer: Option<String>,
    /// Subject alternative names in certificate order
    pub subject_alt_names: Vec<String>,
}

impl CertificateInfo {
    /// Parse a DER-encoded X.509 certificate
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| Error::certificate(format!("Failed to parse certificate: {}", e)))?;

        let validity = cert.validity();
        let not_before = asn1_to_utc(validity.not_before.timestamp())?;
        let not_after = asn1_to_utc(validity.not_after.timestamp())?;

        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_string);

        let issuer = cert
            .issuer()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_string);

        let subject_alt_names = match cert.subject_alternative_name() {
            Ok(Some(san)) => san
                .value
                .general_names
                .iter()
                .filter_map(general_name_value)
                .collect(),
            Ok(None) => Vec::new(),
            Err(e) => {
                return Err(Error::certificate(format!(
                    "Invalid subjectAltName extension: {}",
                    e
                )));
            }
        };

        Ok(Self {
            serial_number: cert.raw_serial_as_string(),
            signature_algorithm: signature_algorithm_name(
                &cert.signature_algorithm.algorithm.to_id_string(),
            ),
            not_before,
            not_after,
            common_name,
            issuer,
            subject_alt_names,
        })
    }
}

fn asn1_to_utc(timestamp: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .ok_or_else(|| Error::certificate(format!("Validity timestamp out of range: {}", timestamp)))
}

fn general_name_value(name: &GeneralName<'_>) -> Option<String> {
    match name {
        GeneralName::DNSName(dns) => Some(dns.to_string()),
        GeneralName::RFC822Name(email) => Some(email.to_string()),
        GeneralName::URI(uri) => Some(uri.to_string()),
        GeneralName::IPAddress(bytes) => match bytes.len() {
            4 => <[u8; 4]>::try_from(*bytes).ok().map(|b| IpAddr::from(b).to_string()),
            16 => <[u8; 16]>::try_from(*bytes).ok().map(|b| IpAddr::from(b).to_string()),
            _ => None,
        },
        _ => None,
    }
}

fn signature_algorithm_name(oid: &str) -> String {
    let name = match oid {
        "1.2.840.113549.1.1.5" => "sha1WithRSAEncryption",
        "1.2.840.113549.1.1.10" => "rsassaPss",
        "1.2.840.113549.1.1.11" => "sha256WithRSAEncryption",
        "1.2.840.113549.1.1.12" => "sha384WithRSAEncryption",
        "1.2.840.113549.1.1.13" => "sha512WithRSAEncryption",
        "1.2.840.10045.4.3.2" => "ecdsa-with-SHA256",
        "1.2.840.10045.4.3.3" => "ecdsa-with-SHA384",
        "1.2.840.10045.4.3.4" => "ecdsa-with-SHA512",
        "1.3.101.112" => "ED25519",
        other => return other.to_string(),
    };
    name.to_string()
}

/// Reads certificates from live TLS endpoints
pub struct CertificateInspector {
    connector: TlsConnector,
    port: u16,
    timeout: Duration,
}

impl CertificateInspector {
    /// Create an inspector that trusts the Mozilla root program
    pub fn new(config: &InspectConfig) -> Result<Self> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let client_config =
            ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
                .with_safe_default_protocol_versions()
                .map_err(|e| Error::tls(format!("Failed to build TLS client config: {}", e)))?
                .with_root_certificates(roots)
                .with_no_client_auth();

        Ok(Self::with_client_config(Arc::new(client_config), config))
    }

    /// Create an inspector with a caller-supplied rustls client configuration
    pub fn with_client_config(client_config: Arc<ClientConfig>, config: &InspectConfig) -> Self {
        Self {
            connector: TlsConnector::from(client_config),
            port: config.port,
            timeout: config.timeout(),
        }
    }

    /// Read and parse the certificate now served for an issued hostname
    pub async fn inspect(&self, active: &ActiveHostname) -> Result<CertificateInfo> {
        let der = self.fetch_leaf_certificate(active.hostname()).await?;
        let info = CertificateInfo::from_der(&der)?;
        info!(
            "Edge certificate for {}: serial {}, valid until {}",
            active.hostname(),
            info.serial_number,
            info.not_after
        );
        Ok(info)
    }

    async fn fetch_leaf_certificate(&self, host: &str) -> Result<Vec<u8>> {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| Error::invalid_input(format!("Invalid TLS server name {}: {}", host, e)))?;

        debug!("Connecting to {}:{} for certificate inspection", host, self.port);

        let handshake = async {
            let stream = TcpStream::connect((host, self.port)).await?;
            let tls_stream = self
                .connector
                .connect(server_name, stream)
                .await
                .map_err(|e| Error::tls(format!("TLS handshake with {} failed: {}", host, e)))?;
            Ok::<_, Error>(tls_stream)
        };

        let tls_stream = tokio::time::timeout(self.timeout, handshake)
            .await
            .map_err(|_| {
                Error::timeout(format!(
                    "TLS connection to {}:{} did not complete within {:?}",
                    host, self.port, self.timeout
                ))
            })??;

        let (_, connection) = tls_stream.get_ref();
        let leaf = connection
            .peer_certificates()
            .and_then(|certs| certs.first())
            .ok_or_else(|| Error::tls(format!("{} presented no certificate", host)))?;

        Ok(leaf.as_ref().to_vec())
    }
}
