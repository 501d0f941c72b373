use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::net::TcpStream;
use tokio_native_tls::TlsConnector as TokioTlsConnector;
use trust_dns_resolver::TokioAsyncResolver;
use url::{Host, Url};
use x509_parser::parse_x509_certificate;

use super::error::CertificateError;

const HTTPS_PORT: u16 = 443;

async fn resolve(domain: &str, resolver: &TokioAsyncResolver) -> Result<IpAddr, CertificateError> {
    let lookup = resolver
        .lookup_ip(domain)
        .await
        .map_err(|source| CertificateError::Resolve {
            host: domain.to_string(),
            source,
        })?;
    lookup
        .iter()
        .next()
        .ok_or_else(|| CertificateError::NoAddress(domain.to_string()))
}

/// Opens a fresh TLS connection to the host of `url` and returns the
/// `NotAfter` of the leaf certificate, or `None` if the peer presented none.
///
/// Trust is decided by `connector`; with the default configuration it
/// accepts any certificate, since only the metadata is of interest here.
pub async fn fetch_leaf_expiration(
    url: &Url,
    connector: &TokioTlsConnector,
    resolver: &TokioAsyncResolver,
) -> Result<Option<DateTime<Utc>>, CertificateError> {
    let host = url.host().ok_or(CertificateError::MissingHost)?;
    let port = url.port_or_known_default().unwrap_or(HTTPS_PORT);

    let (ip, domain) = match host {
        Host::Ipv4(ip) => (IpAddr::V4(ip), ip.to_string()),
        Host::Ipv6(ip) => (IpAddr::V6(ip), ip.to_string()),
        Host::Domain(domain) => (resolve(domain, resolver).await?, domain.to_string()),
    };
    let addr = SocketAddr::new(ip, port);

    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| CertificateError::Connect { addr, source })?;

    let tls_stream = connector
        .connect(&domain, stream)
        .await
        .map_err(|source| CertificateError::Handshake {
            host: domain.clone(),
            source,
        })?;

    let leaf = tls_stream
        .get_ref()
        .peer_certificate()
        .map_err(|source| CertificateError::Handshake {
            host: domain.clone(),
            source,
        })?;

    if leaf.is_none() {
        log::debug!("{domain} completed the handshake without presenting a certificate");
    }
    presented_expiration(leaf)
}

/// `NotAfter` of the presented leaf, or `None` when the peer sent no certificate.
fn presented_expiration(
    leaf: Option<native_tls::Certificate>,
) -> Result<Option<DateTime<Utc>>, CertificateError> {
    let Some(leaf) = leaf else {
        return Ok(None);
    };

    let der = leaf
        .to_der()
        .map_err(|e| CertificateError::Parse(e.to_string()))?;
    leaf_not_after(&der).map(Some)
}

/// Reads `NotAfter` from a DER encoded X.509 certificate.
pub fn leaf_not_after(der: &[u8]) -> Result<DateTime<Utc>, CertificateError> {
    let (_, parsed) =
        parse_x509_certificate(der).map_err(|e| CertificateError::Parse(e.to_string()))?;

    let not_after = parsed.validity().not_after.timestamp();
    DateTime::from_timestamp(not_after, 0)
        .ok_or_else(|| CertificateError::Parse(format!("expiry {not_after} is out of range")))
}

/// A certificate expires soon when strictly less than `threshold` is left.
pub fn expires_soon(not_after: DateTime<Utc>, now: DateTime<Utc>, threshold: TimeDelta) -> bool {
    not_after - now < threshold
}

/// Thresholds too large for chrono saturate, which flags every certificate.
pub fn threshold_delta(threshold: Duration) -> TimeDelta {
    TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX)
}
