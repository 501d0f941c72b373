use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use trust_dns_resolver::error::ResolveError;

/// Failure of the HTTP half of a check. No `CheckResult` exists when one of
/// these is returned.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("invalid target url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("connectivity error: {0}")]
    Connectivity(#[from] reqwest::Error),

    #[error("check task aborted: {0}")]
    Aborted(String),
}

/// Failure of the certificate probe that follows a successful HTTP probe.
#[derive(Error, Debug)]
pub enum CertificateError {
    #[error("url has no host to dial")]
    MissingHost,

    #[error("could not resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: ResolveError,
    },

    #[error("no address found for {0}")]
    NoAddress(String),

    #[error("tcp connect to {addr} failed: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("tls handshake with {host} failed: {source}")]
    Handshake {
        host: String,
        #[source]
        source: native_tls::Error,
    },

    #[error("certificate probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not parse peer certificate: {0}")]
    Parse(String),
}
