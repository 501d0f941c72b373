use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio_native_tls::TlsConnector as TokioTlsConnector;
use trust_dns_resolver::TokioAsyncResolver;
use url::Url;

use super::certificate::{expires_soon, fetch_leaf_expiration, threshold_delta};
use super::prelude::*;

/// Probes one target: an HTTP GET, followed for https targets by a separate
/// TLS handshake that reads the leaf certificate.
pub struct TargetChecker {
    client: Client,
    connector: TokioTlsConnector,
    resolver: TokioAsyncResolver,
    request_timeout: Duration,
}

impl TargetChecker {
    /// `request_timeout` should match the timeout `client` was built with; it
    /// also bounds the certificate probe.
    pub fn new(
        client: Client,
        connector: TokioTlsConnector,
        resolver: TokioAsyncResolver,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client,
            connector,
            resolver,
            request_timeout,
        }
    }

    pub async fn check(&self, url: &str, threshold: Duration) -> Outcome {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(source) => {
                return Outcome::Failed(CheckError::InvalidUrl {
                    url: url.to_string(),
                    source,
                });
            }
        };

        let start = Instant::now();
        let response = match self.client.get(parsed).send().await {
            Ok(response) => response,
            Err(e) => {
                log::debug!("HTTP probe of {url} failed: {e}");
                return Outcome::Failed(CheckError::Connectivity(e));
            }
        };
        let response_time = start.elapsed();

        let mut result = CheckResult {
            url: url.to_string(),
            response_time,
            status_code: response.status().as_u16(),
            http_version: format_http_version(response.version()),
            ssl_expiration: None,
            ssl_expiry_warning: false,
        };
        log::debug!(
            "{url} answered {} over {} in {:?}",
            result.status_code,
            result.http_version,
            result.response_time
        );

        // Redirects may have changed the scheme, so look at where we ended up.
        let final_url = response.url().clone();
        drop(response);

        if final_url.scheme() != "https" {
            return Outcome::Complete(result);
        }

        match self.probe_certificate(&final_url).await {
            Ok(Some(not_after)) => {
                result.ssl_expiration = Some(not_after);
                result.ssl_expiry_warning =
                    expires_soon(not_after, Utc::now(), threshold_delta(threshold));
                Outcome::Complete(result)
            }
            Ok(None) => Outcome::Complete(result),
            Err(error) => {
                log::debug!("certificate probe of {final_url} failed: {error}");
                Outcome::Partial { result, error }
            }
        }
    }

    async fn probe_certificate(&self, url: &Url) -> Result<Option<DateTime<Utc>>, CertificateError> {
        tokio::time::timeout(
            self.request_timeout,
            fetch_leaf_expiration(url, &self.connector, &self.resolver),
        )
        .await
        .map_err(|_| CertificateError::Timeout(self.request_timeout))?
    }
}
