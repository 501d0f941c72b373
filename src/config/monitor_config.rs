use std::net::IpAddr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Configuration of the monitor, read once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Absolute URLs of the targets to probe on every tick.
    pub targets: Vec<String>,

    /// Seconds between two ticks. Defaults to 60.
    #[serde(default = "default_polling_interval")]
    pub polling_interval_seconds: u64,

    /// Timeout of the HTTP request, also applied to the certificate probe.
    /// Defaults to 10.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Certificates expiring within this many days raise a warning.
    /// Defaults to 30.
    #[serde(default = "default_expiry_threshold")]
    pub ssl_expiry_threshold_days: u64,

    /// Accept any certificate, both for the HTTP request and for the
    /// certificate probe. Defaults to true; set to false to verify trust.
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,

    /// Upper bound on checks in flight. Unbounded when absent.
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Name servers used to resolve hosts for the certificate probe.
    /// The system resolver is used when empty.
    #[serde(default)]
    pub dns_hosts: Vec<String>,
}

fn default_polling_interval() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    10
}

fn default_expiry_threshold() -> u64 {
    30
}

fn default_accept_invalid_certs() -> bool {
    true
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("target {url:?} is not an absolute URL: {source}")]
    InvalidTarget {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("DNS host {0:?} is not an IP address")]
    InvalidDnsHost(String),
}

impl MonitorConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling_interval_seconds == 0 {
            return Err(ConfigError::Zero("polling_interval_seconds"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::Zero("request_timeout_seconds"));
        }
        if self.max_concurrency == Some(0) {
            return Err(ConfigError::Zero("max_concurrency"));
        }
        for url in &self.targets {
            Url::parse(url).map_err(|source| ConfigError::InvalidTarget {
                url: url.clone(),
                source,
            })?;
        }
        for host in &self.dns_hosts {
            host.parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidDnsHost(host.clone()))?;
        }
        Ok(())
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn expiry_threshold(&self) -> Duration {
        Duration::from_secs(self.ssl_expiry_threshold_days.saturating_mul(SECONDS_PER_DAY))
    }
}
