use std::env;
use std::{net::IpAddr, time::Duration};

use reqwest::Client;
use tokio_native_tls::TlsConnector as TokioTlsConnector;
use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig, ResolverOpts},
};

use super::monitor_config::{ConfigError, MonitorConfig};

const USER_AGENT: &str = concat!("sitewatch/", env!("CARGO_PKG_VERSION"));

/// Load the monitor configuration.
/// The YAML file is taken from the `CONFIG_FILE` environment variable (default `config.yml`).
/// A comma separated `DNS_HOSTS` environment variable replaces the `dns_hosts` of the file.
pub fn load_config() -> Result<MonitorConfig, ConfigError> {
    let config_file_location =
        env::var("CONFIG_FILE").unwrap_or_else(|_| "config.yml".to_string());
    let dns_hosts = env::var("DNS_HOSTS").ok();

    load_config_from(&config_file_location, dns_hosts.as_deref())
}

pub fn load_config_from(
    path: &str,
    dns_hosts_override: Option<&str>,
) -> Result<MonitorConfig, ConfigError> {
    let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })?;

    let mut config: MonitorConfig = serde_yaml::from_str(&config_str)?;

    if let Some(dns_hosts) = dns_hosts_override {
        config.dns_hosts = dns_hosts
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }

    config.validate()?;

    log::info!(
        "Loaded {} targets from {path}, polling every {}s",
        config.targets.len(),
        config.polling_interval_seconds
    );
    Ok(config)
}

/// Setup the HTTP client used for the reachability probe.
pub fn setup_http_client(timeout: Duration, accept_invalid_certs: bool) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .user_agent(USER_AGENT)
        .build()
}

/// Setup the TLS connector used to read peer certificates.
/// With `accept_invalid_certs` it accepts any certificate and host name.
pub fn setup_tls_connector(accept_invalid_certs: bool) -> Result<TokioTlsConnector, native_tls::Error> {
    let mut builder = native_tls::TlsConnector::builder();
    builder.danger_accept_invalid_certs(accept_invalid_certs);
    builder.danger_accept_invalid_hostnames(accept_invalid_certs);
    let connector = builder.build()?;
    Ok(TokioTlsConnector::from(connector))
}

/// Setup a DNS resolver using the provided DNS hosts
/// Without DNS hosts the system configuration is used, falling back to the
/// resolver defaults when it cannot be read.
/// # Arguments
///     * `dns_hosts` - A slice of strings representing DNS host IPs (e.g., "1.1.1.1")
/// # Returns
///     A `Result` containing a `TokioAsyncResolver`, or an error if a host is not an IP address.
pub fn setup_resolver(dns_hosts: &[String]) -> Result<TokioAsyncResolver, ConfigError> {
    let mut opts = ResolverOpts::default();
    opts.attempts = 2;
    opts.timeout = Duration::from_millis(500);
    opts.cache_size = 1024;

    if dns_hosts.is_empty() {
        return Ok(TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            log::warn!("Could not read system DNS configuration ({e}), using defaults");
            TokioAsyncResolver::tokio(ResolverConfig::default(), opts)
        }));
    }

    let mut name_servers = NameServerConfigGroup::new();

    for host in dns_hosts {
        let ip: IpAddr = host
            .parse()
            .map_err(|_| ConfigError::InvalidDnsHost(host.clone()))?;
        name_servers.push(NameServerConfig {
            socket_addr: (ip, 53).into(),
            protocol: Protocol::Tcp,
            tls_dns_name: None,
            trust_negative_responses: false,
            bind_addr: None,
        });
    }

    log::info!("Using DNS hosts: {:?}", dns_hosts);

    let resolver_config = ResolverConfig::from_parts(None, vec![], name_servers);
    Ok(TokioAsyncResolver::tokio(resolver_config, opts))
}
