use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing_subscriber::EnvFilter;

pub mod batch;
pub mod config;
pub mod http_probe;
pub mod reporter;
pub mod scheduler;
#[cfg(test)]
mod test_support;

use batch::BatchRunner;
use config::{load_config, setup_http_client, setup_resolver, setup_tls_connector};
use http_probe::prelude::*;
use reporter::LineReporter;
use scheduler::{IntervalTicker, Scheduler};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok()))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config().context("Failed to load configuration")?;

    let client = setup_http_client(config.request_timeout(), config.accept_invalid_certs)
        .context("Failed to create HTTP client")?;
    let connector = setup_tls_connector(config.accept_invalid_certs)
        .context("Failed to build TLS connector")?;
    let resolver = setup_resolver(&config.dns_hosts).context("Failed to set up DNS resolver")?;

    if config.accept_invalid_certs {
        log::info!("Certificate trust is not verified; certificates are only inspected for expiry");
    }
    match config.max_concurrency {
        Some(limit) => log::info!("Running at most {limit} checks at once"),
        None => log::info!("Running all {} checks concurrently", config.targets.len()),
    }

    let checker = Arc::new(TargetChecker::new(
        client,
        connector,
        resolver,
        config.request_timeout(),
    ));
    let runner = BatchRunner::new(
        checker,
        Arc::new(LineReporter::stdout()),
        config.max_concurrency,
    );
    let scheduler = Scheduler::new(
        runner,
        config.targets.clone(),
        config.expiry_threshold(),
        IntervalTicker::new(config.polling_interval()),
    );

    log::info!("Starting website health monitoring...");

    tokio::select! {
        _ = scheduler.run() => {}
        res = signal::ctrl_c() => {
            res.context("Failed to listen for shutdown signal")?;
            log::info!("Shutdown signal received, stopping monitor");
        }
    }

    Ok(())
}

/// `RUST_LOG` when it parses, `info` otherwise.
fn log_filter(rust_log: Option<String>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
