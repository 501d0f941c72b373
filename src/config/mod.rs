pub mod app_config;
pub mod monitor_config;

pub use app_config::{load_config, setup_http_client, setup_resolver, setup_tls_connector};
