use std::io::{self, Write};
use std::sync::Mutex;

use crate::http_probe::error_chain;
use crate::http_probe::prelude::*;

/// Receives the outcome of every check, once per target per tick.
pub trait Reporter: Send + Sync {
    fn report(&self, url: &str, outcome: &Outcome);
}

/// Writes human readable lines to a sink. Write failures are logged and
/// otherwise ignored so a broken sink never stops a batch.
pub struct LineReporter<W> {
    sink: Mutex<W>,
}

impl LineReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> LineReporter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.sink
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> Reporter for LineReporter<W> {
    fn report(&self, url: &str, outcome: &Outcome) {
        let text = render(url, outcome);
        let mut sink = self
            .sink
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = sink.write_all(text.as_bytes()).and_then(|_| sink.flush()) {
            log::warn!("Failed to write report for {url}: {e}");
        }
    }
}

/// Renders one outcome as newline terminated report lines.
pub fn render(url: &str, outcome: &Outcome) -> String {
    match outcome {
        Outcome::Complete(result) => render_result(result),
        Outcome::Partial { result, error } => {
            let mut text = render_result(result);
            text.push_str(&format!(" Certificate check failed: {}\n", error_chain(error)));
            text
        }
        Outcome::Failed(error) => format!("Error checking {url}: {}\n", error_chain(error)),
    }
}

fn render_result(result: &CheckResult) -> String {
    let mut text = format!(
        "URL: {} | Status Code: {} | Response Time: {:?}\n",
        result.url, result.status_code, result.response_time
    );
    if let Some(expiration) = result.ssl_expiration {
        text.push_str(&format!(
            " SSL Certificate expires on: {}\n",
            expiration.format("%Y-%m-%d")
        ));
        if result.ssl_expiry_warning {
            text.push_str(" WARNING: SSL certificate expires soon!\n");
        }
    }
    text
}
