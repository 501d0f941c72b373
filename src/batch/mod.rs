use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio::task::JoinError;

use crate::http_probe::prelude::*;
use crate::reporter::Reporter;

/// The outcome of one target within a batch.
#[derive(Debug)]
pub struct TargetReport {
    pub url: String,
    pub outcome: Outcome,
}

/// Runs one check per target concurrently and waits for all of them.
pub struct BatchRunner {
    checker: Arc<TargetChecker>,
    reporter: Arc<dyn Reporter>,
    concurrency_limiter: Option<Arc<Semaphore>>,
}

impl BatchRunner {
    /// `max_concurrency` of `None` spawns every check at once.
    pub fn new(
        checker: Arc<TargetChecker>,
        reporter: Arc<dyn Reporter>,
        max_concurrency: Option<usize>,
    ) -> Self {
        Self {
            checker,
            reporter,
            concurrency_limiter: max_concurrency.map(|n| Arc::new(Semaphore::new(n))),
        }
    }

    /// Checks every url and returns exactly one report per url, in
    /// completion order. Each outcome is handed to the reporter as soon as
    /// its check finishes.
    pub async fn run_all(&self, urls: &[String], threshold: Duration) -> Vec<TargetReport> {
        let mut tasks = FuturesUnordered::new();

        for url in urls {
            let checker = Arc::clone(&self.checker);
            let limiter = self.concurrency_limiter.clone();
            let target = url.clone();

            let handle = tokio::spawn(async move {
                let _permit = match limiter {
                    Some(limiter) => limiter.acquire_owned().await.ok(),
                    None => None,
                };
                checker.check(&target, threshold).await
            });

            let url = url.clone();
            tasks.push(async move {
                let outcome = joined_outcome(handle.await);
                TargetReport { url, outcome }
            });
        }

        let mut reports = Vec::with_capacity(tasks.len());
        while let Some(report) = tasks.next().await {
            self.reporter.report(&report.url, &report.outcome);
            reports.push(report);
        }
        reports
    }
}

/// A check task that panicked or was cancelled still yields an outcome.
fn joined_outcome(joined: Result<Outcome, JoinError>) -> Outcome {
    joined.unwrap_or_else(|e| Outcome::Failed(CheckError::Aborted(e.to_string())))
}
