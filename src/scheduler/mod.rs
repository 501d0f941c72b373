use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::{Interval, MissedTickBehavior};

use crate::batch::BatchRunner;
use crate::http_probe::prelude::Outcome;

/// Source of scheduling triggers.
pub trait Ticker: Send {
    /// Waits for the next trigger and returns its sequence number, starting
    /// at 0. `None` means no more triggers will follow.
    fn tick(&mut self) -> impl Future<Output = Option<u64>> + Send;
}

/// Fires immediately, then once every period. Triggers missed while a batch
/// was still running collapse into a single one.
pub struct IntervalTicker {
    interval: Interval,
    count: u64,
}

impl IntervalTicker {
    /// Must be called within a tokio runtime. Panics if `period` is zero.
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval, count: 0 }
    }
}

impl Ticker for IntervalTicker {
    fn tick(&mut self) -> impl Future<Output = Option<u64>> + Send {
        async move {
            self.interval.tick().await;
            let tick = self.count;
            self.count += 1;
            Some(tick)
        }
    }
}

/// Runs the whole target list on every trigger of its ticker. Batches never
/// overlap: the next trigger is only awaited once the current batch is done.
pub struct Scheduler<T> {
    runner: BatchRunner,
    targets: Vec<String>,
    threshold: Duration,
    ticker: T,
}

impl<T: Ticker> Scheduler<T> {
    pub fn new(runner: BatchRunner, targets: Vec<String>, threshold: Duration, ticker: T) -> Self {
        Self {
            runner,
            targets,
            threshold,
            ticker,
        }
    }

    /// Loops until the ticker is exhausted, which an `IntervalTicker` never is.
    /// Returns the number of batches run.
    pub async fn run(mut self) -> u64 {
        let mut batches = 0;

        while let Some(tick) = self.ticker.tick().await {
            if tick > 0 {
                log::info!("Performing scheduled check #{tick}...");
            }

            let started = Instant::now();
            let reports = self.runner.run_all(&self.targets, self.threshold).await;
            let failed = reports.iter().filter(|r| r.outcome.is_failed()).count();
            let partial = reports
                .iter()
                .filter(|r| matches!(r.outcome, Outcome::Partial { .. }))
                .count();
            let expiring = reports
                .iter()
                .filter_map(|r| r.outcome.result())
                .filter(|result| result.ssl_expiry_warning)
                .count();

            log::info!(
                "Check #{tick} completed {} targets in {:.2}s ({failed} unreachable, {partial} certificate probe failures)",
                reports.len(),
                started.elapsed().as_secs_f64()
            );
            if expiring > 0 {
                log::warn!("{expiring} certificates expire within the warning threshold");
            }
            batches += 1;
        }

        log::info!("Ticker exhausted after {batches} batches, stopping scheduler");
        batches
    }
}
