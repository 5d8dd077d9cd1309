//! Batched, bounded-concurrency runner.
//!
//! ```text
//! items ─► Scheduler (batches + start delays)
//!            │ batch 1 ─► [item: done? ─► delay ─► gate ─► handler ─► verify] × n ─► outcomes
//!            │ (batch_interval)
//!            │ batch 2 ─► ...
//! ```
//!
//! Items of one batch interleave cooperatively on the calling task
//! (`FuturesUnordered`, no spawning), so the whole run lives on a single
//! control flow and suspends only at I/O: the start delay, the gate, and
//! whatever the handler awaits. Batches run strictly one after another.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt;
use indicatif::ProgressBar;
use rustc_hash::FxHashSet;
use tokio::time::Instant;

use crate::error::ItemError;
use crate::filter::CompletionFilter;
use crate::gate::ConcurrencyGate;
use crate::item::{Outcome, WorkItem, reason};
use crate::progress::{ProgressContext, SharedProgress};
use crate::report::RunSummary;
use crate::retry::scaled_backoff;
use crate::schedule::{Batch, Scheduler};
use crate::shutdown::Shutdown;

/// Immutable settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Max items inside the gate (calling external services) at once
    pub num_workers: usize,
    /// Items per sequential batch
    pub batch_size: usize,
    /// Pause between consecutive batches
    pub batch_interval: Duration,
    /// Mean of the exponential per-item start delay (zero disables)
    pub delay_scale: Duration,
    /// Consult the completion filter before processing
    pub skip_existing: bool,
    /// Re-check the completion filter after a successful handler call
    pub verify: bool,
    /// Verification checks before giving up (at least one)
    pub verify_attempts: u32,
    /// First verification backoff, doubled per attempt
    pub verify_backoff: Duration,
    /// Fixed seed for start delays (reproducible runs)
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_workers: 10,
            batch_size: 200,
            batch_interval: Duration::from_secs(5),
            delay_scale: Duration::from_secs(10),
            skip_existing: true,
            verify: true,
            verify_attempts: 3,
            verify_backoff: Duration::from_millis(500),
            seed: None,
        }
    }
}

/// What a handler produced for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Produced {
    /// Side effect written; `n` units of sub-work (chunks, hypotheses, files)
    Units(u64),
    /// Nothing to process (empty document, no chunks)
    NoWork(String),
}

/// Per-item side effect: load, call external services, write to the sink.
///
/// Must be safe to re-run for an item: reruns of a pipeline skip items the
/// completion filter confirms, and anything else is processed again.
#[allow(async_fn_in_trait)]
pub trait Handler {
    async fn handle(&self, item: &WorkItem) -> Result<Produced, ItemError>;
}

/// Timing and size of one finished batch
#[derive(Debug, Clone)]
pub struct BatchStats {
    pub seq: usize,
    pub size: usize,
    pub completed: usize,
    pub started: Instant,
    pub elapsed: Duration,
}

/// Everything a run produced.
#[derive(Debug)]
pub struct RunReport {
    /// In completion order
    pub outcomes: Vec<Outcome>,
    /// Distinct items submitted
    pub total: usize,
    pub batches: Vec<BatchStats>,
    pub elapsed: Duration,
    /// Stopped by shutdown before every item started
    pub interrupted: bool,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_outcomes(&self.outcomes, self.total, self.elapsed)
    }
}

/// Drives work items through a handler with bounded concurrency.
pub struct Runner {
    name: String,
    config: RunConfig,
    shutdown: Shutdown,
    progress: SharedProgress,
}

impl Runner {
    pub fn new(name: impl Into<String>, config: RunConfig) -> Self {
        Self {
            name: name.into(),
            config,
            shutdown: Shutdown::new(),
            progress: SharedProgress::new(ProgressContext::hidden()),
        }
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_progress(mut self, progress: SharedProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Process every item, producing one outcome per item that started.
    ///
    /// Never fails: per-item problems become outcomes. Only a shutdown
    /// request leaves items without an outcome (`interrupted = true`).
    pub async fn run<F, H>(&self, items: Vec<WorkItem>, filter: &F, handler: &H) -> RunReport
    where
        F: CompletionFilter,
        H: Handler,
    {
        let start = Instant::now();
        let items = dedup(items);
        let total = items.len();

        let gate = ConcurrencyGate::new(self.config.num_workers);
        let scheduler = Scheduler::new(
            self.config.batch_size,
            self.config.delay_scale,
            self.config.seed,
        );
        let batches = scheduler.partition(items);
        let n_batches = batches.len();

        log::info!(
            "{}: {total} items, {n_batches} batches, {} workers",
            self.name,
            gate.capacity()
        );

        let pb = self.progress.run_bar(&self.name, total);
        let (outcomes, batch_stats) = tokio::select! {
            done = self.run_batches(batches, total, &pb, &gate, filter, handler) => done,
            never = self.shutdown.relay() => match never {},
        };

        pb.finish_and_clear();
        let interrupted = outcomes.len() < total;
        if interrupted {
            log::warn!(
                "{}: interrupted, {} of {total} items not started",
                self.name,
                total - outcomes.len()
            );
        }

        RunReport {
            outcomes,
            total,
            batches: batch_stats,
            elapsed: start.elapsed(),
            interrupted,
        }
    }

    /// Batches strictly in sequence; stops at a batch boundary on shutdown.
    async fn run_batches<F, H>(
        &self,
        batches: Vec<Batch>,
        total: usize,
        pb: &ProgressBar,
        gate: &ConcurrencyGate,
        filter: &F,
        handler: &H,
    ) -> (Vec<Outcome>, Vec<BatchStats>)
    where
        F: CompletionFilter,
        H: Handler,
    {
        let n_batches = batches.len();
        let mut outcomes: Vec<Outcome> = Vec::with_capacity(total);
        let mut batch_stats = Vec::with_capacity(n_batches);

        for batch in batches {
            if batch.seq > 1 && !self.config.batch_interval.is_zero() {
                log::debug!(
                    "{}: pausing {:.1}s before batch {}",
                    self.name,
                    self.config.batch_interval.as_secs_f64(),
                    batch.seq
                );
                tokio::select! {
                    () = tokio::time::sleep(self.config.batch_interval) => {}
                    () = self.shutdown.requested() => {}
                }
            }
            if self.shutdown.is_requested() {
                log::warn!("{}: shutdown requested, not starting batch {}", self.name, batch.seq);
                break;
            }

            let size = batch.len();
            log::info!("{}: batch {}/{n_batches} ({size} items)", self.name, batch.seq);
            let batch_start = Instant::now();
            let before = outcomes.len();

            let mut in_flight: FuturesUnordered<_> = batch
                .items
                .into_iter()
                .map(|(item, delay)| self.process_item(item, delay, gate, filter, handler))
                .collect();

            while let Some(outcome) = in_flight.next().await {
                if let Some(outcome) = outcome {
                    self.record_progress(pb, &outcome, outcomes.len() + 1, total);
                    outcomes.push(outcome);
                }
            }

            batch_stats.push(BatchStats {
                seq: batch.seq,
                size,
                completed: outcomes.len() - before,
                started: batch_start,
                elapsed: batch_start.elapsed(),
            });
        }
        (outcomes, batch_stats)
    }

    /// Full path of one item. `None` only when shutdown stopped it before its handler.
    async fn process_item<F, H>(
        &self,
        item: WorkItem,
        delay: Duration,
        gate: &ConcurrencyGate,
        filter: &F,
        handler: &H,
    ) -> Option<Outcome>
    where
        F: CompletionFilter,
        H: Handler,
    {
        if self.shutdown.is_requested() {
            return None;
        }

        if self.config.skip_existing {
            match filter.is_done(&item).await {
                Ok(true) => return Some(Outcome::skipped(item)),
                Ok(false) => {}
                Err(e) => log::warn!("{item}: completion check failed, processing anyway: {e}"),
            }
        }

        if !delay.is_zero() {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown.requested() => return None,
            }
        }

        let _permit = tokio::select! {
            permit = gate.acquire() => permit,
            () = self.shutdown.requested() => return None,
        };
        if self.shutdown.is_requested() {
            return None;
        }

        let result = AssertUnwindSafe(handler.handle(&item)).catch_unwind().await;
        let outcome = match result {
            Ok(Ok(Produced::Units(count))) => {
                if self.config.verify && !self.verify(&item, filter).await {
                    log::warn!("{item}: handler succeeded but sink has no record");
                    Outcome::failed(item, reason::VERIFICATION_FAILED)
                } else {
                    Outcome::success(item, count)
                }
            }
            Ok(Ok(Produced::NoWork(why))) => {
                log::info!("{item}: nothing to process ({why})");
                Outcome::failed(item, why)
            }
            Ok(Err(e)) => {
                log::warn!("{item}: {e}");
                Outcome::errored(item, e.to_string())
            }
            Err(payload) => {
                let e = ItemError::Panic(panic_message(payload.as_ref()));
                log::error!("{item}: {e}");
                Outcome::errored(item, e.to_string())
            }
        };
        Some(outcome)
    }

    /// Re-query the sink, backing off between attempts for sinks that lag their writes.
    async fn verify<F: CompletionFilter>(&self, item: &WorkItem, filter: &F) -> bool {
        let attempts = self.config.verify_attempts.max(1);
        for attempt in 1..=attempts {
            match filter.is_done(item).await {
                Ok(true) => return true,
                Ok(false) => log::debug!("{item}: verification {attempt}/{attempts}: not found"),
                Err(e) => log::debug!("{item}: verification {attempt}/{attempts}: {e}"),
            }
            if attempt < attempts {
                tokio::time::sleep(scaled_backoff(self.config.verify_backoff, attempt)).await;
            }
        }
        false
    }

    fn record_progress(&self, pb: &ProgressBar, outcome: &Outcome, done: usize, total: usize) {
        pb.inc(1);
        pb.set_message(format!("{} {}", outcome.item, outcome.status));
        if !self.progress.is_tty() {
            log::info!(
                "{} [{done}/{total}] {}: {} ({})",
                self.name,
                outcome.item,
                outcome.status,
                outcome.reason
            );
        }
    }
}

/// Drop repeated ids, keeping first occurrence, so each id yields one outcome.
fn dedup(items: Vec<WorkItem>) -> Vec<WorkItem> {
    let mut seen = FxHashSet::default();
    let before = items.len();
    let items: Vec<WorkItem> = items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect();
    if items.len() < before {
        log::warn!("ignoring {} duplicate work items", before - items.len());
    }
    items
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::NeverDone;
    use crate::item::Status;

    struct Count(u64);

    impl Handler for Count {
        async fn handle(&self, _item: &WorkItem) -> Result<Produced, ItemError> {
            Ok(Produced::Units(self.0))
        }
    }

    struct Panics;

    impl Handler for Panics {
        async fn handle(&self, item: &WorkItem) -> Result<Produced, ItemError> {
            if item.as_str() == "2" {
                panic!("boom on {item}");
            }
            Ok(Produced::Units(1))
        }
    }

    struct Empty;

    impl Handler for Empty {
        async fn handle(&self, _item: &WorkItem) -> Result<Produced, ItemError> {
            Ok(Produced::NoWork("no_docs".to_string()))
        }
    }

    fn quick() -> RunConfig {
        RunConfig {
            batch_interval: Duration::ZERO,
            delay_scale: Duration::ZERO,
            verify: false,
            ..RunConfig::default()
        }
    }

    fn items(ids: &[&str]) -> Vec<WorkItem> {
        ids.iter().copied().map(WorkItem::from).collect()
    }

    #[tokio::test]
    async fn empty_input() {
        let report = Runner::new("t", quick()).run(Vec::new(), &NeverDone, &Count(1)).await;
        assert!(report.outcomes.is_empty());
        assert!(report.batches.is_empty());
        assert!(!report.interrupted);
    }

    #[tokio::test]
    async fn duplicates_yield_one_outcome() {
        let report = Runner::new("t", quick())
            .run(items(&["1", "1", "2"]), &NeverDone, &Count(1))
            .await;
        assert_eq!(report.total, 2);
        assert_eq!(report.outcomes.len(), 2);
    }

    #[tokio::test]
    async fn panic_is_isolated() {
        let report = Runner::new("t", quick())
            .run(items(&["1", "2", "3"]), &NeverDone, &Panics)
            .await;
        assert_eq!(report.outcomes.len(), 3);
        let panicked = report
            .outcomes
            .iter()
            .find(|o| o.item.as_str() == "2")
            .unwrap();
        assert_eq!(panicked.status, Status::Errored);
        assert!(panicked.reason.contains("boom on 2"));
    }

    #[tokio::test]
    async fn no_work_is_failed_with_reason() {
        let report = Runner::new("t", quick())
            .run(items(&["1"]), &NeverDone, &Empty)
            .await;
        assert_eq!(report.outcomes[0].status, Status::Failed);
        assert_eq!(report.outcomes[0].reason, "no_docs");
    }

    #[tokio::test(start_paused = true)]
    async fn verification_against_empty_sink_fails() {
        let config = RunConfig {
            verify: true,
            verify_attempts: 2,
            ..quick()
        };
        let report = Runner::new("t", config)
            .run(items(&["1"]), &NeverDone, &Count(4))
            .await;
        assert_eq!(report.outcomes[0].status, Status::Failed);
        assert_eq!(report.outcomes[0].reason, "verification_failed");
        assert_eq!(report.outcomes[0].count, 0);
    }

    #[tokio::test]
    async fn shutdown_before_run_starts_nothing() {
        let shutdown = Shutdown::new();
        shutdown.request();
        let report = Runner::new("t", quick())
            .with_shutdown(shutdown)
            .run(items(&["1", "2"]), &NeverDone, &Count(1))
            .await;
        assert!(report.outcomes.is_empty());
        assert!(report.interrupted);
        assert_eq!(report.summary().cancelled, 2);
    }

    #[test]
    fn panic_message_variants() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let s: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(s.as_ref()), "owned");
        let s: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(s.as_ref()), "unknown panic");
    }
}
