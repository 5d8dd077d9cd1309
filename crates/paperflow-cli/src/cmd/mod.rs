//! Subcommands

pub mod catalog;
pub mod convert;
pub mod embed;
pub mod extract;
pub mod search;

use anyhow::{Context, Result};
use clap::Args;
use paperflow_core::{RunConfig, RunReport, SharedProgress, WorkItem};

use crate::config::{RunnerSection, secs};

/// How a stage run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageExit {
    /// Every item has an outcome (failures included)
    Complete,
    /// Shutdown stopped the run before every item started
    Interrupted,
}

/// Runner flags shared by every batch stage (override the config file)
#[derive(Args, Debug, Default)]
pub struct RunnerArgs {
    /// Max items calling external services at once
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Items per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Seconds to pause between batches
    #[arg(long)]
    pub batch_interval: Option<f64>,

    /// Mean per-item start delay in seconds (0 disables)
    #[arg(long)]
    pub delay_scale: Option<f64>,

    /// Process items even if already recorded in the sink
    #[arg(long)]
    pub no_skip: bool,

    /// Don't re-check the sink after a successful item
    #[arg(long)]
    pub no_verify: bool,

    /// Seed for start delays (reproducible schedules)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Only these item ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Process at most this many items
    #[arg(short = 'l', long)]
    pub limit: Option<usize>,
}

impl RunnerArgs {
    /// Stage defaults, then config file, then flags.
    pub fn run_config(&self, defaults: RunConfig, file: &RunnerSection) -> Result<RunConfig> {
        let mut cfg = file.apply(defaults)?;
        if let Some(n) = self.workers {
            cfg.num_workers = n;
        }
        if let Some(n) = self.batch_size {
            cfg.batch_size = n;
        }
        if let Some(s) = self.batch_interval {
            cfg.batch_interval = secs("--batch-interval", s)?;
        }
        if let Some(s) = self.delay_scale {
            cfg.delay_scale = secs("--delay-scale", s)?;
        }
        if self.no_skip {
            cfg.skip_existing = false;
        }
        if self.no_verify {
            cfg.verify = false;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        Ok(cfg)
    }

    /// Narrow the enumerated items to `--only` and `--limit`.
    pub fn select(&self, mut items: Vec<WorkItem>) -> Vec<WorkItem> {
        if !self.only.is_empty() {
            items.retain(|i| self.only.iter().any(|o| o == i.as_str()));
        }
        if let Some(n) = self.limit {
            items.truncate(n);
        }
        items
    }
}

/// Single-threaded runtime the batch stages run on
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")
}

/// Print (TTY) or log the end-of-run summary.
pub fn finish(report: &RunReport, title: &str, unit: &str, progress: &SharedProgress) -> StageExit {
    let summary = report.summary();
    if progress.is_tty() {
        progress.println(summary.format_table(title, unit));
    } else {
        summary.log(title, unit);
    }
    if report.interrupted {
        StageExit::Interrupted
    } else {
        StageExit::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn flags_override_file_and_defaults() {
        let file = RunnerSection {
            workers: Some(4),
            batch_size: Some(50),
            ..RunnerSection::default()
        };
        let args = RunnerArgs {
            workers: Some(2),
            delay_scale: Some(0.0),
            no_verify: true,
            ..RunnerArgs::default()
        };
        let cfg = args.run_config(RunConfig::default(), &file).unwrap();
        assert_eq!(cfg.num_workers, 2);
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.delay_scale, Duration::ZERO);
        assert!(!cfg.verify);
        assert!(cfg.skip_existing);
    }

    #[test]
    fn select_only_then_limit() {
        let items: Vec<WorkItem> = (1..=10i64).map(WorkItem::from).collect();
        let args = RunnerArgs {
            only: vec!["3".into(), "5".into(), "9".into()],
            limit: Some(2),
            ..RunnerArgs::default()
        };
        let picked: Vec<String> = args.select(items).iter().map(|i| i.to_string()).collect();
        assert_eq!(picked, ["3", "5"]);
    }
}
