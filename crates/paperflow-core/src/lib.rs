//! Paperflow Core - batched, resumable task runner for paper pipelines
//!
//! Every pipeline stage (PDF conversion, metadata extraction, embedding)
//! enumerates work items, skips the ones already recorded in a sink, and
//! drives the rest through slow external services with bounded concurrency.
//! This crate provides those shared pieces.

pub mod error;
pub mod filter;
pub mod gate;
pub mod http;
pub mod item;
pub mod logging;
pub mod progress;
pub mod report;
pub mod retry;
pub mod runner;
pub mod schedule;
pub mod shutdown;
pub mod source;

// Re-exports for convenience
pub use error::ItemError;
pub use filter::{CompletionFilter, FileExists, NeverDone};
pub use gate::{ConcurrencyGate, GatePermit};
pub use http::{HttpError, error_for_status, http_client};
pub use item::{Outcome, Status, WorkItem};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress};
pub use report::RunSummary;
pub use retry::retry_with_backoff;
pub use runner::{Handler, Produced, RunConfig, RunReport, Runner};
pub use schedule::{Batch, Scheduler};
pub use shutdown::Shutdown;
pub use source::{list_files, list_subdirs};
