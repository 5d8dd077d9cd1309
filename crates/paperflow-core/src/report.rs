//! Aggregation and reporting of run outcomes.
//!
//! Summary is computed once, after the run, from the complete outcome list:
//! counts per status, units produced by successful items, and the
//! `(item, reason)` detail of everything that went wrong.

use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::item::{Outcome, Status, WorkItem};
use crate::progress::fmt_num;

/// Immutable end-of-run summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Items submitted to the run
    pub total: usize,
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errored: usize,
    /// Items never started because of shutdown
    pub cancelled: usize,
    /// Sum of `count` over successful outcomes
    pub total_count: u64,
    /// `(item, message)` for every `error` outcome
    pub errors: Vec<(WorkItem, String)>,
    /// `(item, reason)` for every `failed` outcome
    pub failures: Vec<(WorkItem, String)>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[Outcome], total: usize, elapsed: Duration) -> Self {
        let mut summary = Self {
            total,
            cancelled: total.saturating_sub(outcomes.len()),
            elapsed,
            ..Default::default()
        };
        for o in outcomes {
            match o.status {
                Status::Success => {
                    summary.success += 1;
                    summary.total_count += o.count;
                }
                Status::Skipped => summary.skipped += 1,
                Status::Failed => {
                    summary.failed += 1;
                    summary.failures.push((o.item.clone(), o.reason.clone()));
                }
                Status::Errored => {
                    summary.errored += 1;
                    summary.errors.push((o.item.clone(), o.reason.clone()));
                }
            }
        }
        summary.errors.sort_by(|a, b| a.0.cmp(&b.0));
        summary.failures.sort_by(|a, b| a.0.cmp(&b.0));
        summary
    }

    /// Count for one status
    pub fn count(&self, status: Status) -> usize {
        match status {
            Status::Success => self.success,
            Status::Skipped => self.skipped,
            Status::Failed => self.failed,
            Status::Errored => self.errored,
        }
    }

    /// Number of outcomes accounted for
    pub fn completed(&self) -> usize {
        self.success + self.skipped + self.failed + self.errored
    }

    /// Format summary table as a string.
    pub fn format_table(&self, title: &str, unit: &str) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new(title)
                    .fg(Color::Cyan)
                    .add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Items").fg(Color::Cyan),
            ]);

        table.add_row(vec![
            Cell::new("success").fg(Color::Green),
            Cell::new(fmt_num(self.success as u64)).fg(Color::Green),
        ]);
        table.add_row(vec![
            Cell::new("skipped"),
            Cell::new(fmt_num(self.skipped as u64)),
        ]);
        table.add_row(vec![
            Cell::new("failed").fg(Color::Yellow),
            Cell::new(fmt_num(self.failed as u64)),
        ]);
        table.add_row(vec![
            Cell::new("error").fg(Color::Red),
            Cell::new(fmt_num(self.errored as u64)),
        ]);
        if self.cancelled > 0 {
            table.add_row(vec![
                Cell::new("not started"),
                Cell::new(fmt_num(self.cancelled as u64)),
            ]);
        }
        table.add_row(vec![
            Cell::new(format!("{unit} produced")),
            Cell::new(fmt_num(self.total_count)),
        ]);
        table.add_row(vec![
            Cell::new("elapsed"),
            Cell::new(format!("{:.1}s", self.elapsed.as_secs_f64())),
        ]);

        let mut out = format!("\n{table}");
        if !self.errors.is_empty() {
            out.push_str("\nErrors:\n");
            for (item, msg) in &self.errors {
                out.push_str(&format!("  {item}: {msg}\n"));
            }
        }
        if !self.failures.is_empty() {
            out.push_str("\nFailures:\n");
            for (item, why) in &self.failures {
                out.push_str(&format!("  {item}: {why}\n"));
            }
        }
        out
    }

    /// Log summary (non-TTY mode).
    pub fn log(&self, title: &str, unit: &str) {
        log::info!(
            "{title}: success={} skipped={} failed={} error={} not_started={} {unit}={} [{:.1}s]",
            self.success,
            self.skipped,
            self.failed,
            self.errored,
            self.cancelled,
            self.total_count,
            self.elapsed.as_secs_f64()
        );
        for (item, msg) in &self.errors {
            log::warn!("{title}: error {item}: {msg}");
        }
        for (item, why) in &self.failures {
            log::warn!("{title}: failed {item}: {why}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcomes() -> Vec<Outcome> {
        vec![
            Outcome::success(WorkItem::from(1), 5),
            Outcome::errored(WorkItem::from(7), "HTTP 500: oops"),
            Outcome::skipped(WorkItem::from(2)),
            Outcome::success(WorkItem::from(3), 7),
            Outcome::failed(WorkItem::from(4), "no_docs"),
            Outcome::errored(WorkItem::from(5), "IO: missing"),
        ]
    }

    #[test]
    fn counts_per_status() {
        let s = RunSummary::from_outcomes(&outcomes(), 6, Duration::ZERO);
        assert_eq!(s.success, 2);
        assert_eq!(s.skipped, 1);
        assert_eq!(s.failed, 1);
        assert_eq!(s.errored, 2);
        assert_eq!(s.cancelled, 0);
        assert_eq!(s.completed(), 6);
        for status in Status::ALL {
            assert!(s.count(status) > 0);
        }
    }

    #[test]
    fn total_count_only_from_success() {
        let mut all = outcomes();
        // failed outcome carrying a count must not be summed
        all.push(Outcome {
            count: 100,
            ..Outcome::failed(WorkItem::from(9), "verification_failed")
        });
        let s = RunSummary::from_outcomes(&all, 7, Duration::ZERO);
        assert_eq!(s.total_count, 12);
    }

    #[test]
    fn errors_retained_sorted() {
        let s = RunSummary::from_outcomes(&outcomes(), 6, Duration::ZERO);
        let ids: Vec<&str> = s.errors.iter().map(|(i, _)| i.as_str()).collect();
        assert_eq!(ids, ["5", "7"]);
        assert_eq!(s.errors[1].1, "HTTP 500: oops");
    }

    #[test]
    fn missing_outcomes_are_cancelled() {
        let s = RunSummary::from_outcomes(&outcomes()[..2], 10, Duration::ZERO);
        assert_eq!(s.cancelled, 8);
    }

    #[test]
    fn table_lists_errors() {
        let s = RunSummary::from_outcomes(&outcomes(), 6, Duration::from_secs(3));
        let table = s.format_table("extract", "hypotheses");
        assert!(table.contains("hypotheses produced"));
        assert!(table.contains("7: HTTP 500: oops"));
        assert!(table.contains("4: no_docs"));
    }
}
