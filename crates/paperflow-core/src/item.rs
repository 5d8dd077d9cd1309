//! Work items and their per-run outcomes

use std::cmp::Ordering;

/// Opaque identifier of one unit of pipeline work (usually one paper).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WorkItem(String);

impl WorkItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the id, if it is one (converter output dirs are catalog ids)
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl std::fmt::Display for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkItem {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for WorkItem {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<i64> for WorkItem {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

/// Numeric ids sort numerically and before non-numeric ones, which sort lexically.
///
/// Keeps `2` before `10` for catalog-id directories while staying total.
impl Ord for WorkItem {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.as_i64(), other.as_i64()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for WorkItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Final classification of one work item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    Skipped,
    Failed,
    Errored,
}

impl Status {
    pub const ALL: [Status; 4] = [Self::Success, Self::Skipped, Self::Failed, Self::Errored];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Errored => "error",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason strings shared across pipelines
pub mod reason {
    pub const ADDED: &str = "added";
    pub const ALREADY_EXISTS: &str = "already_exists";
    pub const VERIFICATION_FAILED: &str = "verification_failed";
}

/// Result of processing one work item, created exactly once per item per run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub item: WorkItem,
    pub status: Status,
    pub reason: String,
    /// Units of sub-work produced (chunks embedded, hypotheses extracted, ...)
    pub count: u64,
}

impl Outcome {
    pub fn success(item: WorkItem, count: u64) -> Self {
        Self {
            item,
            status: Status::Success,
            reason: reason::ADDED.to_string(),
            count,
        }
    }

    pub fn skipped(item: WorkItem) -> Self {
        Self {
            item,
            status: Status::Skipped,
            reason: reason::ALREADY_EXISTS.to_string(),
            count: 0,
        }
    }

    pub fn failed(item: WorkItem, reason: impl Into<String>) -> Self {
        Self {
            item,
            status: Status::Failed,
            reason: reason.into(),
            count: 0,
        }
    }

    pub fn errored(item: WorkItem, message: impl Into<String>) -> Self {
        Self {
            item,
            status: Status::Errored,
            reason: message.into(),
            count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_sort_numerically() {
        let mut items: Vec<WorkItem> = ["10", "2", "1"].into_iter().map(WorkItem::from).collect();
        items.sort();
        let ids: Vec<&str> = items.iter().map(WorkItem::as_str).collect();
        assert_eq!(ids, ["1", "2", "10"]);
    }

    #[test]
    fn numeric_before_names() {
        let mut items: Vec<WorkItem> = ["beta", "3", "alpha"]
            .into_iter()
            .map(WorkItem::from)
            .collect();
        items.sort();
        let ids: Vec<&str> = items.iter().map(WorkItem::as_str).collect();
        assert_eq!(ids, ["3", "alpha", "beta"]);
    }

    #[test]
    fn leading_zero_ids_stay_distinct() {
        let a = WorkItem::from("007");
        let b = WorkItem::from("7");
        assert_ne!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn outcome_constructors() {
        let o = Outcome::success(WorkItem::from(1), 12);
        assert_eq!(o.status, Status::Success);
        assert_eq!(o.reason, "added");
        assert_eq!(o.count, 12);

        let o = Outcome::skipped(WorkItem::from(1));
        assert_eq!(o.reason, "already_exists");
        assert_eq!(o.count, 0);
    }

    #[test]
    fn status_labels() {
        assert_eq!(Status::Errored.to_string(), "error");
        assert_eq!(Status::ALL.len(), 4);
    }
}
