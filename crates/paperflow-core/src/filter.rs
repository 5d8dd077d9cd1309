//! Completion checks that make pipeline stages resumable

use std::path::{Path, PathBuf};

use crate::error::ItemError;
use crate::item::WorkItem;

/// Answers "is this item already recorded in the sink?".
///
/// Must only return `Ok(true)` on positive confirmation (record exists, row
/// returned, at least one match). Anything ambiguous is `Ok(false)` or an
/// error; the runner treats errors as "not done".
#[allow(async_fn_in_trait)]
pub trait CompletionFilter {
    async fn is_done(&self, item: &WorkItem) -> Result<bool, ItemError>;
}

/// Filter that never reports completion (used when skipping is disabled)
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverDone;

impl CompletionFilter for NeverDone {
    async fn is_done(&self, _item: &WorkItem) -> Result<bool, ItemError> {
        Ok(false)
    }
}

/// Item is done when a path derived from its id exists on disk.
pub struct FileExists {
    path_for: Box<dyn Fn(&WorkItem) -> PathBuf + Send + Sync>,
}

impl std::fmt::Debug for FileExists {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileExists").finish_non_exhaustive()
    }
}

impl FileExists {
    pub fn new(path_for: impl Fn(&WorkItem) -> PathBuf + Send + Sync + 'static) -> Self {
        Self {
            path_for: Box::new(path_for),
        }
    }

    /// `<dir>/<id>.<ext>`
    pub fn with_extension(dir: &Path, ext: &str) -> Self {
        let dir = dir.to_path_buf();
        let ext = ext.to_string();
        Self::new(move |item| dir.join(format!("{item}.{ext}")))
    }

    pub fn path(&self, item: &WorkItem) -> PathBuf {
        (self.path_for)(item)
    }
}

impl CompletionFilter for FileExists {
    async fn is_done(&self, item: &WorkItem) -> Result<bool, ItemError> {
        let path = self.path(item);
        Ok(tokio::fs::try_exists(&path).await?)
    }
}
