//! Per-paper extraction handler

use std::path::{Path, PathBuf};

use paperflow_core::{FileExists, Handler, ItemError, Produced, WorkItem};
use paperflow_mineru::load_markdown;

use crate::chat::Completion;
use crate::prompt::{SYSTEM_PROMPT, transcript_message};
use crate::repair::parse_paper_info;
use crate::trim::main_content;

/// Reads converted markdown, asks the model, writes `<info_dir>/<id>.json`.
pub struct ExtractHandler<C> {
    mineru_dir: PathBuf,
    info_dir: PathBuf,
    client: C,
}

impl<C: Completion> ExtractHandler<C> {
    pub fn new(mineru_dir: impl Into<PathBuf>, info_dir: impl Into<PathBuf>, client: C) -> Self {
        Self {
            mineru_dir: mineru_dir.into(),
            info_dir: info_dir.into(),
            client,
        }
    }

    /// Completion filter matching what this handler writes
    pub fn filter(&self) -> FileExists {
        FileExists::with_extension(&self.info_dir, "json")
    }

    fn output_path(&self, item: &WorkItem) -> PathBuf {
        self.info_dir.join(format!("{item}.json"))
    }
}

/// Write through a sibling temp file so readers never see partial JSON.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}

impl<C: Completion> Handler for ExtractHandler<C> {
    async fn handle(&self, item: &WorkItem) -> Result<Produced, ItemError> {
        let markdown = load_markdown(&self.mineru_dir, item).await?;
        let text = main_content(&markdown);
        if text.trim().is_empty() {
            return Ok(Produced::NoWork("empty_document".to_string()));
        }

        log::debug!("{item}: {} chars sent for extraction", text.len());
        let reply = self
            .client
            .complete(SYSTEM_PROMPT, &transcript_message(text))
            .await?;
        let info = parse_paper_info(&reply)?;

        let json = serde_json::to_vec_pretty(&info).map_err(ItemError::parse)?;
        write_atomic(&self.output_path(item), &json).await?;
        Ok(Produced::Units(info.hypothesis_count()))
    }
}
