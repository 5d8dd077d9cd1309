//! Per-paper embedding handler

use std::path::PathBuf;

use paperflow_core::{Handler, ItemError, Produced, WorkItem};
use paperflow_mineru::load_markdown;
use rustc_hash::FxHashMap;

use crate::chunk::chunk_paper;
use crate::client::Embedder;
use crate::index::LanceIndex;
use crate::schema::chunks_to_batch;

/// Chunks a paper's markdown, embeds the chunks and appends them to the index.
pub struct EmbedHandler<'a, E> {
    mineru_dir: PathBuf,
    index: &'a LanceIndex,
    embedder: E,
    /// paper id → title
    titles: FxHashMap<String, String>,
}

impl<'a, E: Embedder> EmbedHandler<'a, E> {
    pub fn new(mineru_dir: impl Into<PathBuf>, index: &'a LanceIndex, embedder: E) -> Self {
        Self {
            mineru_dir: mineru_dir.into(),
            index,
            embedder,
            titles: FxHashMap::default(),
        }
    }

    pub fn with_titles(mut self, titles: FxHashMap<String, String>) -> Self {
        self.titles = titles;
        self
    }

    fn title(&self, item: &WorkItem) -> &str {
        match self.titles.get(item.as_str()) {
            Some(t) => t,
            None => {
                if !self.titles.is_empty() {
                    log::debug!("{item}: no title in catalog");
                }
                ""
            }
        }
    }
}

impl<E: Embedder> Handler for EmbedHandler<'_, E> {
    async fn handle(&self, item: &WorkItem) -> Result<Produced, ItemError> {
        let markdown = load_markdown(&self.mineru_dir, item).await?;
        let chunks = chunk_paper(item.as_str(), self.title(item), &markdown);
        if chunks.is_empty() {
            return Ok(Produced::NoWork("no_docs".to_string()));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        let batch = chunks_to_batch(&chunks, &vectors).map_err(ItemError::sink)?;
        self.index.append(batch).await?;

        log::debug!("{item}: {} chunks indexed", chunks.len());
        Ok(Produced::Units(chunks.len() as u64))
    }
}
