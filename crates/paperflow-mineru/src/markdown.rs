//! Locate and read converter markdown

use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use paperflow_core::{CompletionFilter, ItemError, WorkItem};

/// Subdirectory the converter's text method writes into
const TEXT_SUBDIR: &str = "txt";

/// All markdown files for `item`, sorted by path.
pub fn markdown_files(root: &Path, item: &WorkItem) -> io::Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/{}/{TEXT_SUBDIR}/*.md",
        Pattern::escape(&root.to_string_lossy()),
        Pattern::escape(item.as_str())
    );
    let paths = glob::glob(&pattern)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(glob::GlobError::into_error)?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// First markdown file for `item` in sorted order, if the converter produced any.
pub fn markdown_path(root: &Path, item: &WorkItem) -> io::Result<Option<PathBuf>> {
    Ok(markdown_files(root, item)?.into_iter().next())
}

/// Read the paper's markdown.
pub async fn load_markdown(root: &Path, item: &WorkItem) -> Result<String, ItemError> {
    let Some(path) = markdown_path(root, item)? else {
        return Err(ItemError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no markdown under {}", root.join(item.as_str()).display()),
        )));
    };
    log::debug!("{item}: reading {}", path.display());
    Ok(tokio::fs::read_to_string(&path).await?)
}

/// Done when the converter left at least one markdown file for the item.
#[derive(Debug, Clone)]
pub struct MarkdownExists {
    root: PathBuf,
}

impl MarkdownExists {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl CompletionFilter for MarkdownExists {
    async fn is_done(&self, item: &WorkItem) -> Result<bool, ItemError> {
        Ok(markdown_path(&self.root, item)?.is_some())
    }
}
