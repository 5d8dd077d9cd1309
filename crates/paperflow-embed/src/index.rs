//! Lance dataset holding embedded chunks

use std::path::Path;

use arrow::array::{AsArray, Float32Array, RecordBatch, RecordBatchIterator};
use arrow::datatypes::Float32Type;
use lance::dataset::{Dataset, WriteMode, WriteParams};
use paperflow_core::{CompletionFilter, ItemError, WorkItem};
use tokio::sync::Mutex;

use crate::schema::VECTOR_COLUMN;

/// One nearest-neighbour result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub paper_id: String,
    pub paper_title: String,
    pub section: String,
    pub text: String,
    pub distance: f32,
}

fn lance_err(e: lance::error::Error) -> ItemError {
    ItemError::sink(e)
}

/// SQL string literal for a Lance filter expression
fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Vector index of paper chunks.
///
/// The dataset is created by the first write. All access goes through one
/// async mutex, so appends from concurrent handlers are applied one at a time
/// and every read sees the latest committed version.
pub struct LanceIndex {
    uri: String,
    dataset: Mutex<Option<Dataset>>,
}

impl LanceIndex {
    /// Open the dataset at `path` if it exists; otherwise start empty.
    pub async fn open(path: &Path) -> Result<Self, ItemError> {
        let uri = path.to_string_lossy().into_owned();
        let dataset = if tokio::fs::try_exists(path).await? {
            let ds = Dataset::open(&uri).await.map_err(lance_err)?;
            log::debug!("opened {uri} (version {})", ds.version().version);
            Some(ds)
        } else {
            None
        };
        Ok(Self {
            uri,
            dataset: Mutex::new(dataset),
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Append a batch of chunk rows.
    pub async fn append(&self, batch: RecordBatch) -> Result<(), ItemError> {
        let mut guard = self.dataset.lock().await;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);
        let params = WriteParams {
            mode: if guard.is_some() {
                WriteMode::Append
            } else {
                WriteMode::Create
            },
            ..Default::default()
        };
        let ds = Dataset::write(reader, &self.uri, Some(params))
            .await
            .map_err(lance_err)?;
        *guard = Some(ds);
        Ok(())
    }

    /// Total rows (0 before the first write).
    pub async fn count_rows(&self) -> Result<usize, ItemError> {
        match self.dataset.lock().await.as_ref() {
            Some(ds) => ds.count_rows(None).await.map_err(lance_err),
            None => Ok(0),
        }
    }

    /// Rows stored for one paper.
    pub async fn count_paper(&self, paper_id: &str) -> Result<usize, ItemError> {
        match self.dataset.lock().await.as_ref() {
            Some(ds) => ds
                .count_rows(Some(format!("paper_id = {}", sql_literal(paper_id))))
                .await
                .map_err(lance_err),
            None => Ok(0),
        }
    }

    /// `k` chunks closest to `vector`, nearest first, optionally within one section.
    pub async fn search(
        &self,
        vector: &[f32],
        k: usize,
        section: Option<&str>,
    ) -> Result<Vec<SearchHit>, ItemError> {
        let guard = self.dataset.lock().await;
        let Some(ds) = guard.as_ref() else {
            return Ok(Vec::new());
        };

        let query = Float32Array::from(vector.to_vec());
        let mut scanner = ds.scan();
        scanner
            .nearest(VECTOR_COLUMN, &query, k)
            .map_err(lance_err)?
            .project(&["paper_id", "paper_title", "section", "text"])
            .map_err(lance_err)?;
        if let Some(section) = section {
            scanner
                .filter(&format!("section = {}", sql_literal(section)))
                .map_err(lance_err)?;
            scanner.prefilter(true);
        }
        let batch = scanner.try_into_batch().await.map_err(lance_err)?;
        hits_from_batch(&batch)
    }
}

fn hits_from_batch(batch: &RecordBatch) -> Result<Vec<SearchHit>, ItemError> {
    let strings = |name: &str| {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_string_opt::<i32>())
            .ok_or_else(|| ItemError::sink(format!("search result lacks {name}")))
    };
    let paper_id = strings("paper_id")?;
    let paper_title = strings("paper_title")?;
    let section = strings("section")?;
    let text = strings("text")?;
    let distance = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_primitive_opt::<Float32Type>())
        .ok_or_else(|| ItemError::sink("search result lacks _distance"))?;

    Ok((0..batch.num_rows())
        .map(|i| SearchHit {
            paper_id: paper_id.value(i).to_string(),
            paper_title: paper_title.value(i).to_string(),
            section: section.value(i).to_string(),
            text: text.value(i).to_string(),
            distance: distance.value(i),
        })
        .collect())
}

/// A paper is done once at least one of its chunks is stored.
impl CompletionFilter for LanceIndex {
    async fn is_done(&self, item: &WorkItem) -> Result<bool, ItemError> {
        Ok(self.count_paper(item.as_str()).await? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_escape_quotes() {
        assert_eq!(sql_literal("12"), "'12'");
        assert_eq!(sql_literal("o'brien"), "'o''brien'");
    }
}
