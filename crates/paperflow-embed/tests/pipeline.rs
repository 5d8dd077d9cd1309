//! Embedding stage end to end: runner + handler + Lance index, fake embedder.

use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::time::Duration;

use paperflow_core::{
    CompletionFilter, ItemError, NeverDone, RunConfig, Runner, Status, WorkItem, list_subdirs,
};
use paperflow_embed::{EmbedHandler, Embedder, LanceIndex};
use rustc_hash::FxHashMap;
use tempfile::TempDir;

/// Deterministic 4-dim vectors from word counts of a few marker words.
#[derive(Default)]
struct BagOfWords {
    calls: Cell<usize>,
}

const VOCAB: [&str; 4] = ["trust", "survey", "network", "privacy"];

fn bag(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    VOCAB
        .iter()
        .map(|w| lower.matches(w).count() as f32 + 0.01)
        .collect()
}

impl Embedder for BagOfWords {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ItemError> {
        self.calls.set(self.calls.get() + 1);
        Ok(texts.iter().map(|t| bag(t)).collect())
    }
}

fn paper(root: &Path, id: &str, markdown: &str) {
    let dir = root.join(id).join("txt");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{id}.md")), markdown).unwrap();
}

fn config() -> RunConfig {
    RunConfig {
        num_workers: 2,
        batch_size: 2,
        batch_interval: Duration::ZERO,
        delay_scale: Duration::ZERO,
        seed: Some(1),
        ..RunConfig::default()
    }
}

fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    let mineru = dir.path().join("mineru");
    paper(&mineru, "1", "# Abstract\nTrust drives trust.\n# Method\nA survey.");
    paper(&mineru, "2", "# Intro\nNetwork effects and privacy.");
    paper(&mineru, "3", "\n\n");
    dir
}

#[tokio::test]
async fn embeds_skips_and_searches() {
    let dir = setup();
    let mineru = dir.path().join("mineru");
    let index = LanceIndex::open(&dir.path().join("chunks.lance")).await.unwrap();
    let titles = FxHashMap::from_iter([("1".to_string(), "On Trust".to_string())]);

    let items = list_subdirs(&mineru).unwrap();
    let handler = EmbedHandler::new(&mineru, &index, BagOfWords::default()).with_titles(titles);
    let report = Runner::new("embed", config()).run(items.clone(), &index, &handler).await;

    let summary = report.summary();
    assert_eq!(summary.success, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0], (WorkItem::from(3), "no_docs".to_string()));
    assert_eq!(summary.total_count, 3);
    assert_eq!(index.count_rows().await.unwrap(), 3);
    assert!(index.is_done(&WorkItem::from(1)).await.unwrap());
    assert!(!index.is_done(&WorkItem::from(3)).await.unwrap());

    // rerun against a freshly opened index: everything indexed is skipped
    let reopened = LanceIndex::open(&dir.path().join("chunks.lance")).await.unwrap();
    let handler = EmbedHandler::new(&mineru, &reopened, BagOfWords::default());
    let report = Runner::new("embed", config()).run(items, &reopened, &handler).await;
    let summary = report.summary();
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(reopened.count_rows().await.unwrap(), 3);

    let hits = reopened.search(&bag("trust"), 2, None).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].paper_id, "1");
    assert_eq!(hits[0].section, "Abstract");
    assert_eq!(hits[0].paper_title, "On Trust");
    assert!(hits[0].distance <= hits[1].distance);

    let hits = reopened.search(&bag("privacy"), 5, Some("Intro")).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].paper_id, "2");
    assert_eq!(hits[0].paper_title, "");
}

#[tokio::test]
async fn empty_index_behaviour() {
    let dir = TempDir::new().unwrap();
    let index = LanceIndex::open(&dir.path().join("none.lance")).await.unwrap();
    assert!(index.uri().ends_with("none.lance"));
    assert_eq!(index.count_rows().await.unwrap(), 0);
    assert!(!index.is_done(&WorkItem::from("o'brien")).await.unwrap());
    assert!(index.search(&[0.0; 4], 3, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn quoted_ids_filter_correctly() {
    let dir = TempDir::new().unwrap();
    let mineru = dir.path().join("mineru");
    paper(&mineru, "o'brien", "# A\nsurvey text");
    let index = LanceIndex::open(&dir.path().join("q.lance")).await.unwrap();
    let handler = EmbedHandler::new(&mineru, &index, BagOfWords::default());

    let report = Runner::new("embed", config())
        .run(vec![WorkItem::from("o'brien")], &NeverDone, &handler)
        .await;
    assert_eq!(report.outcomes[0].status, Status::Success);
    assert!(index.is_done(&WorkItem::from("o'brien")).await.unwrap());
    assert_eq!(index.count_paper("o'brien").await.unwrap(), 1);
}
