//! Search subcommand - nearest chunks for a query

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use paperflow_embed::{Embedder, EmbeddingClient, LanceIndex, SearchHit};

use super::runtime;
use crate::config::Config;

/// Characters of chunk text shown per hit
const PREVIEW_CHARS: usize = 160;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Query text
    pub query: String,

    /// Number of results
    #[arg(short, default_value_t = 5)]
    pub k: usize,

    /// Only search chunks under this level-1 header
    #[arg(long)]
    pub section: Option<String>,

    /// Lance dataset path
    #[arg(short, long)]
    pub index: Option<PathBuf>,
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > PREVIEW_CHARS {
        flat.chars().take(PREVIEW_CHARS).collect::<String>() + "..."
    } else {
        flat
    }
}

fn print_hits(hits: &[SearchHit]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Paper").fg(Color::Cyan),
            Cell::new("Title").fg(Color::Cyan),
            Cell::new("Section").fg(Color::Cyan),
            Cell::new("Distance").fg(Color::Cyan),
            Cell::new("Text").fg(Color::Cyan),
        ]);
    for hit in hits {
        table.add_row(vec![
            Cell::new(&hit.paper_id),
            Cell::new(&hit.paper_title),
            Cell::new(&hit.section),
            Cell::new(format!("{:.4}", hit.distance)),
            Cell::new(preview(&hit.text)),
        ]);
    }
    println!("{table}");
}

pub fn run(args: SearchArgs, config: &Config) -> Result<()> {
    let SearchArgs {
        query,
        k,
        section,
        index,
    } = args;
    let index_path = index.unwrap_or_else(|| config.paths.index.clone());
    if !index_path.exists() {
        anyhow::bail!("Index {} does not exist; run `paperflow embed` first", index_path.display());
    }

    let hits = runtime()?.block_on(async {
        let client = EmbeddingClient::new(config.embedding.to_embedding_config());
        let mut vectors = client
            .embed(std::slice::from_ref(&query))
            .await
            .context("Failed to embed query")?;
        let vector = vectors.pop().context("Embedding service returned no vector")?;

        let index = LanceIndex::open(&index_path).await?;
        index
            .search(&vector, k, section.as_deref())
            .await
            .context("Search failed")
    })?;

    if hits.is_empty() {
        eprintln!("No results");
    } else {
        print_hits(&hits);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview("a\n\n b   c"), "a b c");
        let long = "word ".repeat(100);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
    }
}
