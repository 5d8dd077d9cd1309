//! Embed subcommand - chunk, embed and index every converted paper

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use paperflow_catalog::Catalog;
use paperflow_core::{RunConfig, Runner, SharedProgress, Shutdown, list_subdirs};
use paperflow_embed::{EmbedHandler, EmbeddingClient, LanceIndex};
use rustc_hash::FxHashMap;

use super::{RunnerArgs, StageExit, finish, runtime};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Converter output directory (one subdirectory per paper)
    #[arg(long)]
    pub mineru_dir: Option<PathBuf>,

    /// Lance dataset path
    #[arg(short, long)]
    pub index: Option<PathBuf>,

    /// Don't look up paper titles in the catalog
    #[arg(long)]
    pub no_titles: bool,

    #[command(flatten)]
    pub runner: RunnerArgs,
}

/// Titles from the catalog, or none when it doesn't exist yet.
fn load_titles(config: &Config) -> Result<FxHashMap<String, String>> {
    let path = &config.paths.catalog;
    if !path.exists() {
        log::warn!("Catalog {} not found, chunks get empty titles", path.display());
        return Ok(FxHashMap::default());
    }
    let titles = Catalog::open(path)?.titles()?;
    log::info!("  Titles: {} from {}", titles.len(), path.display());
    Ok(titles)
}

pub fn run(
    args: EmbedArgs,
    config: &Config,
    progress: &SharedProgress,
    shutdown: &Shutdown,
) -> Result<StageExit> {
    let mineru_dir = args.mineru_dir.unwrap_or_else(|| config.paths.mineru_dir.clone());
    let index_path = args.index.unwrap_or_else(|| config.paths.index.clone());
    if let Some(parent) = index_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let run_config = args.runner.run_config(RunConfig::default(), &config.runner)?;

    let items = list_subdirs(&mineru_dir)
        .with_context(|| format!("Cannot list converter output: {}", mineru_dir.display()))?;
    let items = args.runner.select(items);

    log::info!("Embedding papers with {}", config.embedding.model);
    log::info!("  Input: {}", mineru_dir.display());
    let titles = if args.no_titles {
        FxHashMap::default()
    } else {
        load_titles(config)?
    };

    let rt = runtime()?;
    let report = rt.block_on(async {
        let index = LanceIndex::open(&index_path)
            .await
            .with_context(|| format!("Failed to open index {}", index_path.display()))?;
        log::info!("  Index: {}", index.uri());
        let client = EmbeddingClient::new(config.embedding.to_embedding_config());
        let handler = EmbedHandler::new(&mineru_dir, &index, client).with_titles(titles);
        let runner = Runner::new("embed", run_config)
            .with_shutdown(shutdown.clone())
            .with_progress(progress.clone());
        anyhow::Ok(runner.run(items, &index, &handler).await)
    })?;
    Ok(finish(&report, "embed", "chunks", progress))
}
