//! Extract subcommand - LLM metadata for every converted paper

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use paperflow_core::{RunConfig, Runner, SharedProgress, Shutdown, list_subdirs};
use paperflow_extract::{ChatClient, ExtractHandler};

use super::{RunnerArgs, StageExit, finish, runtime};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Converter output directory (one subdirectory per paper)
    #[arg(long)]
    pub mineru_dir: Option<PathBuf>,

    /// Output directory for <id>.json
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Chat model
    #[arg(short, long)]
    pub model: Option<String>,

    #[command(flatten)]
    pub runner: RunnerArgs,
}

pub fn run(
    args: ExtractArgs,
    config: &Config,
    progress: &SharedProgress,
    shutdown: &Shutdown,
) -> Result<StageExit> {
    let mineru_dir = args.mineru_dir.unwrap_or_else(|| config.paths.mineru_dir.clone());
    let info_dir = args.output.unwrap_or_else(|| config.paths.info_dir.clone());
    std::fs::create_dir_all(&info_dir)
        .with_context(|| format!("Failed to create output dir: {}", info_dir.display()))?;

    let mut llm = config.llm.to_llm_config();
    if let Some(model) = args.model {
        llm.model = model;
    }
    if llm.api_key.is_none() {
        log::warn!("No LLM API key configured (set OPENAI_API_KEY or llm.api_key)");
    }
    let run_config = args.runner.run_config(RunConfig::default(), &config.runner)?;

    let items = list_subdirs(&mineru_dir)
        .with_context(|| format!("Cannot list converter output: {}", mineru_dir.display()))?;
    let items = args.runner.select(items);

    log::info!("Extracting paper info");
    log::info!("  Input: {}", mineru_dir.display());
    log::info!("  Output: {}", info_dir.display());
    let client = ChatClient::new(llm);
    log::info!("  Model: {}", client.model());

    let handler = ExtractHandler::new(&mineru_dir, &info_dir, client);
    let filter = handler.filter();
    let runner = Runner::new("extract", run_config)
        .with_shutdown(shutdown.clone())
        .with_progress(progress.clone());

    let report = runtime()?.block_on(runner.run(items, &filter, &handler));
    Ok(finish(&report, "extract", "hypotheses", progress))
}
