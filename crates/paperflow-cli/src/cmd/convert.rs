//! Convert subcommand - PDF → markdown through MinerU

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use paperflow_core::{Runner, SharedProgress, Shutdown, list_files};
use paperflow_mineru::{ConvertHandler, MarkdownExists};

use super::{RunnerArgs, StageExit, finish, runtime};
use crate::config::{Config, MineruSection};

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Directory of <id>.pdf files
    #[arg(long)]
    pub pdf_dir: Option<PathBuf>,

    /// Converter output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// MinerU backend (pipeline, vlm-transformers, ...)
    #[arg(long)]
    pub backend: Option<String>,

    /// Document language hint
    #[arg(long)]
    pub lang: Option<String>,

    #[command(flatten)]
    pub runner: RunnerArgs,
}

pub fn run(
    args: ConvertArgs,
    config: &Config,
    progress: &SharedProgress,
    shutdown: &Shutdown,
) -> Result<StageExit> {
    let pdf_dir = args.pdf_dir.unwrap_or_else(|| config.paths.pdf_dir.clone());
    let output_dir = args.output.unwrap_or_else(|| config.paths.mineru_dir.clone());
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output dir: {}", output_dir.display()))?;

    let mut convert = config.mineru.to_convert_config(&pdf_dir, &output_dir);
    if let Some(backend) = args.backend {
        convert.backend = backend;
    }
    if let Some(lang) = args.lang {
        convert.lang = lang;
    }
    let run_config = args
        .runner
        .run_config(MineruSection::run_defaults(), &config.mineru.runner)?;

    let items = list_files(&pdf_dir, "pdf")
        .with_context(|| format!("Cannot list PDFs: {}", pdf_dir.display()))?;
    let items = args.runner.select(items);

    log::info!("Converting PDFs with {} ({})", convert.command, convert.backend);
    log::info!("  Input: {}", pdf_dir.display());
    log::info!("  Output: {}", output_dir.display());

    let filter = MarkdownExists::new(&output_dir);
    let handler = ConvertHandler::new(convert);
    let runner = Runner::new("convert", run_config)
        .with_shutdown(shutdown.clone())
        .with_progress(progress.clone());

    let report = runtime()?.block_on(runner.run(items, &filter, &handler));
    Ok(finish(&report, "convert", "markdown files", progress))
}
