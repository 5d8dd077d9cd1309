//! paperflow - batched, resumable pipeline for academic papers
//!
//! Converts PDFs to markdown, extracts structured paper info with an LLM,
//! and indexes section chunks for semantic search.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use paperflow_core::Shutdown;

mod cmd;
mod config;

use cmd::StageExit;
use config::Config;

#[derive(Parser)]
#[command(name = "paperflow")]
#[command(about = "Batched, resumable pipeline for academic papers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./paperflow.toml or ~/.config/paperflow/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Convert PDFs to markdown with MinerU
    Convert(cmd::convert::ConvertArgs),
    /// Extract keywords, summary and hypotheses with an LLM
    Extract(cmd::extract::ExtractArgs),
    /// Chunk, embed and index converted papers
    Embed(cmd::embed::EmbedArgs),
    /// Semantic search over indexed chunks
    Search(cmd::search::SearchArgs),
    /// Manage the bibliographic catalog
    Catalog(cmd::catalog::CatalogArgs),
    /// Show current configuration
    Config,
}

fn main() -> ExitCode {
    match run() {
        Ok(StageExit::Complete) => ExitCode::SUCCESS,
        Ok(StageExit::Interrupted) => {
            log::warn!("Interrupted; rerun to resume");
            ExitCode::from(130)
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<StageExit> {
    // before logging so RUST_LOG may come from .env
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(paperflow_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, progress bars show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    paperflow_core::init_logging(quiet, cli.debug, multi);
    match dotenv {
        Ok(path) => log::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => log::debug!("No .env file found"),
        Err(e) => log::warn!("Ignoring .env: {e}"),
    }

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    // Batch stages stop gracefully on the first SIGINT/SIGTERM
    let shutdown = Shutdown::new();
    if matches!(
        cli.command,
        Command::Convert(_) | Command::Extract(_) | Command::Embed(_)
    ) {
        shutdown.install_signal_handlers()?;
    }

    match cli.command {
        Command::Convert(args) => cmd::convert::run(args, &config, &progress, &shutdown),
        Command::Extract(args) => cmd::extract::run(args, &config, &progress, &shutdown),
        Command::Embed(args) => cmd::embed::run(args, &config, &progress, &shutdown),
        Command::Search(args) => cmd::search::run(args, &config).map(|()| StageExit::Complete),
        Command::Catalog(args) => cmd::catalog::run(args, &config).map(|()| StageExit::Complete),
        Command::Config => {
            print_config(&config);
            Ok(StageExit::Complete)
        }
    }
}

fn print_config(config: &Config) {
    use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

    let configured = |key: &Option<String>| {
        if key.is_some() { "configured" } else { "not set" }
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec!["PDF directory", &config.paths.pdf_dir.display().to_string()]);
    table.add_row(vec!["MinerU output", &config.paths.mineru_dir.display().to_string()]);
    table.add_row(vec!["Paper info", &config.paths.info_dir.display().to_string()]);
    table.add_row(vec!["Index", &config.paths.index.display().to_string()]);
    table.add_row(vec!["Catalog", &config.paths.catalog.display().to_string()]);
    table.add_row(vec![
        "MinerU",
        &format!("{} ({}, {})", config.mineru.command, config.mineru.backend, config.mineru.lang),
    ]);
    table.add_row(vec!["LLM base URL", &config.llm.base_url]);
    table.add_row(vec!["LLM model", &config.llm.model]);
    table.add_row(vec!["LLM API key", configured(&config.llm.api_key)]);
    table.add_row(vec!["Embedding base URL", &config.embedding.base_url]);
    table.add_row(vec!["Embedding model", &config.embedding.model]);
    table.add_row(vec!["Embedding API key", configured(&config.embedding.api_key)]);
    let runner = config.runner.apply(Default::default());
    match runner {
        Ok(r) => {
            table.add_row(vec!["Workers", &r.num_workers.to_string()]);
            table.add_row(vec![
                "Batch",
                &format!("{} items, {:.1}s apart", r.batch_size, r.batch_interval.as_secs_f64()),
            ]);
            table.add_row(vec![
                "Start delay scale",
                &format!("{:.1}s", r.delay_scale.as_secs_f64()),
            ]);
        }
        Err(e) => {
            table.add_row(vec!["Runner", &format!("invalid: {e}")]);
        }
    }

    eprintln!("\n{table}");
}
