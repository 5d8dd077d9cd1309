//! `paperflow catalog` - bibliographic records and PDF organization

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use paperflow_catalog::{Catalog, CatalogStats, CsvColumns};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Catalog database (default: paths.catalog)
    #[arg(long)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub action: CatalogAction,
}

#[derive(Subcommand, Debug)]
pub enum CatalogAction {
    /// Create the catalog schema
    Init,
    /// Import bibliographic CSV exports (duplicates by title or DOI are skipped)
    Import {
        #[arg(required = true)]
        csv: Vec<PathBuf>,
    },
    /// Copy `<title>.pdf` files to `<export>/<id>.pdf`
    Organize {
        /// Directories holding downloaded PDFs
        #[arg(required = true)]
        dirs: Vec<PathBuf>,

        /// Target directory (default: paths.pdf_dir)
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Show catalog statistics
    Describe,
}

pub fn run(args: CatalogArgs, config: &Config) -> Result<()> {
    let path = args.db.unwrap_or_else(|| config.paths.catalog.clone());
    let mut catalog = Catalog::open(&path)?;
    catalog.init()?;

    match args.action {
        CatalogAction::Init => {
            log::info!("Catalog ready at {}", catalog.path().display());
        }
        CatalogAction::Import { csv } => {
            let columns = CsvColumns::from(&config.catalog.columns);
            for file in &csv {
                let s = catalog.import_csv(file, &columns)?;
                eprintln!(
                    "{}: {} rows, {} inserted, {} duplicates, {} without title",
                    file.display(),
                    s.rows,
                    s.inserted,
                    s.duplicates,
                    s.skipped
                );
            }
        }
        CatalogAction::Organize { dirs, export } => {
            let export = export.unwrap_or_else(|| config.paths.pdf_dir.clone());
            let s = catalog.organize(&dirs, &export)?;
            eprintln!(
                "Copied {} PDFs to {} ({} unmatched)",
                s.copied,
                export.display(),
                s.unmatched
            );
        }
        CatalogAction::Describe => {
            let stats = catalog.describe()?;
            eprintln!("\n{}", stats_table(&stats));
        }
    }
    Ok(())
}

fn year_range(stats: &CatalogStats) -> String {
    match (stats.min_year, stats.max_year) {
        (Some(lo), Some(hi)) if lo == hi => lo.to_string(),
        (Some(lo), Some(hi)) => format!("{lo}-{hi}"),
        _ => "-".to_string(),
    }
}

fn stats_table(stats: &CatalogStats) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Catalog").fg(Color::Cyan),
            Cell::new("Papers").fg(Color::Cyan),
        ]);
    table.add_row(vec!["total".to_string(), stats.total.to_string()]);
    table.add_row(vec!["with PDF".to_string(), stats.with_file.to_string()]);
    table.add_row(vec!["without PDF".to_string(), stats.without_file.to_string()]);
    table.add_row(vec!["years".to_string(), year_range(stats)]);
    table
}
