//! Paperflow Catalog - bibliographic records for the paper collection
//!
//! A DuckDB file with one `paper` table. Paper ids assigned here name every
//! downstream artifact (`<id>.pdf`, converter output `<id>/`, `<id>.json`).

mod sql;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use duckdb::{Connection, params};
use rustc_hash::{FxHashMap, FxHashSet};

/// CSV header names for each catalog field (exports differ by source and locale).
#[derive(Debug, Clone)]
pub struct CsvColumns {
    pub title: String,
    pub doi: String,
    pub year: String,
    pub authors: String,
    pub journal: String,
}

impl Default for CsvColumns {
    /// Scopus export headers
    fn default() -> Self {
        Self {
            title: "Title".to_string(),
            doi: "DOI".to_string(),
            year: "Year".to_string(),
            authors: "Authors".to_string(),
            journal: "Source title".to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub rows: u64,
    pub inserted: u64,
    pub duplicates: u64,
    /// Rows without a title
    pub skipped: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OrganizeSummary {
    pub copied: u64,
    /// PDFs whose name matched no catalog title
    pub unmatched: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CatalogStats {
    pub total: u64,
    pub with_file: u64,
    pub without_file: u64,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
}

/// Lowercased alphanumerics only. File names lose characters like `:` and
/// `?` that titles keep, so titles are matched on this key.
pub fn title_key(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("nan"))
}

pub struct Catalog {
    conn: Connection,
    path: PathBuf,
}

impl Catalog {
    /// Open (or create) the catalog database file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open catalog {}", path.display()))?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the schema if it does not exist.
    pub fn init(&self) -> Result<()> {
        self.conn
            .execute_batch(sql::CREATE_SCHEMA)
            .context("Failed to create catalog schema")
    }

    /// Import a bibliographic CSV export.
    ///
    /// Rows whose title or DOI is already in the catalog (or earlier in the
    /// same file) are skipped.
    pub fn import_csv(&mut self, csv: &Path, columns: &CsvColumns) -> Result<ImportSummary> {
        let mut seen_titles = FxHashSet::default();
        let mut seen_dois = FxHashSet::default();
        {
            let mut stmt = self.conn.prepare(sql::EXISTING_KEYS)?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?))
            })?;
            for row in rows {
                let (title, doi) = row?;
                if let Some(t) = non_empty(title) {
                    seen_titles.insert(title_key(&t));
                }
                if let Some(d) = non_empty(doi) {
                    seen_dois.insert(d.to_lowercase());
                }
            }
        }

        let records = {
            let query = sql::read_csv(csv, columns);
            let mut stmt = self
                .conn
                .prepare(&query)
                .with_context(|| format!("Failed to read {}", csv.display()))?;
            let rows = stmt.query_map([], |row| {
                Ok([
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ])
            })?;
            rows.collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Failed to parse {}", csv.display()))?
        };

        let mut summary = ImportSummary::default();
        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare(sql::INSERT_PAPER)?;
            for [title, doi, year, authors, journal] in records {
                summary.rows += 1;
                let Some(title) = non_empty(title) else {
                    summary.skipped += 1;
                    continue;
                };
                let doi = non_empty(doi);
                let key = title_key(&title);
                let doi_key = doi.as_ref().map(|d| d.to_lowercase());
                if seen_titles.contains(&key)
                    || doi_key.as_ref().is_some_and(|d| seen_dois.contains(d))
                {
                    log::debug!("duplicate: {title}");
                    summary.duplicates += 1;
                    continue;
                }
                let year = non_empty(year).and_then(|y| y.parse::<i32>().ok());
                insert.execute(params![title, doi, year, non_empty(authors), non_empty(journal)])?;
                seen_titles.insert(key);
                if let Some(d) = doi_key {
                    seen_dois.insert(d);
                }
                summary.inserted += 1;
            }
        }
        tx.commit().context("Failed to commit import")?;

        log::info!(
            "{}: {} rows, {} inserted, {} duplicates, {} without title",
            csv.display(),
            summary.rows,
            summary.inserted,
            summary.duplicates,
            summary.skipped
        );
        Ok(summary)
    }

    /// Copy `<title>.pdf` files from `pdf_dirs` to `<export_dir>/<id>.pdf`
    /// and mark those papers as having a file. Missing directories are skipped.
    pub fn organize(&self, pdf_dirs: &[PathBuf], export_dir: &Path) -> Result<OrganizeSummary> {
        fs::create_dir_all(export_dir)
            .with_context(|| format!("Failed to create {}", export_dir.display()))?;
        let ids = self.ids_by_title()?;
        let mut mark = self.conn.prepare(sql::MARK_FILE_EXISTS)?;
        let mut summary = OrganizeSummary::default();

        for dir in pdf_dirs {
            if !dir.is_dir() {
                log::warn!("PDF directory {} does not exist", dir.display());
                continue;
            }
            let mut entries: Vec<PathBuf> = fs::read_dir(dir)
                .with_context(|| format!("Failed to list {}", dir.display()))?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("pdf")))
                .collect();
            entries.sort();

            for pdf in entries {
                let Some(stem) = pdf.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let Some(&id) = ids.get(&title_key(stem)) else {
                    log::debug!("no catalog entry for {}", pdf.display());
                    summary.unmatched += 1;
                    continue;
                };
                let target = export_dir.join(format!("{id}.pdf"));
                fs::copy(&pdf, &target).with_context(|| {
                    format!("Failed to copy {} to {}", pdf.display(), target.display())
                })?;
                mark.execute(params![id])?;
                summary.copied += 1;
            }
        }
        log::info!(
            "organized {} PDFs into {} ({} unmatched)",
            summary.copied,
            export_dir.display(),
            summary.unmatched
        );
        Ok(summary)
    }

    fn ids_by_title(&self) -> Result<FxHashMap<String, i64>> {
        let mut stmt = self.conn.prepare(sql::TITLES)?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
        let mut map = FxHashMap::default();
        for row in rows {
            let (id, title) = row?;
            map.entry(title_key(&title)).or_insert(id);
        }
        Ok(map)
    }

    pub fn describe(&self) -> Result<CatalogStats> {
        self.conn
            .query_row(sql::STATS, [], |row| {
                let total = row.get::<_, i64>(0)? as u64;
                let with_file = row.get::<_, i64>(1)? as u64;
                Ok(CatalogStats {
                    total,
                    with_file,
                    without_file: total - with_file,
                    min_year: row.get(2)?,
                    max_year: row.get(3)?,
                })
            })
            .context("Failed to query catalog stats")
    }

    /// All titles keyed by paper id as a string (work item form).
    pub fn titles(&self) -> Result<FxHashMap<String, String>> {
        let mut stmt = self.conn.prepare(sql::TITLES)?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
        let mut map = FxHashMap::default();
        for row in rows {
            let (id, title) = row?;
            map.insert(id.to_string(), title);
        }
        Ok(map)
    }
}
