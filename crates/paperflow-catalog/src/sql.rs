//! SQL for the catalog

use std::path::Path;

use crate::CsvColumns;

pub const CREATE_SCHEMA: &str = "
CREATE SEQUENCE IF NOT EXISTS paper_id_seq START 1;
CREATE TABLE IF NOT EXISTS paper (
    id          BIGINT PRIMARY KEY DEFAULT nextval('paper_id_seq'),
    title       VARCHAR,
    doi         VARCHAR,
    year        INTEGER,
    authors     VARCHAR,
    journal     VARCHAR,
    file_exists BOOLEAN NOT NULL DEFAULT false
);";

pub const EXISTING_KEYS: &str = "SELECT title, doi FROM paper";

pub const INSERT_PAPER: &str =
    "INSERT INTO paper (title, doi, year, authors, journal) VALUES (?, ?, ?, ?, ?)";

pub const TITLES: &str = "SELECT id, title FROM paper WHERE title IS NOT NULL ORDER BY id";

pub const MARK_FILE_EXISTS: &str = "UPDATE paper SET file_exists = true WHERE id = ?";

pub const STATS: &str = "
SELECT count(*),
       count(*) FILTER (WHERE file_exists),
       min(year),
       max(year)
FROM paper";

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Select the five catalog fields from a CSV, every value as text.
pub fn read_csv(path: &Path, columns: &CsvColumns) -> String {
    format!(
        "SELECT {}, {}, {}, {}, {} FROM read_csv({}, header = true, all_varchar = true)",
        quote_ident(&columns.title),
        quote_ident(&columns.doi),
        quote_ident(&columns.year),
        quote_ident(&columns.authors),
        quote_ident(&columns.journal),
        quote_literal(&path.to_string_lossy()),
    )
}
