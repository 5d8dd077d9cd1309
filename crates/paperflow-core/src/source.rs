//! Work item enumeration from directory listings

use std::fs;
use std::io;
use std::path::Path;

use crate::item::WorkItem;

/// Names of the immediate subdirectories of `dir`, sorted.
///
/// Converter output has one directory per paper; stray files are ignored.
pub fn list_subdirs(dir: &Path) -> io::Result<Vec<WorkItem>> {
    let mut items = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                items.push(WorkItem::from(name));
            }
        }
    }
    items.sort();
    log::debug!("{} subdirectories in {}", items.len(), dir.display());
    Ok(items)
}

/// File stems of regular files in `dir` with extension `ext`, sorted.
pub fn list_files(dir: &Path, ext: &str) -> io::Result<Vec<WorkItem>> {
    let mut items = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if !path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            items.push(WorkItem::from(stem));
        }
    }
    items.sort();
    log::debug!("{} .{ext} files in {}", items.len(), dir.display());
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ids(items: &[WorkItem]) -> Vec<&str> {
        items.iter().map(WorkItem::as_str).collect()
    }

    #[test]
    fn subdirs_only_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["10", "2", "1", ".cache"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let items = list_subdirs(dir.path()).unwrap();
        assert_eq!(ids(&items), ["1", "2", "10"]);
    }

    #[test]
    fn files_by_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"").unwrap();
        std::fs::write(dir.path().join("a.PDF"), b"").unwrap();
        std::fs::write(dir.path().join("c.txt"), b"").unwrap();
        std::fs::create_dir(dir.path().join("d.pdf")).unwrap();

        let items = list_files(dir.path(), "pdf").unwrap();
        assert_eq!(ids(&items), ["a", "b"]);
    }

    #[test]
    fn missing_dir_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(list_subdirs(&dir.path().join("nope")).is_err());
    }
}
