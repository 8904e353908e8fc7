// 📦 Document Store - Where batch documents are fetched from
//
// The pipeline only knows storage paths. A store turns a path into a Workbook;
// which backing storage that is stays behind this trait.

use crate::error::{AnalysisError, Result};
use crate::sheet::Workbook;
use std::collections::HashMap;
use std::path::PathBuf;

pub trait DocumentStore: Send + Sync {
    fn fetch(&self, path: &str) -> Result<Workbook>;
}

/// Documents on the local filesystem, resolved against a root directory.
/// Absolute paths are used as-is.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsDocumentStore { root: root.into() }
    }
}

impl DocumentStore for FsDocumentStore {
    fn fetch(&self, path: &str) -> Result<Workbook> {
        let full = self.root.join(path);
        tracing::debug!(path = %full.display(), "fetching document");
        Workbook::from_path(&full)
    }
}

/// In-memory store keyed by path
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    documents: HashMap<String, Workbook>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, workbook: Workbook) {
        self.documents.insert(path.to_string(), workbook);
    }

    pub fn with(mut self, path: &str, workbook: Workbook) -> Self {
        self.insert(path, workbook);
        self
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn fetch(&self, path: &str) -> Result<Workbook> {
        self.documents.get(path).cloned().ok_or_else(|| {
            AnalysisError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("document '{}' not found in store", path),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Sheet;
    use std::fs;

    #[test]
    fn test_fs_store_reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("comp.csv"), "Last Name,Hourly Cost\nSmith,50\n").unwrap();

        let store = FsDocumentStore::new(dir.path());
        let workbook = store.fetch("comp.csv").unwrap();

        assert_eq!(workbook.sheets.len(), 1);
        assert_eq!(workbook.sheets[0].name, "comp");
        assert_eq!(workbook.sheets[0].cell(1, 0), Some("Smith"));
        assert!(store.fetch("missing.csv").is_err());
    }

    #[test]
    fn test_memory_store() {
        let sheet = Sheet::from_rows("Sheet1", &[&["a"], &["1"]]);
        let store = MemoryDocumentStore::new().with("docs/a", Workbook::single("docs/a", sheet));

        assert_eq!(store.fetch("docs/a").unwrap().origin, "docs/a");
        assert!(matches!(store.fetch("docs/b"), Err(AnalysisError::Io(_))));
    }
}
