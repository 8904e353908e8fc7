// 📄 Spreadsheet Model - Workbooks and sheets as plain string grids
// Source documents arrive as CSV exports; a workbook is one or more named sheets.

use crate::error::Result;
use csv::ReaderBuilder;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

// ============================================================================
// SHEET
// ============================================================================

/// One sheet: rows of trimmed cells. Rows may be ragged.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: &str, rows: Vec<Vec<String>>) -> Self {
        Sheet {
            name: name.to_string(),
            rows,
        }
    }

    /// Build a sheet from string literals (mostly for tests and fixtures)
    pub fn from_rows(name: &str, rows: &[&[&str]]) -> Self {
        Sheet {
            name: name.to_string(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    /// Parse CSV bytes without assuming a header row
    pub fn from_csv_bytes(name: &str, bytes: &[u8]) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|c| c.to_string()).collect());
        }

        Ok(Sheet::new(name, rows))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, idx: usize) -> Option<&[String]> {
        self.rows.get(idx).map(|r| r.as_slice())
    }

    /// Non-blank cell value, trimmed. Blank and NBSP-only cells read as `None`.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|c| c.trim_matches(|ch: char| ch.is_whitespace() || ch == '\u{a0}'))
            .filter(|c| !c.is_empty())
    }

    /// Header-first view: row 0 is the header, the rest are records
    pub fn table(&self) -> Option<Table<'_>> {
        let header = self.rows.first()?;
        Some(Table {
            headers: header.iter().map(|h| h.trim().to_string()).collect(),
            sheet: self,
        })
    }
}

// ============================================================================
// TABLE VIEW
// ============================================================================

/// Flat table over a sheet whose first row names the columns
pub struct Table<'a> {
    pub headers: Vec<String>,
    sheet: &'a Sheet,
}

impl<'a> Table<'a> {
    /// Data rows (1-based sheet row numbers are `idx + 2`)
    pub fn records(&self) -> impl Iterator<Item = TableRow<'a>> + '_ {
        let sheet = self.sheet;
        (1..sheet.rows.len()).map(move |row| TableRow { sheet, row })
    }

    pub fn len(&self) -> usize {
        self.sheet.rows.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy)]
pub struct TableRow<'a> {
    sheet: &'a Sheet,
    pub row: usize,
}

impl<'a> TableRow<'a> {
    pub fn get(&self, col: usize) -> Option<&'a str> {
        self.sheet.cell(self.row, col)
    }

    pub fn get_opt(&self, col: Option<usize>) -> Option<&'a str> {
        col.and_then(|c| self.get(c))
    }

    pub fn is_blank(&self) -> bool {
        self.sheet
            .row(self.row)
            .map(|r| r.iter().all(|c| c.trim().is_empty()))
            .unwrap_or(true)
    }
}

// ============================================================================
// WORKBOOK
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    /// Where the document came from (path or storage key)
    pub origin: String,
    pub sheets: Vec<Sheet>,
    /// SHA-256 over the raw bytes of every sheet, for the batch audit record
    pub fingerprint: String,
}

impl Workbook {
    pub fn new(origin: &str, sheets: Vec<Sheet>) -> Self {
        let mut hasher = Sha256::new();
        for sheet in &sheets {
            hasher.update(sheet.name.as_bytes());
            for row in &sheet.rows {
                hasher.update(row.join("\u{1f}").as_bytes());
                hasher.update(b"\n");
            }
        }
        Workbook {
            origin: origin.to_string(),
            sheets,
            fingerprint: format!("{:x}", hasher.finalize()),
        }
    }

    pub fn single(origin: &str, sheet: Sheet) -> Self {
        Workbook::new(origin, vec![sheet])
    }

    /// Read a `.csv` file as a one-sheet workbook (sheet named after the file stem),
    /// or a directory as a workbook with one sheet per `.csv` file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let origin = path.display().to_string();

        if path.is_dir() {
            let mut entries: Vec<_> = fs::read_dir(path)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.extension()
                        .and_then(|e| e.to_str())
                        .map(|e| e.eq_ignore_ascii_case("csv"))
                        .unwrap_or(false)
                })
                .collect();
            entries.sort();

            let mut sheets = Vec::with_capacity(entries.len());
            for entry in entries {
                sheets.push(Sheet::from_csv_bytes(&sheet_name(&entry), &fs::read(&entry)?)?);
            }
            return Ok(Workbook::new(&origin, sheets));
        }

        let bytes = fs::read(path)?;
        Ok(Workbook::single(
            &origin,
            Sheet::from_csv_bytes(&sheet_name(path), &bytes)?,
        ))
    }

    /// Case-insensitive sheet lookup
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name.trim().eq_ignore_ascii_case(name.trim()))
    }

    pub fn first_sheet(&self) -> Option<&Sheet> {
        self.sheets.first()
    }
}

fn sheet_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Sheet1")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_parsing_keeps_ragged_rows() {
        let sheet = Sheet::from_csv_bytes("Test", b"a,b,c\n1,2\n,,\n").unwrap();
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.cell(1, 1), Some("2"));
        assert_eq!(sheet.cell(1, 2), None);
        assert_eq!(sheet.cell(2, 0), None);
    }

    #[test]
    fn test_nbsp_cell_is_blank() {
        let sheet = Sheet::from_rows("Test", &[&["\u{a0} ", "x"]]);
        assert_eq!(sheet.cell(0, 0), None);
        assert_eq!(sheet.cell(0, 1), Some("x"));
    }

    #[test]
    fn test_table_view() {
        let sheet = Sheet::from_rows(
            "Hours",
            &[&["Date", "Hours"], &["2025-11-03", "4"], &["", ""]],
        );
        let table = sheet.table().unwrap();
        assert_eq!(table.headers, vec!["Date", "Hours"]);
        assert_eq!(table.len(), 2);

        let rows: Vec<_> = table.records().collect();
        assert_eq!(rows[0].get(1), Some("4"));
        assert!(rows[1].is_blank());
    }

    #[test]
    fn test_workbook_sheet_lookup_and_fingerprint() {
        let a = Workbook::single("a.csv", Sheet::from_rows("IncomeStatement", &[&["x"]]));
        let b = Workbook::single("b.csv", Sheet::from_rows("IncomeStatement", &[&["x"]]));
        let c = Workbook::single("c.csv", Sheet::from_rows("IncomeStatement", &[&["y"]]));

        assert!(a.sheet("incomestatement").is_some());
        assert!(a.sheet("PRO FORMA 2025").is_none());
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_ne!(a.fingerprint, c.fingerprint);
    }

    #[test]
    fn test_workbook_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("IncomeStatement.csv"), "Account,Total\nRent,100\n").unwrap();
        std::fs::write(dir.path().join("Notes.txt"), "ignored").unwrap();

        let wb = Workbook::from_path(dir.path()).unwrap();
        assert_eq!(wb.sheets.len(), 1);
        assert_eq!(wb.sheet("IncomeStatement").unwrap().cell(1, 1), Some("100"));
    }
}
