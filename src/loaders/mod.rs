// 🏗️ Source Loaders - One loader per source document
// Each loader turns a workbook into typed records plus human-readable log lines.

pub mod compensation;
pub mod expenses;
pub mod ledger;
pub mod revenue;
pub mod time_entries;

pub use compensation::CompensationLoader;
pub use expenses::ExpenseLoader;
pub use ledger::LedgerLoader;
pub use revenue::{RevenueLoader, RevenueSource};
pub use time_entries::TimeEntryLoader;

use crate::error::{AnalysisError, Result};
use crate::sheet::Workbook;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

// ============================================================================
// CORE TYPES
// ============================================================================

/// Which of the five documents a loader reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Revenue,
    Compensation,
    TimeEntries,
    Expenses,
    Ledger,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Revenue,
        SourceKind::Compensation,
        SourceKind::TimeEntries,
        SourceKind::Expenses,
        SourceKind::Ledger,
    ];

    /// Human-readable name for log lines and errors
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Revenue => "Pro Forma",
            SourceKind::Compensation => "Compensation",
            SourceKind::TimeEntries => "Harvest Hours",
            SourceKind::Expenses => "Harvest Expenses",
            SourceKind::Ledger => "P&L",
        }
    }

    /// Short code used for batch columns and tracing fields
    pub fn code(&self) -> &'static str {
        match self {
            SourceKind::Revenue => "pro_forma",
            SourceKind::Compensation => "compensation",
            SourceKind::TimeEntries => "harvest_hours",
            SourceKind::Expenses => "harvest_expenses",
            SourceKind::Ledger => "pnl",
        }
    }
}

/// Loader output: typed records and the log lines produced while reading them
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub records: T,
    pub logs: Vec<String>,
}

impl<T> Loaded<T> {
    pub fn new(records: T) -> Self {
        Loaded {
            records,
            logs: Vec::new(),
        }
    }

    pub fn log(&mut self, kind: SourceKind, message: String) {
        tracing::info!(source = kind.code(), "{}", message);
        self.logs.push(message);
    }
}

/// SourceLoader - one implementation per document type
///
/// Loaders never silently drop required structure: a missing sheet, header
/// or column is an error naming what was looked for.
pub trait SourceLoader: Send + Sync {
    type Output;

    fn load(&self, workbook: &Workbook) -> Result<Loaded<Self::Output>>;

    fn source_kind(&self) -> SourceKind;

    /// Loader version (recorded in batch provenance)
    fn version(&self) -> &str {
        "1.0.0"
    }
}

// ============================================================================
// COLUMN RESOLUTION
// ============================================================================

/// Looks up a logical field by an ordered list of candidate header names
pub struct ColumnResolver<'a> {
    kind: SourceKind,
    headers: &'a [String],
}

impl<'a> ColumnResolver<'a> {
    pub fn new(kind: SourceKind, headers: &'a [String]) -> Self {
        ColumnResolver { kind, headers }
    }

    /// First candidate present wins (case-insensitive, trimmed)
    pub fn find(&self, candidates: &[&str]) -> Option<usize> {
        self.find_excluding(candidates, None)
    }

    pub fn find_excluding(&self, candidates: &[&str], exclude: Option<usize>) -> Option<usize> {
        candidates.iter().find_map(|candidate| {
            self.headers.iter().enumerate().position(|(idx, h)| {
                Some(idx) != exclude && h.trim().eq_ignore_ascii_case(candidate.trim())
            })
        })
    }

    pub fn require(&self, field: &str, candidates: &[&str]) -> Result<usize> {
        self.find(candidates).ok_or_else(|| AnalysisError::MissingColumn {
            source_name: self.kind.name().to_string(),
            field: field.to_string(),
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
        })
    }
}

/// First sheet of a flat-table document
pub(crate) fn first_table_sheet(
    workbook: &Workbook,
    kind: SourceKind,
) -> Result<&crate::sheet::Sheet> {
    workbook
        .first_sheet()
        .filter(|s| s.row_count() > 0)
        .ok_or_else(|| AnalysisError::missing_structure(kind.name(), "document has no rows"))
}

// ============================================================================
// VALUE PARSING
// ============================================================================

/// Parse a currency/number cell: `$1,234.50`, `(250)`, `-3.5`
pub fn parse_amount(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (negative, inner) = if trimmed.starts_with('(') && trimmed.ends_with(')') {
        (true, &trimmed[1..trimmed.len() - 1])
    } else {
        (false, trimmed)
    };

    let cleaned: String = inner
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' ' | '\u{a0}'))
        .collect();

    let parsed: f64 = cleaned.parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }

    Some(if negative { -parsed } else { parsed })
}

/// Parse a date cell in any of the export formats we see
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    // ISO, optionally with a time part
    if let Some(iso) = trimmed.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(iso, "%Y-%m-%d") {
            return Some(date);
        }
    }

    if let Some(year_part) = trimmed.rsplit('/').next() {
        if trimmed.matches('/').count() == 2 {
            let fmt = if year_part.len() == 4 { "%m/%d/%Y" } else { "%m/%d/%y" };
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
                return Some(date);
            }
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%d-%b-%Y") {
        return Some(date);
    }

    // Spreadsheet serial day number
    let serial: f64 = trimmed.parse().ok()?;
    if !(1.0..100_000.0).contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial.trunc() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("$1,234.50"), Some(1234.5));
        assert_eq!(parse_amount("(250)"), Some(-250.0));
        assert_eq!(parse_amount(" -3.5 "), Some(-3.5));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 11, 3).unwrap();
        assert_eq!(parse_date("2025-11-03"), Some(expected));
        assert_eq!(parse_date("2025-11-03T00:00:00"), Some(expected));
        assert_eq!(parse_date("11/03/2025"), Some(expected));
        assert_eq!(parse_date("11/3/25"), Some(expected));
        assert_eq!(parse_date("03-Nov-2025"), Some(expected));
        assert_eq!(parse_date("45964"), Some(expected));
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_column_resolver_candidates() {
        let headers: Vec<String> = vec!["Spent Date".into(), "project".into(), "Hours".into()];
        let resolver = ColumnResolver::new(SourceKind::TimeEntries, &headers);

        assert_eq!(resolver.find(&["Date", "Spent Date"]), Some(0));
        assert_eq!(resolver.find(&["Project Code", "Project"]), Some(1));
        assert_eq!(resolver.find_excluding(&["Project"], Some(1)), None);

        let err = resolver.require("staff", &["Last Name", "LastName"]).unwrap_err();
        assert!(err.to_string().contains("Harvest Hours"));
    }

    #[test]
    fn test_source_kind_labels() {
        assert_eq!(SourceKind::ALL.len(), 5);
        assert_eq!(SourceKind::Ledger.name(), "P&L");
        assert_eq!(SourceKind::TimeEntries.code(), "harvest_hours");
    }
}
