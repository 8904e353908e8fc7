// 🚨 Error Types - Hard failures that abort a batch
// Every variant names the offending codes/values so an operator can fix the source document.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Sheet '{sheet}' not found in {source_name} workbook")]
    MissingSheet { source_name: String, sheet: String },

    #[error("{source_name}: {detail}")]
    MissingStructure { source_name: String, detail: String },

    #[error("{source_name}: required column '{field}' not found. Tried: {}", candidates.join(", "))]
    MissingColumn {
        source_name: String,
        field: String,
        candidates: Vec<String>,
    },

    #[error("Invalid project code {raw:?}: {reason}")]
    InvalidCode { raw: String, reason: String },

    #[error("Invalid period '{0}'. Expected e.g. 'November2025' or '2025-11'")]
    InvalidPeriod(String),

    #[error("Allocation tag conflict for contract code '{code}': found both 'Data' and 'Wellness' tags")]
    AllocationTagConflict { code: String },

    #[error("Duplicate staff identities in compensation file: {}. Staff identity must be unique", names.join(", "))]
    DuplicateStaff { names: Vec<String> },

    #[error("Classification conflict for {}: code appears as both revenue center (revenue source) and cost center (config)", codes.iter().map(|c| format!("'{}'", c)).collect::<Vec<_>>().join(", "))]
    ClassificationConflict { codes: Vec<String> },

    #[error("Revenue sum mismatch: calculated ${calculated:.2} vs reported total ${reported:.2} (diff: ${difference:.2})")]
    RevenueMismatch {
        calculated: f64,
        reported: f64,
        difference: f64,
    },

    #[error("{pool} allocation does not reconcile to pool: allocated ${allocated:.2} vs pool ${pool_total:.2} (diff: ${difference:.2}, tolerance {tolerance})")]
    AllocationMismatch {
        pool: String,
        allocated: f64,
        pool_total: f64,
        difference: f64,
        tolerance: f64,
    },

    #[error("Batch {0} not found")]
    BatchNotFound(String),

    #[error("Batch {batch_id} is missing document paths: {}", missing.join(", "))]
    MissingSourcePaths {
        batch_id: String,
        missing: Vec<String>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid tagging rule pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn missing_structure(source_name: &str, detail: impl Into<String>) -> Self {
        AnalysisError::MissingStructure {
            source_name: source_name.to_string(),
            detail: detail.into(),
        }
    }

    /// Loader/allocation failures abort before persistence; database errors do too,
    /// but are reported separately so callers can decide whether to retry.
    pub fn is_data_error(&self) -> bool {
        !matches!(
            self,
            AnalysisError::Database(_) | AnalysisError::Io(_) | AnalysisError::BatchNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_codes() {
        let err = AnalysisError::ClassificationConflict {
            codes: vec!["THS-25-01-DEV".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'THS-25-01-DEV'"));
        assert!(msg.contains("revenue center"));
    }

    #[test]
    fn test_mismatch_message_includes_discrepancy() {
        let err = AnalysisError::AllocationMismatch {
            pool: "SG&A".to_string(),
            allocated: 299.5,
            pool_total: 300.0,
            difference: 0.5,
            tolerance: 0.01,
        };
        assert!(err.to_string().contains("diff: $0.50"));
        assert!(err.is_data_error());
    }

    #[test]
    fn test_missing_column_lists_candidates() {
        let err = AnalysisError::MissingColumn {
            source_name: "Compensation".to_string(),
            field: "staff".to_string(),
            candidates: vec!["Last Name".to_string(), "LastName".to_string()],
        };
        assert!(err.to_string().contains("Tried: Last Name, LastName"));
    }
}
