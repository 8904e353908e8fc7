// 🔑 Project Code - The join key shared by every source document

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized contract/project code.
///
/// Invariant: non-empty, trimmed, NBSP replaced, inner whitespace collapsed.
/// Case is preserved (codes are case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectCode(String);

impl ProjectCode {
    /// Normalize a raw cell value into a code; empty results are an error, never a skip.
    pub fn normalize(raw: &str) -> Result<Self> {
        let cleaned = raw.replace('\u{a0}', " ");
        let normalized = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

        if normalized.is_empty() {
            return Err(AnalysisError::InvalidCode {
                raw: raw.to_string(),
                reason: "empty after normalization".to_string(),
            });
        }

        Ok(ProjectCode(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        !prefix.is_empty() && self.0.starts_with(prefix)
    }
}

impl fmt::Display for ProjectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProjectCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace_and_nbsp() {
        let code = ProjectCode::normalize("  BEH-25\u{a0}\u{a0}01   X ").unwrap();
        assert_eq!(code.as_str(), "BEH-25 01 X");
    }

    #[test]
    fn test_normalize_preserves_case() {
        let code = ProjectCode::normalize("ths-25-01-dev").unwrap();
        assert_eq!(code.as_str(), "ths-25-01-dev");
        assert!(!code.has_prefix("THS-"));
    }

    #[test]
    fn test_empty_code_is_an_error() {
        assert!(matches!(
            ProjectCode::normalize("\u{a0}  "),
            Err(AnalysisError::InvalidCode { .. })
        ));
        assert!(ProjectCode::normalize("").is_err());
    }

    #[test]
    fn test_prefix_check() {
        let code = ProjectCode::normalize("THS-25-01-XYZ").unwrap();
        assert!(code.has_prefix("THS-"));
        assert!(!code.has_prefix(""));
    }
}
