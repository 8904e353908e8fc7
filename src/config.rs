// ⚙️ Analysis Configuration - Immutable tables injected into every phase

use crate::entities::CostPool;
use crate::error::{AnalysisError, Result};
use crate::rules::{default_tagging_rules, TaggingRule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCenterDefinition {
    pub code: String,
    pub description: String,
    pub pool: CostPool,
}

impl CostCenterDefinition {
    fn new(code: &str, description: &str, pool: CostPool) -> Self {
        CostCenterDefinition {
            code: code.to_string(),
            description: description.to_string(),
            pool,
        }
    }
}

/// Income statement lines that never belong in an overhead pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerExclusions {
    /// Lines starting with any of these (subtotals)
    pub prefixes: Vec<String>,
    /// Case-insensitive substrings marking income lines
    pub income_keywords: Vec<String>,
    /// Case-insensitive whole-name matches
    pub exact_names: Vec<String>,
    /// Case-insensitive substrings marking summary lines
    pub summary_keywords: Vec<String>,
}

impl LedgerExclusions {
    pub fn is_excluded(&self, account_name: &str) -> bool {
        let name = account_name.trim();
        let lower = name.to_lowercase();

        self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
            || self.exact_names.iter().any(|n| lower == n.to_lowercase())
            || self
                .income_keywords
                .iter()
                .chain(self.summary_keywords.iter())
                .any(|k| lower.contains(&k.to_lowercase()))
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for LedgerExclusions {
    fn default() -> Self {
        LedgerExclusions {
            prefixes: strings(&["Total - ", "Total -"]),
            income_keywords: strings(&[
                "sales",
                "fixed fee",
                "recurring revenue",
                "other income",
                "interest income",
                "dividend income",
            ]),
            exact_names: strings(&["other"]),
            summary_keywords: strings(&[
                "gross profit",
                "net income",
                "net ordinary income",
                "operating income",
                "total income",
                "total expenses",
                "total expense",
                "total payroll",
                "total general",
                "total administrative",
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Revenue-workbook section name → analysis category label
    pub category_mapping: BTreeMap<String, String>,

    pub cost_centers: Vec<CostCenterDefinition>,

    /// Ordered; first match wins
    pub tagging_rules: Vec<TaggingRule>,

    pub ledger_exclusions: LedgerExclusions,

    /// Codes with this prefix and no revenue are inferred cost centers
    pub internal_code_prefix: String,

    pub revenue_sheet: String,
    pub ledger_sheet: String,

    /// Divisor for rates derived from monthly compensation
    pub expected_monthly_hours: f64,

    pub tolerance: f64,

    pub include_cost_centers_in_pools: bool,

    pub sga_ratio_fail: f64,
    pub sga_ratio_warn: f64,

    /// Warn when more ledger lines than this fell back to SGA
    pub unmatched_ledger_warn_threshold: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let category_mapping = [
            ("BEH", "Behavioral Health"),
            ("PAD", "Performance Analytics"),
            ("MAR", "Market Research"),
            ("WWB", "Workplace Well-Being"),
            ("CMH", "Community Health"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        AnalysisConfig {
            category_mapping,
            cost_centers: default_cost_centers(),
            tagging_rules: default_tagging_rules(),
            ledger_exclusions: LedgerExclusions::default(),
            internal_code_prefix: "THS-".to_string(),
            revenue_sheet: "PRO FORMA 2025".to_string(),
            ledger_sheet: "IncomeStatement".to_string(),
            expected_monthly_hours: 216.6667,
            tolerance: 0.01,
            include_cost_centers_in_pools: true,
            sga_ratio_fail: 2.0,
            sga_ratio_warn: 1.0,
            unmatched_ledger_warn_threshold: 0,
        }
    }
}

fn default_cost_centers() -> Vec<CostCenterDefinition> {
    use CostPool::{Data, Sga};

    vec![
        CostCenterDefinition::new("THS-25-01-DEV", "Business Development", Sga),
        CostCenterDefinition::new("THS-25-01-BAD", "Business Administration", Sga),
        CostCenterDefinition::new("THS-25-01-MTG", "Internal Meetings", Sga),
        CostCenterDefinition::new("THS-25-01-SAD", "Starset Dev Cost", Data),
        CostCenterDefinition::new("THS-25-01-OOO", "Out of Office", Sga),
        CostCenterDefinition::new("THS-25-01-PAD", "Personal Administration", Sga),
        CostCenterDefinition::new("THS-25-01-PRO", "Professional Development", Sga),
        CostCenterDefinition::new("THS-25-01-SPP", "Internal Special Projects", Sga),
        CostCenterDefinition::new("THS-25-01-TEA", "Team Building", Sga),
        CostCenterDefinition::new("THS-25-01-COM", "Communications", Sga),
        CostCenterDefinition::new("THS-25-01-CSR", "Corporate Social Responsibility", Sga),
        CostCenterDefinition::new("HC3", "Health Care Council of Chicago", Sga),
        CostCenterDefinition::new("GEH", "Work Place Well-Being Administration", Sga),
        CostCenterDefinition::new("BEH-25-01-APR", "Alliance for Addiction Payment Reform", Sga),
    ]
}

impl AnalysisConfig {
    /// Load from JSON; absent fields keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: AnalysisConfig = serde_json::from_str(&content).map_err(|e| {
            AnalysisError::Config(format!("failed to parse {:?}: {}", path.as_ref(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.expected_monthly_hours <= 0.0 {
            return Err(AnalysisError::Config(
                "expected_monthly_hours must be positive".to_string(),
            ));
        }
        if self.tolerance < 0.0 {
            return Err(AnalysisError::Config("tolerance must not be negative".to_string()));
        }
        Ok(())
    }

    /// Category label for a revenue-workbook section; unmapped sections are "Unknown"
    pub fn category_for(&self, section: Option<&str>) -> String {
        section
            .and_then(|s| self.category_mapping.get(s.trim()))
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables() {
        let config = AnalysisConfig::default();
        assert_eq!(config.cost_centers.len(), 14);
        let sad = config.cost_centers.iter().find(|cc| cc.code == "THS-25-01-SAD").unwrap();
        assert_eq!(sad.pool, CostPool::Data);
        assert_eq!(config.category_for(Some("BEH")), "Behavioral Health");
        assert_eq!(config.category_for(Some("ZZZ")), "Unknown");
        assert_eq!(config.category_for(None), "Unknown");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ledger_exclusions() {
        let exclusions = LedgerExclusions::default();
        assert!(exclusions.is_excluded("Total - Payroll"));
        assert!(exclusions.is_excluded("Fixed Fee Revenue"));
        assert!(exclusions.is_excluded("Other"));
        assert!(exclusions.is_excluded("Net Ordinary Income"));
        assert!(!exclusions.is_excluded("Other Expenses"));
        assert!(!exclusions.is_excluded("Office Rent"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"tolerance": 0.5, "revenue_sheet": "PRO FORMA 2026"}"#).unwrap();

        let config = AnalysisConfig::from_file(&path).unwrap();
        assert_eq!(config.tolerance, 0.5);
        assert_eq!(config.revenue_sheet, "PRO FORMA 2026");
        assert_eq!(config.ledger_sheet, "IncomeStatement");
        assert_eq!(config.cost_centers.len(), 14);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"expected_monthly_hours": 0}"#).unwrap();

        assert!(matches!(
            AnalysisConfig::from_file(&path),
            Err(AnalysisError::Config(_))
        ));
    }
}
