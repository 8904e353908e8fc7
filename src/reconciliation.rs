// ⚖️ Reconciliation Engine - Validate aggregated totals match their source
//
// Every derived total is checked against the authoritative figure it came from:
//   sum(project revenue)     = revenue-row total
//   sum(allocation per pool) = pool total
// A difference above the tolerance (default $0.01) is a discrepancy.

use serde::{Deserialize, Serialize};

// ============================================================================
// RECONCILIATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReconciliationResult {
    /// Within tolerance
    Balanced { calculated: f64, expected: f64 },

    Discrepancy {
        calculated: f64,
        expected: f64,
        difference: f64,
        tolerance: f64,
    },
}

impl ReconciliationResult {
    pub fn is_balanced(&self) -> bool {
        matches!(self, ReconciliationResult::Balanced { .. })
    }

    pub fn has_discrepancy(&self) -> bool {
        !self.is_balanced()
    }

    pub fn difference(&self) -> f64 {
        match self {
            ReconciliationResult::Balanced { calculated, expected } => (calculated - expected).abs(),
            ReconciliationResult::Discrepancy { difference, .. } => *difference,
        }
    }
}

// ============================================================================
// RECONCILIATION REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// What was reconciled, e.g. "SG&A allocation"
    pub label: String,
    pub result: ReconciliationResult,
}

impl ReconciliationReport {
    pub fn is_balanced(&self) -> bool {
        self.result.is_balanced()
    }

    pub fn summary(&self) -> String {
        match &self.result {
            ReconciliationResult::Balanced { calculated, .. } => {
                format!("{} reconciles (${:.2})", self.label, calculated)
            }
            ReconciliationResult::Discrepancy {
                calculated,
                expected,
                difference,
                ..
            } => format!(
                "{} mismatch: ${:.2} vs ${:.2} (diff: ${:.2})",
                self.label, calculated, expected, difference
            ),
        }
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

pub struct ReconciliationEngine {
    /// Tolerance for floating-point comparisons (default: $0.01)
    pub tolerance: f64,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine { tolerance: 0.01 }
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        ReconciliationEngine { tolerance }
    }

    pub fn reconcile(&self, label: &str, calculated: f64, expected: f64) -> ReconciliationReport {
        let difference = (calculated - expected).abs();

        let result = if difference <= self.tolerance {
            ReconciliationResult::Balanced {
                calculated,
                expected,
            }
        } else {
            ReconciliationResult::Discrepancy {
                calculated,
                expected,
                difference,
                tolerance: self.tolerance,
            }
        };

        ReconciliationReport {
            label: label.to_string(),
            result,
        }
    }

    /// Sum `amounts` and reconcile against `expected`
    pub fn reconcile_sum<I>(&self, label: &str, amounts: I, expected: f64) -> ReconciliationReport
    where
        I: IntoIterator<Item = f64>,
    {
        let calculated: f64 = amounts.into_iter().sum();
        self.reconcile(label, calculated, expected)
    }

    pub fn quick_check(&self, calculated: f64, expected: f64) -> bool {
        (calculated - expected).abs() <= self.tolerance
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_within_tolerance() {
        let engine = ReconciliationEngine::new();
        let report = engine.reconcile_sum("SG&A allocation", vec![100.0, 199.995], 300.0);

        assert!(report.is_balanced());
        assert!(report.summary().starts_with("SG&A allocation reconciles"));
        println!("✅ {}", report.summary());
    }

    #[test]
    fn test_discrepancy_reports_difference() {
        let engine = ReconciliationEngine::new();
        let report = engine.reconcile("Revenue", 299.5, 300.0);

        assert!(report.result.has_discrepancy());
        assert!((report.result.difference() - 0.5).abs() < 1e-9);
        assert_eq!(
            report.summary(),
            "Revenue mismatch: $299.50 vs $300.00 (diff: $0.50)"
        );
    }

    #[test]
    fn test_custom_tolerance() {
        let engine = ReconciliationEngine::with_tolerance(1.0);
        assert!(engine.quick_check(10.0, 10.9));
        assert!(!engine.quick_check(10.0, 11.5));
        assert!(ReconciliationEngine::default().quick_check(0.0, 0.0));
    }
}
