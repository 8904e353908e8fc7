// ✅ Validation Engine - Pass / warn / fail checks over a finished analysis
//
// Five families run in order: completeness, key integrity, pool reasonableness,
// mathematical reconciliation, soft reasonableness. Items are collected, never
// thrown; a batch is valid when no item is a fail.

use crate::allocation::{OverheadPool, OverheadPools};
use crate::config::AnalysisConfig;
use crate::entities::{
    CompensationRecord, CostCenter, ExpenseRecord, LedgerAccount, RevenueCenter, TimeEntryRecord,
};
use crate::loaders::compensation::find_duplicate_staff;
use crate::reconciliation::ReconciliationEngine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const SAMPLE_SIZE: usize = 5;

// ============================================================================
// VALIDATION ITEM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationKind {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckFamily {
    Completeness,
    KeyIntegrity,
    PoolReasonableness,
    Reconciliation,
    Reasonableness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationItem {
    #[serde(rename = "type")]
    pub kind: ValidationKind,
    pub check: CheckFamily,
    pub message: String,
}

impl ValidationItem {
    pub fn pass(check: CheckFamily, message: impl Into<String>) -> Self {
        ValidationItem {
            kind: ValidationKind::Pass,
            check,
            message: message.into(),
        }
    }

    pub fn warn(check: CheckFamily, message: impl Into<String>) -> Self {
        ValidationItem {
            kind: ValidationKind::Warn,
            check,
            message: message.into(),
        }
    }

    pub fn fail(check: CheckFamily, message: impl Into<String>) -> Self {
        ValidationItem {
            kind: ValidationKind::Fail,
            check,
            message: message.into(),
        }
    }
}

// ============================================================================
// VALIDATION REPORT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub items: Vec<ValidationItem>,
}

impl ValidationReport {
    pub fn count(&self, kind: ValidationKind) -> usize {
        self.items.iter().filter(|i| i.kind == kind).count()
    }

    pub fn passed(&self) -> bool {
        self.count(ValidationKind::Fail) == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationItem> {
        self.items.iter().filter(|i| i.kind == ValidationKind::Fail)
    }

    pub fn summary(&self) -> String {
        format!(
            "PASS: {} | WARN: {} | FAIL: {}",
            self.count(ValidationKind::Pass),
            self.count(ValidationKind::Warn),
            self.count(ValidationKind::Fail)
        )
    }

    fn push(&mut self, item: ValidationItem) {
        self.items.push(item);
    }
}

// ============================================================================
// INPUT
// ============================================================================

/// Everything the checks look at; borrowed from the pipeline
pub struct ValidationInput<'a> {
    pub revenue_centers: &'a [RevenueCenter],
    pub cost_centers: &'a [CostCenter],
    /// Total reported by the revenue document itself
    pub reported_revenue: f64,
    pub pools: Option<&'a OverheadPools>,
    pub time_entries: &'a [TimeEntryRecord],
    pub expenses: &'a [ExpenseRecord],
    pub compensation: &'a [CompensationRecord],
    pub ledger: &'a [LedgerAccount],
}

// ============================================================================
// VALIDATION ENGINE
// ============================================================================

pub struct ValidationEngine {
    pub tolerance: f64,
    pub sga_ratio_fail: f64,
    pub sga_ratio_warn: f64,
    pub unmatched_ledger_warn_threshold: usize,
}

impl ValidationEngine {
    pub fn new() -> Self {
        ValidationEngine {
            tolerance: 0.01,
            sga_ratio_fail: 2.0,
            sga_ratio_warn: 1.0,
            unmatched_ledger_warn_threshold: 0,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        ValidationEngine {
            tolerance: config.tolerance,
            sga_ratio_fail: config.sga_ratio_fail,
            sga_ratio_warn: config.sga_ratio_warn,
            unmatched_ledger_warn_threshold: config.unmatched_ledger_warn_threshold,
        }
    }

    pub fn validate(&self, input: &ValidationInput) -> ValidationReport {
        let mut report = ValidationReport::default();

        self.check_completeness(input, &mut report);
        self.check_key_integrity(input, &mut report);
        self.check_pool_reasonableness(input, &mut report);
        self.check_reconciliation(input, &mut report);
        self.check_reasonableness(input, &mut report);

        tracing::info!(
            passed = report.passed(),
            "validation {}",
            report.summary()
        );
        report
    }

    // Rule family 1
    fn check_completeness(&self, input: &ValidationInput, report: &mut ValidationReport) {
        use CheckFamily::Completeness as C;

        if input.revenue_centers.is_empty() {
            report.push(ValidationItem::fail(C, "No revenue centers found"));
        } else {
            report.push(ValidationItem::pass(C, "Revenue centers loaded"));
        }

        match input.pools {
            Some(pools) if pools.is_complete() => {
                report.push(ValidationItem::pass(C, "Overhead pools calculated"))
            }
            _ => report.push(ValidationItem::fail(C, "Overhead pools missing required values")),
        }

        if input.compensation.is_empty() {
            report.push(ValidationItem::fail(C, "Compensation data missing or empty"));
        } else {
            report.push(ValidationItem::pass(C, "Compensation loaded"));
        }

        if input.time_entries.is_empty() {
            report.push(ValidationItem::warn(C, "Harvest Hours is empty"));
        }
        if input.expenses.is_empty() {
            report.push(ValidationItem::warn(C, "Harvest Expenses is empty"));
        }
    }

    // Rule family 2
    fn check_key_integrity(&self, input: &ValidationInput, report: &mut ValidationReport) {
        use CheckFamily::KeyIntegrity as K;

        let duplicates = find_duplicate_staff(input.compensation);
        if !duplicates.is_empty() {
            report.push(ValidationItem::fail(
                K,
                format!("Duplicate Last Names in Compensation: {}", duplicates.join(", ")),
            ));
        } else if !input.compensation.is_empty() {
            report.push(ValidationItem::pass(K, "Unique Last Names in Compensation"));
        }

        if !input.time_entries.is_empty() && !input.compensation.is_empty() {
            let rated: BTreeSet<&str> =
                input.compensation.iter().map(|c| c.staff_key.as_str()).collect();
            let missing: BTreeSet<&str> = input
                .time_entries
                .iter()
                .map(|t| t.staff_key.as_str())
                .filter(|s| !rated.contains(s))
                .collect();

            if missing.is_empty() {
                report.push(ValidationItem::pass(
                    K,
                    "All Harvest Hours staff have compensation records",
                ));
            } else {
                report.push(ValidationItem::warn(
                    K,
                    format!(
                        "Harvest Hours staff missing in Compensation: {}",
                        missing.into_iter().collect::<Vec<_>>().join(", ")
                    ),
                ));
            }
        }

        let cost_codes: BTreeSet<&str> = input.cost_centers.iter().map(|c| c.code.as_str()).collect();
        let conflicts: BTreeSet<&str> = input
            .revenue_centers
            .iter()
            .map(|rc| rc.code.as_str())
            .filter(|c| cost_codes.contains(c))
            .collect();

        if conflicts.is_empty() {
            report.push(ValidationItem::pass(K, "No revenue/cost center code conflicts"));
        } else {
            report.push(ValidationItem::fail(
                K,
                format!(
                    "Codes appear as both revenue and cost centers: {}",
                    conflicts.into_iter().collect::<Vec<_>>().join(", ")
                ),
            ));
        }
    }

    // Rule family 3
    fn check_pool_reasonableness(&self, input: &ValidationInput, report: &mut ValidationReport) {
        use CheckFamily::PoolReasonableness as P;

        let Some(pools) = input.pools else { return };
        let total_revenue: f64 = input.revenue_centers.iter().map(|rc| rc.revenue).sum();
        if total_revenue <= 0.0 {
            return;
        }

        let ratio = pools.sga_pool / total_revenue;
        let detail = format!(
            "SG&A pool (${:.2}) is {:.1}x revenue (${:.2})",
            pools.sga_pool, ratio, total_revenue
        );

        if ratio > self.sga_ratio_fail {
            report.push(ValidationItem::fail(
                P,
                format!("{} - likely P&L extraction error (income/subtotals included)", detail),
            ));
        } else if ratio > self.sga_ratio_warn {
            report.push(ValidationItem::warn(P, format!("{} - verify this is expected", detail)));
        } else {
            report.push(ValidationItem::pass(
                P,
                format!("SG&A pool is {:.1}% of revenue (reasonable)", ratio * 100.0),
            ));
        }
    }

    // Rule family 4
    fn check_reconciliation(&self, input: &ValidationInput, report: &mut ValidationReport) {
        use CheckFamily::Reconciliation as R;

        if input.revenue_centers.is_empty() {
            return;
        }
        let engine = ReconciliationEngine::with_tolerance(self.tolerance);

        let revenue = engine.reconcile_sum(
            "Revenue sum",
            input.revenue_centers.iter().map(|rc| rc.revenue),
            input.reported_revenue,
        );
        if revenue.is_balanced() {
            report.push(ValidationItem::pass(
                R,
                format!("Revenue sum matches Pro Forma (+/-{})", self.tolerance),
            ));
        } else {
            report.push(ValidationItem::fail(
                R,
                format!(
                    "Revenue sum does not match Pro Forma (diff ${:.2})",
                    revenue.result.difference()
                ),
            ));
        }

        let Some(pools) = input.pools else { return };
        for pool in OverheadPool::ALL {
            let label = pool.column().replace('_', " ");
            let check = engine.reconcile_sum(
                &label,
                input.revenue_centers.iter().map(|rc| pool.allocation(rc)),
                pools.pool(pool),
            );

            if check.is_balanced() {
                report.push(ValidationItem::pass(
                    R,
                    format!("{} sums to pool (+/-{})", label, self.tolerance),
                ));
            } else {
                report.push(ValidationItem::fail(
                    R,
                    format!(
                        "{} does not sum to pool (diff ${:.2})",
                        label,
                        check.result.difference()
                    ),
                ));
            }
        }
    }

    // Rule family 5: warnings only
    fn check_reasonableness(&self, input: &ValidationInput, report: &mut ValidationReport) {
        use CheckFamily::Reasonableness as S;

        let no_hours: Vec<&str> = input
            .revenue_centers
            .iter()
            .filter(|rc| rc.hours == 0.0)
            .map(|rc| rc.code.as_str())
            .collect();
        if !no_hours.is_empty() {
            report.push(ValidationItem::warn(
                S,
                format!(
                    "{} revenue centers have revenue but no hours: {}",
                    no_hours.len(),
                    sample(&no_hours)
                ),
            ));
        }

        let classified: BTreeSet<&str> = input
            .revenue_centers
            .iter()
            .map(|rc| rc.code.as_str())
            .chain(input.cost_centers.iter().map(|cc| cc.code.as_str()))
            .collect();
        let unclassified: Vec<&str> = input
            .time_entries
            .iter()
            .map(|t| t.code.as_str())
            .filter(|c| !classified.contains(c))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if !unclassified.is_empty() {
            report.push(ValidationItem::warn(
                S,
                format!(
                    "{} codes have hours but no revenue (non-revenue clients): {}",
                    unclassified.len(),
                    sample(&unclassified)
                ),
            ));
        }

        let defaulted: Vec<&str> = input
            .ledger
            .iter()
            .filter(|a| a.is_defaulted())
            .map(|a| a.account_name.as_str())
            .collect();
        if defaulted.len() > self.unmatched_ledger_warn_threshold {
            report.push(ValidationItem::warn(
                S,
                format!(
                    "{} P&L accounts defaulted to SG&A (unmatched): {}",
                    defaulted.len(),
                    sample(&defaulted)
                ),
            ));
        } else if !input.ledger.is_empty() {
            report.push(ValidationItem::pass(
                S,
                "All P&L accounts matched by tagging rules or assigned appropriately",
            ));
        }
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// First few entries, with an ellipsis when truncated
fn sample(items: &[&str]) -> String {
    let shown = items.iter().take(SAMPLE_SIZE).copied().collect::<Vec<_>>().join(", ");
    if items.len() > SAMPLE_SIZE {
        format!("{}...", shown)
    } else {
        shown
    }
}

// ============================================================================
// TESTS
// ============================================================================
