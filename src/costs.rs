// 🧮 Direct Cost Computation - Labor and expenses per code
// Time entries join compensation by staff key; expenses join by code.

use crate::classification::Classification;
use crate::entities::{
    CompensationRecord, ExpenseDetail, ExpenseRecord, HoursDetail, ProjectCode, TimeEntryRecord,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CodeLabor {
    pub hours: f64,
    pub labor_cost: f64,
}

// ============================================================================
// LABOR
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaborCosts {
    pub by_code: BTreeMap<ProjectCode, CodeLabor>,
    /// One row per (code, staff), ordered by code then staff
    pub detail: Vec<HoursDetail>,
    /// Staff with hours but no compensation record, sorted
    pub missing_staff: Vec<String>,
    pub missing_hours: f64,
}

impl LaborCosts {
    pub fn total_labor_cost(&self) -> f64 {
        self.by_code.values().map(|l| l.labor_cost).sum()
    }

    pub fn for_code(&self, code: &ProjectCode) -> CodeLabor {
        self.by_code.get(code).copied().unwrap_or_default()
    }
}

/// Hours of unrated staff still count toward per-code hours; they carry no cost.
pub fn calculate_labor_costs(
    time_entries: &[TimeEntryRecord],
    compensation: &[CompensationRecord],
) -> (LaborCosts, Vec<String>) {
    let rates: HashMap<&str, f64> = compensation
        .iter()
        .map(|c| (c.staff_key.as_str(), c.hourly_cost))
        .collect();

    let mut detail: BTreeMap<(ProjectCode, String), HoursDetail> = BTreeMap::new();
    let mut costs = LaborCosts::default();
    let mut missing: BTreeSet<String> = BTreeSet::new();

    for entry in time_entries {
        let rate = rates.get(entry.staff_key.as_str()).copied();
        let labor_cost = rate.map(|r| r * entry.hours).unwrap_or(0.0);

        if rate.is_none() {
            missing.insert(entry.staff_key.clone());
            costs.missing_hours += entry.hours;
        }

        let summary = costs.by_code.entry(entry.code.clone()).or_default();
        summary.hours += entry.hours;
        summary.labor_cost += labor_cost;

        let row = detail
            .entry((entry.code.clone(), entry.staff_key.clone()))
            .or_insert_with(|| HoursDetail {
                code: entry.code.clone(),
                staff_key: entry.staff_key.clone(),
                hours: 0.0,
                hourly_cost: rate,
                labor_cost: 0.0,
            });
        row.hours += entry.hours;
        row.labor_cost += labor_cost;
    }

    costs.detail = detail.into_values().collect();
    costs.missing_staff = missing.into_iter().collect();

    let mut logs = Vec::new();
    if !costs.missing_staff.is_empty() {
        let message = format!(
            "{} staff missing compensation records ({:.1} hours without labor cost)",
            costs.missing_staff.len(),
            costs.missing_hours
        );
        tracing::warn!(staff = costs.missing_staff.len(), hours = costs.missing_hours, "{}", message);
        logs.push(message);
    }

    (costs, logs)
}

// ============================================================================
// EXPENSES
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseCosts {
    pub by_code: BTreeMap<ProjectCode, f64>,
    /// Input order
    pub detail: Vec<ExpenseDetail>,
}

impl ExpenseCosts {
    pub fn total(&self) -> f64 {
        self.by_code.values().sum()
    }

    pub fn for_code(&self, code: &ProjectCode) -> f64 {
        self.by_code.get(code).copied().unwrap_or(0.0)
    }
}

/// Reimbursable lines are already gone; anything left here is cost
pub fn calculate_expense_costs(expenses: &[ExpenseRecord]) -> ExpenseCosts {
    let mut costs = ExpenseCosts::default();

    for expense in expenses.iter().filter(|e| e.billable.is_cost()) {
        *costs.by_code.entry(expense.code.clone()).or_insert(0.0) += expense.amount;
        costs.detail.push(ExpenseDetail {
            code: expense.code.clone(),
            date: expense.date,
            amount: expense.amount,
            notes: expense.notes.clone(),
        });
    }

    costs
}

// ============================================================================
// MERGE
// ============================================================================

/// Fill hours, labor and expense cost on every center; codes without activity get zero
pub fn apply_direct_costs(
    classification: &Classification,
    labor: &LaborCosts,
    expenses: &ExpenseCosts,
) -> Classification {
    let mut merged = classification.clone();

    for rc in merged.revenue_centers.iter_mut() {
        let l = labor.for_code(&rc.code);
        rc.hours = l.hours;
        rc.labor_cost = l.labor_cost;
        rc.expense_cost = expenses.for_code(&rc.code);
    }

    for cc in merged.cost_centers.iter_mut() {
        let l = labor.for_code(&cc.code);
        cc.hours = l.hours;
        cc.labor_cost = l.labor_cost;
        cc.expense_cost = expenses.for_code(&cc.code);
        cc.total_cost = cc.labor_cost + cc.expense_cost;
    }

    for nrc in merged.non_revenue_clients.iter_mut() {
        let l = labor.for_code(&nrc.code);
        nrc.hours = l.hours;
        nrc.labor_cost = l.labor_cost;
        nrc.expense_cost = expenses.for_code(&nrc.code);
        nrc.total_cost = nrc.labor_cost + nrc.expense_cost;
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::ClassificationEngine;
    use crate::config::AnalysisConfig;
    use crate::entities::{BillableFlag, RateSource, RevenueLine};
    use chrono::NaiveDate;

    fn code(s: &str) -> ProjectCode {
        ProjectCode::normalize(s).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 10).unwrap()
    }

    fn entry(c: &str, staff: &str, hours: f64) -> TimeEntryRecord {
        TimeEntryRecord {
            date: day(),
            code: code(c),
            staff_key: staff.to_string(),
            hours,
            project_name: None,
        }
    }

    fn expense(c: &str, amount: f64, billable: BillableFlag) -> ExpenseRecord {
        ExpenseRecord {
            date: day(),
            code: code(c),
            amount,
            notes: "note".to_string(),
            billable,
        }
    }

    fn comp(staff: &str, rate: f64) -> CompensationRecord {
        CompensationRecord::new(staff, RateSource::Direct(rate))
    }

    #[test]
    fn test_labor_join_and_detail() {
        let entries = vec![
            entry("R1", "Smith", 2.0),
            entry("R1", "Smith", 3.0),
            entry("R1", "Jones", 1.0),
            entry("C1", "Smith", 4.0),
        ];
        let comp = vec![comp("Smith", 100.0), comp("Jones", 50.0)];

        let (labor, logs) = calculate_labor_costs(&entries, &comp);
        assert!(logs.is_empty());

        let r1 = labor.for_code(&code("R1"));
        assert_eq!(r1.hours, 6.0);
        assert_eq!(r1.labor_cost, 550.0);
        assert_eq!(labor.total_labor_cost(), 950.0);

        assert_eq!(labor.detail.len(), 3);
        assert_eq!(labor.detail[0].code.as_str(), "C1");
        assert_eq!(labor.detail[2].staff_key, "Smith");
        assert_eq!(labor.detail[2].hours, 5.0);
    }

    #[test]
    fn test_unrated_staff_hours_counted_without_cost() {
        let entries = vec![entry("R1", "Smith", 2.0), entry("R1", "Ghost", 3.0)];
        let (labor, logs) = calculate_labor_costs(&entries, &[comp("Smith", 10.0)]);

        let r1 = labor.for_code(&code("R1"));
        assert_eq!(r1.hours, 5.0);
        assert_eq!(r1.labor_cost, 20.0);
        assert_eq!(labor.missing_staff, vec!["Ghost"]);
        assert_eq!(logs.len(), 1);
        assert!(logs[0].starts_with("1 staff missing compensation records (3.0 hours"));

        let ghost = labor.detail.iter().find(|d| d.staff_key == "Ghost").unwrap();
        assert_eq!(ghost.hourly_cost, None);
        assert_eq!(ghost.labor_cost, 0.0);
    }

    #[test]
    fn test_expense_costs_skip_reimbursable() {
        let costs = calculate_expense_costs(&[
            expense("R1", 40.0, BillableFlag::NonReimbursable),
            expense("R1", 10.0, BillableFlag::Unknown),
            expense("R1", 99.0, BillableFlag::Reimbursable),
        ]);
        assert_eq!(costs.for_code(&code("R1")), 50.0);
        assert_eq!(costs.detail.len(), 2);
        assert_eq!(costs.for_code(&code("Z")), 0.0);
    }

    #[test]
    fn test_merge_defaults_to_zero() {
        let config = AnalysisConfig::default();
        let revenue = vec![RevenueLine {
            code: code("R1"),
            project_name: "One".to_string(),
            section: None,
            analysis_category: "Unknown".to_string(),
            allocation_tag: None,
            revenue: 100.0,
        }];
        let entries = vec![entry("THS-25-01-DEV", "Smith", 2.0), entry("X1", "Smith", 1.0)];
        let expenses = vec![expense("X1", 5.0, BillableFlag::NonReimbursable)];

        let classification = ClassificationEngine::new(&config)
            .classify(&revenue, &entries, &expenses)
            .unwrap();
        let (labor, _) = calculate_labor_costs(&entries, &[comp("Smith", 10.0)]);
        let merged = apply_direct_costs(&classification, &labor, &calculate_expense_costs(&expenses));

        assert_eq!(merged.revenue_centers[0].labor_cost, 0.0);
        assert_eq!(merged.revenue_centers[0].hours, 0.0);

        let dev = merged
            .cost_centers
            .iter()
            .find(|c| c.code.as_str() == "THS-25-01-DEV")
            .unwrap();
        assert_eq!(dev.total_cost, 20.0);

        let x1 = &merged.non_revenue_clients[0];
        assert_eq!(x1.total_cost, 15.0);

        // Input classification untouched
        assert_eq!(classification.non_revenue_clients[0].total_cost, 0.0);
    }
}
