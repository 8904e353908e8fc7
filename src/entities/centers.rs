// 🏷️ Centers - The three mutually exclusive code categories and their drill-down rows

use super::{AllocationTag, ProjectCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    RevenueCenter,
    CostCenter,
    NonRevenueClient,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::RevenueCenter => "Revenue Center",
            Category::CostCenter => "Cost Center",
            Category::NonRevenueClient => "Non-Revenue Client",
        }
    }
}

/// Overhead pool a cost center's total cost rolls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CostPool {
    Sga,
    Data,
}

impl CostPool {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostPool::Sga => "SGA",
            CostPool::Data => "DATA",
        }
    }
}

// ============================================================================
// REVENUE CENTER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueCenter {
    pub code: ProjectCode,
    pub name: String,
    pub section: Option<String>,
    pub analysis_category: String,
    pub allocation_tag: Option<AllocationTag>,
    pub revenue: f64,

    // Direct costs
    pub hours: f64,
    pub labor_cost: f64,
    pub expense_cost: f64,

    // Overhead
    pub sga_allocation: f64,
    pub data_allocation: f64,
    pub workplace_allocation: f64,

    pub margin_dollars: f64,
    pub margin_percent: f64,
}

impl RevenueCenter {
    pub fn has_tag(&self, tag: AllocationTag) -> bool {
        self.allocation_tag == Some(tag)
    }

    pub fn direct_cost(&self) -> f64 {
        self.labor_cost + self.expense_cost
    }

    pub fn total_allocation(&self) -> f64 {
        self.sga_allocation + self.data_allocation + self.workplace_allocation
    }
}

// ============================================================================
// COST CENTER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCenter {
    pub code: ProjectCode,
    pub description: String,
    pub pool: CostPool,
    /// True when classified by the internal-code prefix rather than the configured list
    pub inferred: bool,
    pub hours: f64,
    pub labor_cost: f64,
    pub expense_cost: f64,
    pub total_cost: f64,
}

// ============================================================================
// NON-REVENUE CLIENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonRevenueClient {
    pub code: ProjectCode,
    pub name: String,
    pub hours: f64,
    pub labor_cost: f64,
    pub expense_cost: f64,
    pub total_cost: f64,
}

// ============================================================================
// DRILL-DOWN DETAIL
// ============================================================================

/// One (code, staff) pair of aggregated hours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoursDetail {
    pub code: ProjectCode,
    pub staff_key: String,
    pub hours: f64,
    /// None when the staff member has no compensation record
    pub hourly_cost: Option<f64>,
    pub labor_cost: f64,
}

/// One non-reimbursable expense line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseDetail {
    pub code: ProjectCode,
    pub date: NaiveDate,
    pub amount: f64,
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revenue_center_helpers() {
        let rc = RevenueCenter {
            code: ProjectCode::normalize("R1").unwrap(),
            name: "Project One".to_string(),
            section: Some("BEH".to_string()),
            analysis_category: "Behavioral Health".to_string(),
            allocation_tag: Some(AllocationTag::Data),
            revenue: 1000.0,
            hours: 10.0,
            labor_cost: 400.0,
            expense_cost: 50.0,
            sga_allocation: 100.0,
            data_allocation: 20.0,
            workplace_allocation: 0.0,
            margin_dollars: 430.0,
            margin_percent: 43.0,
        };

        assert!(rc.has_tag(AllocationTag::Data));
        assert!(!rc.has_tag(AllocationTag::Wellness));
        assert_eq!(rc.direct_cost(), 450.0);
        assert_eq!(rc.total_allocation(), 120.0);
    }

    #[test]
    fn test_pool_labels() {
        assert_eq!(CostPool::Sga.as_str(), "SGA");
        assert_eq!(serde_json::to_string(&CostPool::Data).unwrap(), "\"DATA\"");
        assert_eq!(Category::NonRevenueClient.name(), "Non-Revenue Client");
    }
}
