// 📥 Source Records - Typed rows produced by the five loaders

use super::ProjectCode;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// REVENUE SOURCE
// ============================================================================

/// Marker restricting which tag-scoped pools a revenue center may receive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocationTag {
    Data,
    Wellness,
}

impl AllocationTag {
    /// Only the exact labels are recognised; anything else means "untagged"
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Data" => Some(AllocationTag::Data),
            "Wellness" => Some(AllocationTag::Wellness),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationTag::Data => "Data",
            AllocationTag::Wellness => "Wellness",
        }
    }
}

/// One (aggregated) project line from the revenue workbook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueLine {
    pub code: ProjectCode,
    pub project_name: String,
    pub section: Option<String>,
    pub analysis_category: String,
    pub allocation_tag: Option<AllocationTag>,
    pub revenue: f64,
}

// ============================================================================
// COMPENSATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateComponent {
    pub name: String,
    pub amount: f64,
}

/// How an hourly rate was obtained; resolved once per load and carried as provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RateSource {
    /// Strategy A: read from a direct hourly-cost column
    Direct(f64),
    /// Strategy B: monthly components (or a monthly total) over expected hours
    Derived {
        components: Vec<RateComponent>,
        monthly_hours: f64,
    },
}

impl RateSource {
    pub fn strategy(&self) -> &'static str {
        match self {
            RateSource::Direct(_) => "A",
            RateSource::Derived { .. } => "B",
        }
    }

    pub fn hourly_cost(&self) -> f64 {
        match self {
            RateSource::Direct(rate) => *rate,
            RateSource::Derived {
                components,
                monthly_hours,
            } => {
                if *monthly_hours <= 0.0 {
                    return 0.0;
                }
                components.iter().map(|c| c.amount).sum::<f64>() / monthly_hours
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationRecord {
    pub staff_key: String,
    pub hourly_cost: f64,
    pub rate_source: RateSource,
}

impl CompensationRecord {
    pub fn new(staff_key: &str, rate_source: RateSource) -> Self {
        CompensationRecord {
            staff_key: staff_key.to_string(),
            hourly_cost: rate_source.hourly_cost(),
            rate_source,
        }
    }
}

// ============================================================================
// TIME & EXPENSES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntryRecord {
    pub date: NaiveDate,
    pub code: ProjectCode,
    pub staff_key: String,
    pub hours: f64,
    pub project_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillableFlag {
    /// Billable = yes: passed through to the client, not a cost
    Reimbursable,
    NonReimbursable,
    /// Unparsable flag; treated as non-reimbursable
    Unknown,
}

impl BillableFlag {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("yes") | Some("y") | Some("true") | Some("1") => BillableFlag::Reimbursable,
            Some("no") | Some("n") | Some("false") | Some("0") => BillableFlag::NonReimbursable,
            _ => BillableFlag::Unknown,
        }
    }

    pub fn is_cost(&self) -> bool {
        !matches!(self, BillableFlag::Reimbursable)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub date: NaiveDate,
    pub code: ProjectCode,
    pub amount: f64,
    pub notes: String,
    pub billable: BillableFlag,
}

// ============================================================================
// GENERAL LEDGER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedgerBucket {
    Data,
    Workplace,
    /// Excluded from every pool
    Nil,
    Sga,
}

impl LedgerBucket {
    pub const ALL: [LedgerBucket; 4] = [
        LedgerBucket::Data,
        LedgerBucket::Workplace,
        LedgerBucket::Nil,
        LedgerBucket::Sga,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerBucket::Data => "DATA",
            LedgerBucket::Workplace => "WORKPLACE",
            LedgerBucket::Nil => "NIL",
            LedgerBucket::Sga => "SGA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchedBy {
    Exact,
    Contains,
    Regex,
    /// No rule matched; bucket fell back to SGA
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub account_name: String,
    pub amount: f64,
    pub bucket: LedgerBucket,
    pub matched_by: MatchedBy,
}

impl LedgerAccount {
    pub fn is_defaulted(&self) -> bool {
        self.matched_by == MatchedBy::Default && self.bucket == LedgerBucket::Sga
    }
}
