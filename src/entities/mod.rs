// Entity Models - Value records produced once per batch run
//
// Nothing here is mutated after a phase hands it on:
// - Loaders produce source records (revenue lines, rates, time, expenses, ledger)
// - Classification produces centers with zeroed figures
// - Cost computation and allocation produce new, enriched copies

pub mod centers;
pub mod project_code;
pub mod sources;

pub use centers::{
    Category, CostCenter, CostPool, ExpenseDetail, HoursDetail, NonRevenueClient, RevenueCenter,
};
pub use project_code::ProjectCode;
pub use sources::{
    AllocationTag, BillableFlag, CompensationRecord, ExpenseRecord, LedgerAccount, LedgerBucket,
    MatchedBy, RateComponent, RateSource, RevenueLine, TimeEntryRecord,
};
