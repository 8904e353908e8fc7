// Monthly Performance Attribution - Core Library
// Exposes all modules for use in the batch runner CLI and tests

pub mod allocation;     // Overhead pools and revenue-weighted distribution
pub mod classification; // Revenue center / cost center / non-revenue client
pub mod config;         // Injected analysis configuration
pub mod costs;          // Labor and expense cost per code
pub mod db;             // SQLite persistence + audit trail
pub mod entities;       // Value records shared by every phase
pub mod error;
pub mod loaders;        // One loader per source document
pub mod period;
pub mod pipeline;       // Batch orchestration
pub mod reconciliation; // Totals vs. authoritative figures
pub mod rules;          // Ledger tagging rules
pub mod sheet;          // Workbook / sheet model
pub mod store;          // Document fetching
pub mod validation;     // Pass / warn / fail checks

// Re-export commonly used types
pub use allocation::{
    calculate_margins, AllocationEngine, OverheadPool, OverheadPools, TaggedRevenue,
};
pub use classification::{Classification, ClassificationEngine};
pub use config::{AnalysisConfig, CostCenterDefinition, LedgerExclusions};
pub use costs::{
    apply_direct_costs, calculate_expense_costs, calculate_labor_costs, ExpenseCosts, LaborCosts,
};
pub use db::{
    create_batch, get_batch, get_batch_summary, get_events_for_entity, insert_event,
    load_revenue_centers, mark_batch_failed, save_results, setup_database, update_batch_status,
    Batch, BatchStatus, BatchSummary, Event, SourcePaths,
};
pub use entities::{
    AllocationTag, BillableFlag, Category, CompensationRecord, CostCenter, CostPool,
    ExpenseDetail, ExpenseRecord, HoursDetail, LedgerAccount, LedgerBucket, MatchedBy,
    NonRevenueClient, ProjectCode, RateComponent, RateSource, RevenueCenter, RevenueLine,
    TimeEntryRecord,
};
pub use error::{AnalysisError, Result};
pub use loaders::{
    CompensationLoader, ExpenseLoader, LedgerLoader, Loaded, RevenueLoader, RevenueSource,
    SourceKind, SourceLoader, TimeEntryLoader,
};
pub use period::Period;
pub use pipeline::{
    analyze, load_sources, run_analysis, AnalysisOutput, AnalysisSummary, LoadedSources,
    ProcessingResult,
};
pub use reconciliation::{ReconciliationEngine, ReconciliationReport, ReconciliationResult};
pub use rules::{MatchType, TagResult, TaggingEngine, TaggingRule};
pub use sheet::{Sheet, Workbook};
pub use store::{DocumentStore, FsDocumentStore, MemoryDocumentStore};
pub use validation::{
    CheckFamily, ValidationEngine, ValidationInput, ValidationItem, ValidationKind,
    ValidationReport,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
