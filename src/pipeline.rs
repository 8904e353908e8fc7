// 🚀 Analysis Pipeline - load → classify → cost → allocate → validate → persist
//
// Loading fans out: the five documents are fetched and parsed concurrently and
// joined before anything else runs. Every later phase consumes the full output of
// the previous one.
//
// Loader, classification and allocation errors abort the batch before anything is
// written. Validation failures do not: the batch is saved with
// validation_passed = false so the results can still be inspected.

use crate::allocation::{AllocationEngine, OverheadPools, TaggedRevenue};
use crate::classification::ClassificationEngine;
use crate::config::AnalysisConfig;
use crate::costs::{apply_direct_costs, calculate_expense_costs, calculate_labor_costs};
use crate::db::{self, BatchStatus, Event, SourcePaths};
use crate::entities::{
    CompensationRecord, CostCenter, ExpenseDetail, ExpenseRecord, HoursDetail, LedgerAccount,
    NonRevenueClient, RevenueCenter, TimeEntryRecord,
};
use crate::error::{AnalysisError, Result};
use crate::loaders::{
    CompensationLoader, ExpenseLoader, LedgerLoader, Loaded, RevenueLoader, RevenueSource,
    SourceKind, SourceLoader, TimeEntryLoader,
};
use crate::period::Period;
use crate::rules::TaggingEngine;
use crate::sheet::Workbook;
use crate::store::DocumentStore;
use crate::validation::{
    ValidationEngine, ValidationInput, ValidationItem, ValidationKind, ValidationReport,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::thread;

// ============================================================================
// PHASE OUTPUTS
// ============================================================================

/// Everything the five loaders produced
#[derive(Debug, Clone)]
pub struct LoadedSources {
    pub revenue: RevenueSource,
    pub compensation: Vec<CompensationRecord>,
    pub time_entries: Vec<TimeEntryRecord>,
    pub expenses: Vec<ExpenseRecord>,
    pub ledger: Vec<LedgerAccount>,
    /// SHA-256 per document, keyed by source code
    pub fingerprints: BTreeMap<String, String>,
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_revenue: f64,
    pub total_labor_cost: f64,
    pub total_expense_cost: f64,
    pub total_margin_dollars: f64,
    pub overall_margin_percent: f64,
    pub sga_pool: f64,
    pub data_pool: f64,
    pub workplace_pool: f64,
    pub revenue_center_count: usize,
    pub cost_center_count: usize,
    pub non_revenue_client_count: usize,
}

impl AnalysisSummary {
    /// Totals over revenue centers; margin percent is 0 without revenue
    pub fn from_results(
        revenue_centers: &[RevenueCenter],
        cost_centers: &[CostCenter],
        non_revenue_clients: &[NonRevenueClient],
        pools: &OverheadPools,
    ) -> Self {
        let total_revenue: f64 = revenue_centers.iter().map(|rc| rc.revenue).sum();
        let total_margin_dollars: f64 = revenue_centers.iter().map(|rc| rc.margin_dollars).sum();

        AnalysisSummary {
            total_revenue,
            total_labor_cost: revenue_centers.iter().map(|rc| rc.labor_cost).sum(),
            total_expense_cost: revenue_centers.iter().map(|rc| rc.expense_cost).sum(),
            total_margin_dollars,
            overall_margin_percent: if total_revenue > 0.0 {
                total_margin_dollars / total_revenue * 100.0
            } else {
                0.0
            },
            sga_pool: pools.sga_pool,
            data_pool: pools.data_pool,
            workplace_pool: pools.workplace_pool,
            revenue_center_count: revenue_centers.len(),
            cost_center_count: cost_centers.len(),
            non_revenue_client_count: non_revenue_clients.len(),
        }
    }
}

/// Full computed result of one batch, ready to persist
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub revenue_centers: Vec<RevenueCenter>,
    pub cost_centers: Vec<CostCenter>,
    pub non_revenue_clients: Vec<NonRevenueClient>,
    pub hours_detail: Vec<HoursDetail>,
    pub expense_detail: Vec<ExpenseDetail>,
    pub pools: OverheadPools,
    pub tagged_revenue: TaggedRevenue,
    pub summary: AnalysisSummary,
    pub validation: ValidationReport,
    pub fingerprints: BTreeMap<String, String>,
    pub logs: Vec<String>,
}

/// What a caller gets back from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub success: bool,
    pub batch_id: String,
    pub summary: AnalysisSummary,
    pub validation: Vec<ValidationItem>,
    pub logs: Vec<String>,
}

impl ProcessingResult {
    pub fn validation_passed(&self) -> bool {
        !self.validation.iter().any(|v| v.kind == ValidationKind::Fail)
    }
}

// ============================================================================
// LOAD (fan-out / fan-in)
// ============================================================================

fn fetch_and_load<L: SourceLoader>(
    store: &dyn DocumentStore,
    paths: &SourcePaths,
    loader: &L,
) -> Result<(Loaded<L::Output>, String)> {
    let kind = loader.source_kind();
    let path = paths.get(kind).ok_or_else(|| {
        AnalysisError::Config(format!("no {} document path given", kind.name()))
    })?;

    let workbook: Workbook = store.fetch(path)?;
    tracing::debug!(
        source = kind.code(),
        path,
        version = loader.version(),
        fingerprint = %workbook.fingerprint,
        "loading document"
    );
    let loaded = loader.load(&workbook)?;
    Ok((loaded, workbook.fingerprint))
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Fetch and parse all five documents concurrently.
///
/// Log lines come back in a fixed source order regardless of which thread
/// finished first; the first failing source (in that order) is reported.
pub fn load_sources(
    store: &dyn DocumentStore,
    paths: &SourcePaths,
    period: Period,
    config: &AnalysisConfig,
) -> Result<LoadedSources> {
    let tagger = TaggingEngine::from_rules(&config.tagging_rules)?;

    let revenue_loader = RevenueLoader::new(config, period);
    let compensation_loader = CompensationLoader::new(config.expected_monthly_hours);
    let time_loader = TimeEntryLoader::new(period);
    let expense_loader = ExpenseLoader::new();
    let ledger_loader = LedgerLoader::new(&config.ledger_sheet, &config.ledger_exclusions, &tagger);

    let (revenue, compensation, time_entries, expenses, ledger) = thread::scope(|s| {
        let revenue = s.spawn(|| fetch_and_load(store, paths, &revenue_loader));
        let compensation = s.spawn(|| fetch_and_load(store, paths, &compensation_loader));
        let time_entries = s.spawn(|| fetch_and_load(store, paths, &time_loader));
        let expenses = s.spawn(|| fetch_and_load(store, paths, &expense_loader));
        let ledger = s.spawn(|| fetch_and_load(store, paths, &ledger_loader));

        (
            join(revenue),
            join(compensation),
            join(time_entries),
            join(expenses),
            join(ledger),
        )
    });

    let mut logs = vec![format!("Loading files for {}...", period.label())];
    let mut fingerprints = BTreeMap::new();

    let (revenue, fp) = revenue?;
    fingerprints.insert(SourceKind::Revenue.code().to_string(), fp);
    logs.extend(revenue.logs);

    let (compensation, fp) = compensation?;
    fingerprints.insert(SourceKind::Compensation.code().to_string(), fp);
    logs.extend(compensation.logs);

    let (time_entries, fp) = time_entries?;
    fingerprints.insert(SourceKind::TimeEntries.code().to_string(), fp);
    logs.extend(time_entries.logs);

    let (expenses, fp) = expenses?;
    fingerprints.insert(SourceKind::Expenses.code().to_string(), fp);
    logs.extend(expenses.logs);

    let (ledger, fp) = ledger?;
    fingerprints.insert(SourceKind::Ledger.code().to_string(), fp);
    logs.extend(ledger.logs);

    logs.push("Files loaded successfully".to_string());

    Ok(LoadedSources {
        revenue: revenue.records,
        compensation: compensation.records,
        time_entries: time_entries.records,
        expenses: expenses.records,
        ledger: ledger.records,
        fingerprints,
        logs,
    })
}

// ============================================================================
// ANALYZE (pure)
// ============================================================================

/// Classify, cost, allocate and validate. Touches no storage.
pub fn analyze(sources: &LoadedSources, config: &AnalysisConfig) -> Result<AnalysisOutput> {
    let mut logs = sources.logs.clone();

    logs.push("Classifying projects...".to_string());
    let classification = ClassificationEngine::new(config).classify(
        &sources.revenue.lines,
        &sources.time_entries,
        &sources.expenses,
    )?;
    logs.push(classification.summary());

    logs.push("Computing direct costs...".to_string());
    let (labor, labor_logs) = calculate_labor_costs(&sources.time_entries, &sources.compensation);
    logs.extend(labor_logs);
    let expense_costs = calculate_expense_costs(&sources.expenses);
    let costed = apply_direct_costs(&classification, &labor, &expense_costs);
    tracing::debug!(
        labor = labor.total_labor_cost(),
        expenses = expense_costs.total(),
        "direct costs"
    );
    logs.push("Direct costs computed".to_string());

    logs.push("Allocating overhead pools...".to_string());
    let allocator = AllocationEngine::with_tolerance(config.tolerance)
        .include_cost_centers(config.include_cost_centers_in_pools);
    let pools = allocator.calculate_pools(&sources.ledger, &costed.cost_centers);
    let revenue_centers = allocator.allocate(&costed.revenue_centers, &pools)?;
    let tagged_revenue = TaggedRevenue::from_centers(&revenue_centers);
    tracing::debug!(total = pools.total(), nil_excluded = pools.nil_excluded, "overhead pools");
    logs.push(format!(
        "Pools allocated: SG&A ${:.2}, Data ${:.2}, Workplace ${:.2}",
        pools.sga_pool, pools.data_pool, pools.workplace_pool
    ));

    logs.push("Running validation checks...".to_string());
    let validation = ValidationEngine::from_config(config).validate(&ValidationInput {
        revenue_centers: &revenue_centers,
        cost_centers: &costed.cost_centers,
        reported_revenue: sources.revenue.reported_total,
        pools: Some(&pools),
        time_entries: &sources.time_entries,
        expenses: &sources.expenses,
        compensation: &sources.compensation,
        ledger: &sources.ledger,
    });
    for item in validation.failures() {
        tracing::warn!(check = ?item.check, "{}", item.message);
    }
    logs.push(format!("Validation: {}", validation.summary()));

    let summary = AnalysisSummary::from_results(
        &revenue_centers,
        &costed.cost_centers,
        &costed.non_revenue_clients,
        &pools,
    );

    Ok(AnalysisOutput {
        revenue_centers,
        cost_centers: costed.cost_centers,
        non_revenue_clients: costed.non_revenue_clients,
        hours_detail: labor.detail,
        expense_detail: expense_costs.detail,
        pools,
        tagged_revenue,
        summary,
        validation,
        fingerprints: sources.fingerprints.clone(),
        logs,
    })
}

// ============================================================================
// RUN (batch lifecycle)
// ============================================================================

/// Run a registered batch end to end.
///
/// The batch must exist and carry all five document paths; otherwise nothing is
/// changed. On any hard failure the batch is marked `failed` with the error
/// message and the error is returned.
pub fn run_analysis(
    conn: &Connection,
    store: &dyn DocumentStore,
    batch_id: &str,
    config: &AnalysisConfig,
) -> Result<ProcessingResult> {
    let batch = db::get_batch(conn, batch_id)?
        .ok_or_else(|| AnalysisError::BatchNotFound(batch_id.to_string()))?;

    let missing = batch.paths.missing();
    if !missing.is_empty() {
        return Err(AnalysisError::MissingSourcePaths {
            batch_id: batch_id.to_string(),
            missing,
        });
    }

    let span = tracing::info_span!("batch", batch_id, month = %batch.period);
    let _guard = span.enter();

    db::update_batch_status(conn, batch_id, BatchStatus::Processing, None)?;
    db::insert_event(
        conn,
        &Event::for_batch(
            "batch_processing",
            batch_id,
            serde_json::json!({ "month": batch.period.label() }),
        ),
    )?;

    match execute(conn, store, batch_id, &batch.paths, batch.period, config) {
        Ok(result) => {
            tracing::info!(
                revenue_centers = result.summary.revenue_center_count,
                validation_passed = result.validation_passed(),
                "batch completed"
            );
            Ok(result)
        }
        Err(err) => {
            let message = err.to_string();
            tracing::error!(error = %message, "batch failed");

            if let Err(mark_err) = db::mark_batch_failed(conn, batch_id, &message) {
                tracing::error!(error = %mark_err, "could not mark batch failed");
            }

            Err(err)
        }
    }
}

fn execute(
    conn: &Connection,
    store: &dyn DocumentStore,
    batch_id: &str,
    paths: &SourcePaths,
    period: Period,
    config: &AnalysisConfig,
) -> Result<ProcessingResult> {
    let sources = load_sources(store, paths, period, config)?;
    let mut output = analyze(&sources, config)?;

    output.logs.push("Saving results to database...".to_string());
    db::save_results(conn, batch_id, &output)?;
    output.logs.push("Analysis complete!".to_string());

    Ok(ProcessingResult {
        success: true,
        batch_id: batch_id.to_string(),
        summary: output.summary,
        validation: output.validation.items,
        logs: output.logs,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::AllocationTag;

    fn center(code: &str, revenue: f64, margin: f64) -> RevenueCenter {
        RevenueCenter {
            code: crate::entities::ProjectCode::normalize(code).unwrap(),
            name: code.to_string(),
            section: None,
            analysis_category: "Unknown".to_string(),
            allocation_tag: Some(AllocationTag::Data),
            revenue,
            hours: 0.0,
            labor_cost: 10.0,
            expense_cost: 5.0,
            sga_allocation: 0.0,
            data_allocation: 0.0,
            workplace_allocation: 0.0,
            margin_dollars: margin,
            margin_percent: 0.0,
        }
    }

    #[test]
    fn test_summary_totals() {
        let centers = vec![center("R1", 100.0, 40.0), center("R2", 300.0, 60.0)];
        let pools = OverheadPools {
            sga_pool: 50.0,
            ..Default::default()
        };
        let summary = AnalysisSummary::from_results(&centers, &[], &[], &pools);

        assert_eq!(summary.total_revenue, 400.0);
        assert_eq!(summary.total_labor_cost, 20.0);
        assert_eq!(summary.total_margin_dollars, 100.0);
        assert!((summary.overall_margin_percent - 25.0).abs() < 1e-9);
        assert_eq!(summary.sga_pool, 50.0);
        assert_eq!(summary.revenue_center_count, 2);
    }

    #[test]
    fn test_summary_without_revenue() {
        let summary = AnalysisSummary::from_results(&[], &[], &[], &OverheadPools::default());
        assert_eq!(summary.overall_margin_percent, 0.0);
        assert_eq!(summary.revenue_center_count, 0);
    }
}
