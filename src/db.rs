// 🗄️ Analysis Store - Batches, results and the audit trail in SQLite
//
// One batch row per analysis run. Every result table carries the batch id and is
// written in a single transaction, so a batch either has a complete result set or none.

use crate::entities::{AllocationTag, ProjectCode, RevenueCenter};
use crate::error::{AnalysisError, Result};
use crate::loaders::SourceKind;
use crate::period::Period;
use crate::pipeline::{AnalysisOutput, AnalysisSummary};
use crate::validation::ValidationItem;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// BATCH TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "pending" => Ok(BatchStatus::Pending),
            "processing" => Ok(BatchStatus::Processing),
            "completed" => Ok(BatchStatus::Completed),
            "failed" => Ok(BatchStatus::Failed),
            other => Err(AnalysisError::Config(format!("unknown batch status '{}'", other))),
        }
    }
}

/// Storage paths of the five documents a batch is run against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcePaths {
    pub revenue: Option<String>,
    pub compensation: Option<String>,
    pub time_entries: Option<String>,
    pub expenses: Option<String>,
    pub ledger: Option<String>,
}

impl SourcePaths {
    pub fn new(
        revenue: &str,
        compensation: &str,
        time_entries: &str,
        expenses: &str,
        ledger: &str,
    ) -> Self {
        SourcePaths {
            revenue: Some(revenue.to_string()),
            compensation: Some(compensation.to_string()),
            time_entries: Some(time_entries.to_string()),
            expenses: Some(expenses.to_string()),
            ledger: Some(ledger.to_string()),
        }
    }

    pub fn get(&self, kind: SourceKind) -> Option<&str> {
        let path = match kind {
            SourceKind::Revenue => &self.revenue,
            SourceKind::Compensation => &self.compensation,
            SourceKind::TimeEntries => &self.time_entries,
            SourceKind::Expenses => &self.expenses,
            SourceKind::Ledger => &self.ledger,
        };
        path.as_deref().filter(|p| !p.trim().is_empty())
    }

    /// Batch column names of the paths that are not set
    pub fn missing(&self) -> Vec<String> {
        SourceKind::ALL
            .iter()
            .filter(|kind| self.get(**kind).is_none())
            .map(|kind| path_column(*kind).to_string())
            .collect()
    }
}

fn path_column(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Revenue => "proforma_file_path",
        SourceKind::Compensation => "compensation_file_path",
        SourceKind::TimeEntries => "hours_file_path",
        SourceKind::Expenses => "expenses_file_path",
        SourceKind::Ledger => "pnl_file_path",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub period: Period,
    pub paths: SourcePaths,
    pub status: BatchStatus,
    pub error_message: Option<String>,
    pub created_at: String,
    pub processed_at: Option<String>,
}

/// Batch row as read back for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch: Batch,
    /// Present once the batch completed
    pub summary: Option<AnalysisSummary>,
    pub validation_passed: Option<bool>,
    pub validation: Vec<ValidationItem>,
    pub source_fingerprints: BTreeMap<String, String>,
}

// ============================================================================
// AUDIT TRAIL
// ============================================================================

/// Event for audit trail (every batch state change is an event)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }

    pub fn for_batch(event_type: &str, batch_id: &str, data: serde_json::Value) -> Self {
        Event::new(event_type, "analysis_batch", batch_id, data, "mpa_pipeline")
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for better concurrency
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS mpa_analysis_batches (
            id TEXT PRIMARY KEY,
            month_name TEXT NOT NULL,
            proforma_file_path TEXT,
            compensation_file_path TEXT,
            hours_file_path TEXT,
            expenses_file_path TEXT,
            pnl_file_path TEXT,
            source_fingerprints TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK(status IN ('pending', 'processing', 'completed', 'failed')),
            total_revenue REAL,
            total_labor_cost REAL,
            total_expense_cost REAL,
            total_margin_dollars REAL,
            overall_margin_percent REAL,
            sga_pool REAL,
            data_pool REAL,
            workplace_pool REAL,
            revenue_center_count INTEGER,
            cost_center_count INTEGER,
            non_revenue_client_count INTEGER,
            validation_passed INTEGER,
            validation_errors TEXT,
            error_message TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            processed_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS mpa_revenue_centers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL REFERENCES mpa_analysis_batches(id),
            position INTEGER NOT NULL,
            contract_code TEXT NOT NULL,
            project_name TEXT,
            proforma_section TEXT,
            analysis_category TEXT,
            allocation_tag TEXT,
            revenue REAL NOT NULL,
            hours REAL NOT NULL,
            labor_cost REAL NOT NULL,
            expense_cost REAL NOT NULL,
            sga_allocation REAL NOT NULL,
            data_allocation REAL NOT NULL,
            workplace_allocation REAL NOT NULL,
            margin_dollars REAL NOT NULL,
            margin_percent REAL NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS mpa_cost_centers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL REFERENCES mpa_analysis_batches(id),
            contract_code TEXT NOT NULL,
            description TEXT,
            pool TEXT NOT NULL,
            inferred INTEGER NOT NULL DEFAULT 0,
            hours REAL NOT NULL,
            labor_cost REAL NOT NULL,
            expense_cost REAL NOT NULL,
            total_cost REAL NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS mpa_non_revenue_clients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL REFERENCES mpa_analysis_batches(id),
            contract_code TEXT NOT NULL,
            project_name TEXT,
            hours REAL NOT NULL,
            labor_cost REAL NOT NULL,
            expense_cost REAL NOT NULL,
            total_cost REAL NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS mpa_hours_detail (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL REFERENCES mpa_analysis_batches(id),
            contract_code TEXT NOT NULL,
            staff_key TEXT NOT NULL,
            hours REAL NOT NULL,
            hourly_cost REAL,
            labor_cost REAL NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS mpa_expenses_detail (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL REFERENCES mpa_analysis_batches(id),
            contract_code TEXT NOT NULL,
            expense_date TEXT,
            amount REAL NOT NULL,
            notes TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS mpa_pools_detail (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL UNIQUE REFERENCES mpa_analysis_batches(id),
            sga_from_pnl REAL NOT NULL,
            data_from_pnl REAL NOT NULL,
            workplace_from_pnl REAL NOT NULL,
            nil_excluded REAL NOT NULL,
            sga_from_cc REAL NOT NULL,
            data_from_cc REAL NOT NULL,
            total_revenue REAL NOT NULL,
            data_tagged_revenue REAL NOT NULL,
            wellness_tagged_revenue REAL NOT NULL
        )",
        [],
    )?;

    // Event log (audit trail)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    for (index, table) in [
        ("idx_mpa_revenue_centers_batch", "mpa_revenue_centers"),
        ("idx_mpa_cost_centers_batch", "mpa_cost_centers"),
        ("idx_mpa_non_revenue_clients_batch", "mpa_non_revenue_clients"),
        ("idx_mpa_hours_detail_batch", "mpa_hours_detail"),
        ("idx_mpa_expenses_detail_batch", "mpa_expenses_detail"),
    ] {
        conn.execute(
            &format!("CREATE INDEX IF NOT EXISTS {} ON {}(batch_id)", index, table),
            [],
        )?;
    }

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// BATCH LIFECYCLE
// ============================================================================

/// Register a pending batch; returns its id
pub fn create_batch(conn: &Connection, period: Period, paths: &SourcePaths) -> Result<String> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO mpa_analysis_batches (
            id, month_name, proforma_file_path, compensation_file_path, hours_file_path,
            expenses_file_path, pnl_file_path, status, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8, ?8)",
        params![
            id,
            period.label(),
            paths.revenue,
            paths.compensation,
            paths.time_entries,
            paths.expenses,
            paths.ledger,
            now,
        ],
    )?;

    let event = Event::for_batch(
        "batch_created",
        &id,
        serde_json::json!({ "month": period.label() }),
    );
    insert_event(conn, &event)?;

    Ok(id)
}

struct BatchRow {
    id: String,
    month_name: String,
    paths: SourcePaths,
    status: String,
    error_message: Option<String>,
    created_at: String,
    processed_at: Option<String>,
}

impl BatchRow {
    fn into_batch(self) -> Result<Batch> {
        Ok(Batch {
            period: Period::parse(&self.month_name)?,
            status: BatchStatus::parse(&self.status)?,
            id: self.id,
            paths: self.paths,
            error_message: self.error_message,
            created_at: self.created_at,
            processed_at: self.processed_at,
        })
    }
}

pub fn get_batch(conn: &Connection, batch_id: &str) -> Result<Option<Batch>> {
    let row = conn
        .query_row(
            "SELECT id, month_name, proforma_file_path, compensation_file_path, hours_file_path,
                    expenses_file_path, pnl_file_path, status, error_message, created_at, processed_at
             FROM mpa_analysis_batches
             WHERE id = ?1",
            params![batch_id],
            |row| {
                Ok(BatchRow {
                    id: row.get(0)?,
                    month_name: row.get(1)?,
                    paths: SourcePaths {
                        revenue: row.get(2)?,
                        compensation: row.get(3)?,
                        time_entries: row.get(4)?,
                        expenses: row.get(5)?,
                        ledger: row.get(6)?,
                    },
                    status: row.get(7)?,
                    error_message: row.get(8)?,
                    created_at: row.get(9)?,
                    processed_at: row.get(10)?,
                })
            },
        )
        .optional()?;

    row.map(BatchRow::into_batch).transpose()
}

pub fn update_batch_status(
    conn: &Connection,
    batch_id: &str,
    status: BatchStatus,
    error_message: Option<&str>,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let processed_at = (status == BatchStatus::Completed).then(|| now.clone());

    // A status change always replaces the previous run's error text
    let updated = conn.execute(
        "UPDATE mpa_analysis_batches
         SET status = ?2,
             error_message = ?3,
             processed_at = ?4,
             updated_at = ?5
         WHERE id = ?1",
        params![batch_id, status.as_str(), error_message, processed_at, now],
    )?;

    if updated == 0 {
        return Err(AnalysisError::BatchNotFound(batch_id.to_string()));
    }
    Ok(())
}

/// Mark a batch failed and drop everything a previous run stored for it.
/// Results, summary columns, status and the `batch_failed` event commit together.
pub fn mark_batch_failed(conn: &Connection, batch_id: &str, message: &str) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    clear_results(&tx, batch_id)?;

    let now = Utc::now().to_rfc3339();
    let updated = tx.execute(
        "UPDATE mpa_analysis_batches
         SET total_revenue = NULL,
             total_labor_cost = NULL,
             total_expense_cost = NULL,
             total_margin_dollars = NULL,
             overall_margin_percent = NULL,
             sga_pool = NULL,
             data_pool = NULL,
             workplace_pool = NULL,
             revenue_center_count = NULL,
             cost_center_count = NULL,
             non_revenue_client_count = NULL,
             validation_passed = NULL,
             validation_errors = NULL,
             source_fingerprints = NULL,
             status = 'failed',
             error_message = ?2,
             processed_at = NULL,
             updated_at = ?3
         WHERE id = ?1",
        params![batch_id, message, now],
    )?;

    if updated == 0 {
        return Err(AnalysisError::BatchNotFound(batch_id.to_string()));
    }

    insert_event(
        &tx,
        &Event::for_batch("batch_failed", batch_id, serde_json::json!({ "error": message })),
    )?;

    tx.commit()?;
    Ok(())
}

// ============================================================================
// RESULTS
// ============================================================================

const RESULT_TABLES: [&str; 6] = [
    "mpa_revenue_centers",
    "mpa_cost_centers",
    "mpa_non_revenue_clients",
    "mpa_hours_detail",
    "mpa_expenses_detail",
    "mpa_pools_detail",
];

fn clear_results(conn: &Connection, batch_id: &str) -> Result<()> {
    for table in RESULT_TABLES {
        conn.execute(&format!("DELETE FROM {} WHERE batch_id = ?1", table), params![batch_id])?;
    }
    Ok(())
}

/// Replace the batch's result set and mark it completed, all in one transaction.
/// Re-saving a batch leaves exactly one copy of each row.
pub fn save_results(conn: &Connection, batch_id: &str, output: &AnalysisOutput) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    clear_results(&tx, batch_id)?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO mpa_revenue_centers (
                batch_id, position, contract_code, project_name, proforma_section,
                analysis_category, allocation_tag, revenue, hours, labor_cost, expense_cost,
                sga_allocation, data_allocation, workplace_allocation, margin_dollars, margin_percent
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )?;
        for (position, rc) in output.revenue_centers.iter().enumerate() {
            stmt.execute(params![
                batch_id,
                position as i64,
                rc.code.as_str(),
                rc.name,
                rc.section,
                rc.analysis_category,
                rc.allocation_tag.map(|t| t.as_str()),
                rc.revenue,
                rc.hours,
                rc.labor_cost,
                rc.expense_cost,
                rc.sga_allocation,
                rc.data_allocation,
                rc.workplace_allocation,
                rc.margin_dollars,
                rc.margin_percent,
            ])?;
        }
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO mpa_cost_centers (
                batch_id, contract_code, description, pool, inferred,
                hours, labor_cost, expense_cost, total_cost
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for cc in &output.cost_centers {
            stmt.execute(params![
                batch_id,
                cc.code.as_str(),
                cc.description,
                cc.pool.as_str(),
                cc.inferred,
                cc.hours,
                cc.labor_cost,
                cc.expense_cost,
                cc.total_cost,
            ])?;
        }
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO mpa_non_revenue_clients (
                batch_id, contract_code, project_name, hours, labor_cost, expense_cost, total_cost
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for nrc in &output.non_revenue_clients {
            stmt.execute(params![
                batch_id,
                nrc.code.as_str(),
                nrc.name,
                nrc.hours,
                nrc.labor_cost,
                nrc.expense_cost,
                nrc.total_cost,
            ])?;
        }
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO mpa_hours_detail (
                batch_id, contract_code, staff_key, hours, hourly_cost, labor_cost
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for detail in &output.hours_detail {
            stmt.execute(params![
                batch_id,
                detail.code.as_str(),
                detail.staff_key,
                detail.hours,
                detail.hourly_cost,
                detail.labor_cost,
            ])?;
        }
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO mpa_expenses_detail (
                batch_id, contract_code, expense_date, amount, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for detail in &output.expense_detail {
            let notes = (!detail.notes.is_empty()).then_some(detail.notes.as_str());
            stmt.execute(params![
                batch_id,
                detail.code.as_str(),
                detail.date.format("%Y-%m-%d").to_string(),
                detail.amount,
                notes,
            ])?;
        }
    }

    let pools = &output.pools;
    let tagged = &output.tagged_revenue;
    tx.execute(
        "INSERT INTO mpa_pools_detail (
            batch_id, sga_from_pnl, data_from_pnl, workplace_from_pnl, nil_excluded,
            sga_from_cc, data_from_cc, total_revenue, data_tagged_revenue, wellness_tagged_revenue
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            batch_id,
            pools.sga_from_ledger,
            pools.data_from_ledger,
            pools.workplace_from_ledger,
            pools.nil_excluded,
            pools.sga_from_cost_centers,
            pools.data_from_cost_centers,
            tagged.total,
            tagged.data_tagged,
            tagged.wellness_tagged,
        ],
    )?;

    let summary = &output.summary;
    let now = Utc::now().to_rfc3339();
    let updated = tx.execute(
        "UPDATE mpa_analysis_batches
         SET total_revenue = ?2,
             total_labor_cost = ?3,
             total_expense_cost = ?4,
             total_margin_dollars = ?5,
             overall_margin_percent = ?6,
             sga_pool = ?7,
             data_pool = ?8,
             workplace_pool = ?9,
             revenue_center_count = ?10,
             cost_center_count = ?11,
             non_revenue_client_count = ?12,
             validation_passed = ?13,
             validation_errors = ?14,
             source_fingerprints = ?15,
             status = 'completed',
             error_message = NULL,
             processed_at = ?16,
             updated_at = ?16
         WHERE id = ?1",
        params![
            batch_id,
            summary.total_revenue,
            summary.total_labor_cost,
            summary.total_expense_cost,
            summary.total_margin_dollars,
            summary.overall_margin_percent,
            summary.sga_pool,
            summary.data_pool,
            summary.workplace_pool,
            summary.revenue_center_count as i64,
            summary.cost_center_count as i64,
            summary.non_revenue_client_count as i64,
            output.validation.passed(),
            serde_json::to_string(&output.validation.items)?,
            serde_json::to_string(&output.fingerprints)?,
            now,
        ],
    )?;

    if updated == 0 {
        // Dropping the transaction rolls back the inserts
        return Err(AnalysisError::BatchNotFound(batch_id.to_string()));
    }

    insert_event(
        &tx,
        &Event::for_batch(
            "batch_completed",
            batch_id,
            serde_json::json!({
                "validation_passed": output.validation.passed(),
                "total_revenue": summary.total_revenue,
                "fingerprints": output.fingerprints,
            }),
        ),
    )?;

    tx.commit()?;
    Ok(())
}

pub fn get_batch_summary(conn: &Connection, batch_id: &str) -> Result<Option<BatchSummary>> {
    let Some(batch) = get_batch(conn, batch_id)? else {
        return Ok(None);
    };

    let (summary, validation_passed, validation_json, fingerprints_json) = conn.query_row(
        "SELECT total_revenue, total_labor_cost, total_expense_cost, total_margin_dollars,
                overall_margin_percent, sga_pool, data_pool, workplace_pool,
                revenue_center_count, cost_center_count, non_revenue_client_count,
                validation_passed, validation_errors, source_fingerprints
         FROM mpa_analysis_batches
         WHERE id = ?1",
        params![batch_id],
        |row| {
            let total_revenue: Option<f64> = row.get(0)?;
            let summary = match total_revenue {
                Some(total_revenue) => Some(AnalysisSummary {
                    total_revenue,
                    total_labor_cost: row.get(1)?,
                    total_expense_cost: row.get(2)?,
                    total_margin_dollars: row.get(3)?,
                    overall_margin_percent: row.get(4)?,
                    sga_pool: row.get(5)?,
                    data_pool: row.get(6)?,
                    workplace_pool: row.get(7)?,
                    revenue_center_count: row.get::<_, i64>(8)? as usize,
                    cost_center_count: row.get::<_, i64>(9)? as usize,
                    non_revenue_client_count: row.get::<_, i64>(10)? as usize,
                }),
                None => None,
            };
            Ok((
                summary,
                row.get::<_, Option<bool>>(11)?,
                row.get::<_, Option<String>>(12)?,
                row.get::<_, Option<String>>(13)?,
            ))
        },
    )?;

    let validation = match validation_json {
        Some(json) => serde_json::from_str(&json)?,
        None => Vec::new(),
    };
    let source_fingerprints = match fingerprints_json {
        Some(json) => serde_json::from_str(&json)?,
        None => BTreeMap::new(),
    };

    Ok(Some(BatchSummary {
        batch,
        summary,
        validation_passed,
        validation,
        source_fingerprints,
    }))
}

struct StoredRevenueCenter {
    code: String,
    name: Option<String>,
    section: Option<String>,
    analysis_category: Option<String>,
    allocation_tag: Option<String>,
    figures: [f64; 9],
}

/// Revenue centers of a batch in their original order
pub fn load_revenue_centers(conn: &Connection, batch_id: &str) -> Result<Vec<RevenueCenter>> {
    let mut stmt = conn.prepare(
        "SELECT contract_code, project_name, proforma_section, analysis_category, allocation_tag,
                revenue, hours, labor_cost, expense_cost,
                sga_allocation, data_allocation, workplace_allocation, margin_dollars, margin_percent
         FROM mpa_revenue_centers
         WHERE batch_id = ?1
         ORDER BY position",
    )?;

    let rows = stmt
        .query_map(params![batch_id], |row| {
            let mut figures = [0.0; 9];
            for (i, slot) in figures.iter_mut().enumerate() {
                *slot = row.get(5 + i)?;
            }
            Ok(StoredRevenueCenter {
                code: row.get(0)?,
                name: row.get(1)?,
                section: row.get(2)?,
                analysis_category: row.get(3)?,
                allocation_tag: row.get(4)?,
                figures,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|stored| {
            let [
                revenue,
                hours,
                labor_cost,
                expense_cost,
                sga_allocation,
                data_allocation,
                workplace_allocation,
                margin_dollars,
                margin_percent,
            ] = stored.figures;
            Ok(RevenueCenter {
                code: ProjectCode::normalize(&stored.code)?,
                name: stored.name.unwrap_or_default(),
                section: stored.section,
                analysis_category: stored.analysis_category.unwrap_or_default(),
                allocation_tag: stored.allocation_tag.as_deref().and_then(AllocationTag::parse),
                revenue,
                hours,
                labor_cost,
                expense_cost,
                sga_allocation,
                data_allocation,
                workplace_allocation,
                margin_dollars,
                margin_percent,
            })
        })
        .collect()
}

/// Row counts per result table, for audit display
pub fn count_result_rows(conn: &Connection, batch_id: &str) -> Result<BTreeMap<String, i64>> {
    let mut counts = BTreeMap::new();
    for table in RESULT_TABLES {
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE batch_id = ?1", table),
            params![batch_id],
            |row| row.get(0),
        )?;
        counts.insert(table.to_string(), count);
    }
    Ok(counts)
}

// ============================================================================
// EVENTS
// ============================================================================

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, oldest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY id",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
                actor: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(events)
}

// ============================================================================
// TESTS
// ============================================================================
