// 🧾 Expense Loader - Harvest expenses export
// Reimbursable (billable) lines are passed through to clients and never become cost.

use super::{
    first_table_sheet, parse_amount, parse_date, time_entries::CODE_COLUMNS, ColumnResolver,
    Loaded, SourceKind, SourceLoader,
};
use crate::entities::{BillableFlag, ExpenseRecord, ProjectCode};
use crate::error::{AnalysisError, Result};
use crate::sheet::Workbook;

const DATE_COLUMNS: [&str; 3] = ["Date", "Spent Date", "Expense Date"];
const AMOUNT_COLUMNS: [&str; 3] = ["Amount", "Total Amount", "Amount (USD)"];
const BILLABLE_COLUMNS: [&str; 3] = ["Billable", "Is Billable", "Billable?"];
const NOTES_COLUMNS: [&str; 4] = ["Notes", "Description", "Note", "Memo"];

#[derive(Default)]
pub struct ExpenseLoader;

impl ExpenseLoader {
    pub fn new() -> Self {
        ExpenseLoader
    }
}

impl SourceLoader for ExpenseLoader {
    type Output = Vec<ExpenseRecord>;

    fn load(&self, workbook: &Workbook) -> Result<Loaded<Vec<ExpenseRecord>>> {
        let kind = self.source_kind();
        let mut loaded = Loaded::new(Vec::new());

        let sheet = first_table_sheet(workbook, kind)?;
        let table = sheet
            .table()
            .ok_or_else(|| AnalysisError::missing_structure(kind.name(), "no header row"))?;

        if table.is_empty() {
            loaded.log(kind, "Harvest Expenses is empty".to_string());
            return Ok(loaded);
        }

        let resolver = ColumnResolver::new(kind, &table.headers);
        let date_col = resolver.require("date", &DATE_COLUMNS)?;
        let code_col = resolver.require("project code", &CODE_COLUMNS)?;
        let amount_col = resolver.require("amount", &AMOUNT_COLUMNS)?;
        let billable_col = resolver.require("billable", &BILLABLE_COLUMNS)?;
        let notes_col = resolver.find(&NOTES_COLUMNS);

        let mut reimbursable = 0usize;
        let mut unknown_billable = 0usize;
        let mut skipped = 0usize;

        for row in table.records() {
            if row.is_blank() {
                continue;
            }

            let Some(date) = row.get(date_col).and_then(parse_date) else {
                skipped += 1;
                continue;
            };

            let Ok(code) = ProjectCode::normalize(row.get(code_col).unwrap_or_default()) else {
                skipped += 1;
                continue;
            };

            let billable = BillableFlag::parse(row.get(billable_col));
            match billable {
                BillableFlag::Reimbursable => {
                    reimbursable += 1;
                    continue;
                }
                BillableFlag::Unknown => unknown_billable += 1,
                BillableFlag::NonReimbursable => {}
            }

            loaded.records.push(ExpenseRecord {
                date,
                code,
                amount: row.get(amount_col).and_then(parse_amount).unwrap_or(0.0),
                notes: row.get_opt(notes_col).unwrap_or_default().to_string(),
                billable,
            });
        }

        if reimbursable > 0 {
            loaded.log(
                kind,
                format!("Excluded {} reimbursable (billable) expenses", reimbursable),
            );
        }
        if unknown_billable > 0 {
            loaded.log(
                kind,
                format!(
                    "{} expenses with unknown billable status (treated as non-reimbursable)",
                    unknown_billable
                ),
            );
        }
        if skipped > 0 {
            loaded.log(
                kind,
                format!("{} Harvest Expenses rows with unparsable date or empty code (skipped)", skipped),
            );
        }

        let total: f64 = loaded.records.iter().map(|r| r.amount).sum();
        let rows = loaded.records.len();
        loaded.log(
            kind,
            format!("Harvest Expenses: {} non-reimbursable, ${:.2}", rows, total),
        );

        Ok(loaded)
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Expenses
    }
}
