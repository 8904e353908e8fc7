// ⏱️ Time Entry Loader - Harvest hours export, filtered to the analysis month

use super::{
    compensation::STAFF_COLUMNS, first_table_sheet, parse_amount, parse_date, ColumnResolver,
    Loaded, SourceKind, SourceLoader,
};
use crate::entities::{ProjectCode, TimeEntryRecord};
use crate::error::{AnalysisError, Result};
use crate::period::Period;
use crate::sheet::Workbook;

const DATE_COLUMNS: [&str; 3] = ["Date", "Spent Date", "Work Date"];
pub const CODE_COLUMNS: [&str; 3] = ["Project Code", "Project", "Code"];
const HOURS_COLUMNS: [&str; 3] = ["Hours", "Hours (h)", "Hours (decimal)"];
const PROJECT_NAME_COLUMNS: [&str; 4] = ["Project Name", "Project", "Client", "Client Name"];

pub struct TimeEntryLoader {
    period: Period,
}

impl TimeEntryLoader {
    pub fn new(period: Period) -> Self {
        TimeEntryLoader { period }
    }
}

impl SourceLoader for TimeEntryLoader {
    type Output = Vec<TimeEntryRecord>;

    fn load(&self, workbook: &Workbook) -> Result<Loaded<Vec<TimeEntryRecord>>> {
        let kind = self.source_kind();
        let mut loaded = Loaded::new(Vec::new());

        let sheet = first_table_sheet(workbook, kind)?;
        let table = sheet
            .table()
            .ok_or_else(|| AnalysisError::missing_structure(kind.name(), "no header row"))?;

        if table.is_empty() {
            loaded.log(kind, "Harvest Hours is empty".to_string());
            return Ok(loaded);
        }

        let resolver = ColumnResolver::new(kind, &table.headers);
        let date_col = resolver.require("date", &DATE_COLUMNS)?;
        let code_col = resolver.require("project code", &CODE_COLUMNS)?;
        let hours_col = resolver.require("hours", &HOURS_COLUMNS)?;

        let mut staff_candidates = STAFF_COLUMNS.to_vec();
        staff_candidates.push("Person");
        let staff_col = resolver.require("staff identity", &staff_candidates)?;

        let project_col = resolver.find_excluding(&PROJECT_NAME_COLUMNS, Some(code_col));

        let mut outside_month = 0usize;
        let mut unparsable_dates = 0usize;
        let mut invalid_codes = 0usize;

        for row in table.records() {
            if row.is_blank() {
                continue;
            }

            let Some(date) = row.get(date_col).and_then(parse_date) else {
                unparsable_dates += 1;
                continue;
            };

            if !self.period.contains(date) {
                outside_month += 1;
                continue;
            }

            // Per-row code failures skip the row, not the batch
            let code = match ProjectCode::normalize(row.get(code_col).unwrap_or_default()) {
                Ok(code) => code,
                Err(_) => {
                    invalid_codes += 1;
                    continue;
                }
            };

            loaded.records.push(TimeEntryRecord {
                date,
                code,
                staff_key: row.get(staff_col).unwrap_or_default().to_string(),
                hours: row.get(hours_col).and_then(parse_amount).unwrap_or(0.0),
                project_name: row.get_opt(project_col).map(|s| s.to_string()),
            });
        }

        if outside_month > 0 {
            loaded.log(
                kind,
                format!("{} Harvest Hours rows outside month range (excluded)", outside_month),
            );
        }
        if unparsable_dates > 0 {
            loaded.log(
                kind,
                format!("{} Harvest Hours rows with unparsable dates (skipped)", unparsable_dates),
            );
        }
        if invalid_codes > 0 {
            loaded.log(
                kind,
                format!("{} Harvest Hours rows with empty project code (skipped)", invalid_codes),
            );
        }

        let total_hours: f64 = loaded.records.iter().map(|r| r.hours).sum();
        let rows = loaded.records.len();
        loaded.log(
            kind,
            format!("Harvest Hours: {} rows, {:.1} total hours", rows, total_hours),
        );

        Ok(loaded)
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::TimeEntries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Sheet;

    fn workbook(rows: &[&[&str]]) -> Workbook {
        Workbook::single("hours.csv", Sheet::from_rows("Hours", rows))
    }

    fn loader() -> TimeEntryLoader {
        TimeEntryLoader::new(Period::parse("November2025").unwrap())
    }

    #[test]
    fn test_filters_to_month_and_normalizes_codes() {
        let wb = workbook(&[
            &["Spent Date", "Project Code", "Project", "Last Name", "Hours"],
            &["2025-11-03", " R1 ", "Project One", "Smith", "4.5"],
            &["2025-10-31", "R1", "Project One", "Smith", "8"],
            &["11/28/2025", "THS-25-01-DEV", "Biz Dev", "Jones", "2"],
            &["2025-11-04", "\u{a0}", "Nothing", "Jones", "1"],
        ]);

        let loaded = loader().load(&wb).unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[0].code.as_str(), "R1");
        assert_eq!(loaded.records[0].project_name.as_deref(), Some("Project One"));
        assert_eq!(loaded.records[1].hours, 2.0);

        assert!(loaded
            .logs
            .contains(&"1 Harvest Hours rows outside month range (excluded)".to_string()));
        assert!(loaded
            .logs
            .contains(&"Harvest Hours: 2 rows, 6.5 total hours".to_string()));
    }

    #[test]
    fn test_project_column_used_as_code_is_not_name() {
        let wb = workbook(&[
            &["Date", "Project", "Person", "Hours"],
            &["2025-11-03", "R1", "Smith", "1"],
        ]);

        let loaded = loader().load(&wb).unwrap();
        assert_eq!(loaded.records[0].code.as_str(), "R1");
        assert_eq!(loaded.records[0].staff_key, "Smith");
        assert_eq!(loaded.records[0].project_name, None);
    }

    #[test]
    fn test_missing_hours_column() {
        let wb = workbook(&[&["Date", "Project Code", "Last Name"], &["2025-11-03", "R1", "Smith"]]);
        let err = loader().load(&wb).unwrap_err();
        assert!(err.to_string().contains("'hours'"));
    }

    #[test]
    fn test_empty_export_is_logged() {
        let wb = workbook(&[&["Date", "Project Code", "Last Name", "Hours"]]);
        let loaded = loader().load(&wb).unwrap();
        assert!(loaded.records.is_empty());
        assert_eq!(loaded.logs, vec!["Harvest Hours is empty".to_string()]);
    }
}
