// 👥 Compensation Loader - Hourly cost per staff member
// Strategy A reads a direct hourly column; Strategy B derives it from monthly compensation.

use super::{first_table_sheet, parse_amount, ColumnResolver, Loaded, SourceKind, SourceLoader};
use crate::entities::{CompensationRecord, RateComponent, RateSource};
use crate::error::{AnalysisError, Result};
use crate::sheet::Workbook;
use std::collections::{BTreeSet, HashSet};

pub const STAFF_COLUMNS: [&str; 2] = ["Last Name", "LastName"];
const DIRECT_RATE_COLUMNS: [&str; 3] = ["Base Cost Per Hour", "Base Cost/Hour", "Hourly Cost"];
const TOTAL_COLUMNS: [&str; 3] = ["Total", "Total Compensation", "Monthly Total"];

/// Monthly compensation components: (canonical name, header aliases)
const COMPONENTS: [(&str, &[&str]); 7] = [
    ("Base Compensation", &["Base Compensation", "Base Salary"]),
    ("Company Taxes Paid", &["Company Taxes Paid", "Employer Taxes"]),
    ("ICHRA Contribution", &["ICHRA Contribution", "ICHRA"]),
    ("401k Match", &["401k Match", "401(k) Match"]),
    ("Executive Assistant", &["Executive Assistant"]),
    ("Well Being Card", &["Well Being Card", "Well-Being Card"]),
    ("Travel & Expenses", &["Travel & Expenses", "Travel and Expenses"]),
];

enum Strategy {
    Direct(usize),
    Total(usize),
    Components(Vec<(&'static str, usize)>),
}

pub struct CompensationLoader {
    expected_monthly_hours: f64,
}

impl CompensationLoader {
    pub fn new(expected_monthly_hours: f64) -> Self {
        CompensationLoader {
            expected_monthly_hours,
        }
    }

    fn choose_strategy(&self, resolver: &ColumnResolver) -> Result<Strategy> {
        if let Some(col) = resolver.find(&DIRECT_RATE_COLUMNS) {
            return Ok(Strategy::Direct(col));
        }
        if let Some(col) = resolver.find(&TOTAL_COLUMNS) {
            return Ok(Strategy::Total(col));
        }

        let components: Vec<(&'static str, usize)> = COMPONENTS
            .iter()
            .filter_map(|(name, aliases)| resolver.find(aliases).map(|col| (*name, col)))
            .collect();

        if components.is_empty() {
            let mut candidates: Vec<String> = DIRECT_RATE_COLUMNS
                .iter()
                .chain(TOTAL_COLUMNS.iter())
                .map(|c| c.to_string())
                .collect();
            candidates.extend(COMPONENTS.iter().map(|(name, _)| name.to_string()));

            return Err(AnalysisError::MissingColumn {
                source_name: SourceKind::Compensation.name().to_string(),
                field: "hourly cost or compensation components".to_string(),
                candidates,
            });
        }

        Ok(Strategy::Components(components))
    }
}

impl Default for CompensationLoader {
    fn default() -> Self {
        CompensationLoader::new(216.6667)
    }
}

impl SourceLoader for CompensationLoader {
    type Output = Vec<CompensationRecord>;

    fn load(&self, workbook: &Workbook) -> Result<Loaded<Vec<CompensationRecord>>> {
        let kind = self.source_kind();
        let sheet = first_table_sheet(workbook, kind)?;
        let table = sheet
            .table()
            .ok_or_else(|| AnalysisError::missing_structure(kind.name(), "no header row"))?;

        let resolver = ColumnResolver::new(kind, &table.headers);
        let staff_col = resolver.require("staff identity", &STAFF_COLUMNS)?;
        let strategy = self.choose_strategy(&resolver)?;

        let mut loaded = Loaded::new(Vec::new());
        match &strategy {
            Strategy::Direct(col) => loaded.log(
                kind,
                format!("Strategy A: Read '{}' directly", table.headers[*col]),
            ),
            _ => loaded.log(
                kind,
                "Strategy B: Computing hourly cost from components".to_string(),
            ),
        }

        for row in table.records() {
            let Some(staff_key) = row.get(staff_col) else {
                continue;
            };
            let amount = |col: usize| row.get(col).and_then(parse_amount).unwrap_or(0.0);

            let rate_source = match &strategy {
                Strategy::Direct(col) => RateSource::Direct(amount(*col)),
                Strategy::Total(col) => RateSource::Derived {
                    components: vec![RateComponent {
                        name: table.headers[*col].clone(),
                        amount: amount(*col),
                    }],
                    monthly_hours: self.expected_monthly_hours,
                },
                Strategy::Components(cols) => RateSource::Derived {
                    components: cols
                        .iter()
                        .map(|(name, col)| RateComponent {
                            name: name.to_string(),
                            amount: amount(*col),
                        })
                        .collect(),
                    monthly_hours: self.expected_monthly_hours,
                },
            };

            loaded.records.push(CompensationRecord::new(staff_key, rate_source));
        }

        let duplicates = find_duplicate_staff(&loaded.records);
        if !duplicates.is_empty() {
            return Err(AnalysisError::DuplicateStaff { names: duplicates });
        }

        if loaded.records.is_empty() {
            loaded.log(kind, "Compensation is empty".to_string());
            return Ok(loaded);
        }

        let count = loaded.records.len();
        let avg = loaded.records.iter().map(|r| r.hourly_cost).sum::<f64>() / count as f64;
        loaded.log(kind, format!("{} staff members, avg ${:.2}/hr", count, avg));

        Ok(loaded)
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Compensation
    }
}

/// Staff keys that occur more than once, sorted
pub fn find_duplicate_staff(records: &[CompensationRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut duplicates = BTreeSet::new();
    for record in records {
        if !seen.insert(record.staff_key.as_str()) {
            duplicates.insert(record.staff_key.clone());
        }
    }
    duplicates.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Sheet;

    fn workbook(rows: &[&[&str]]) -> Workbook {
        Workbook::single("comp.csv", Sheet::from_rows("Compensation", rows))
    }

    #[test]
    fn test_strategy_a_direct_rate() {
        let wb = workbook(&[
            &["Last Name", "Hourly Cost"],
            &["Smith", "$80.00"],
            &["Jones", "120"],
            &["", "999"],
        ]);

        let loaded = CompensationLoader::default().load(&wb).unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[0].rate_source, RateSource::Direct(80.0));
        assert_eq!(loaded.logs[0], "Strategy A: Read 'Hourly Cost' directly");
        assert_eq!(loaded.logs[1], "2 staff members, avg $100.00/hr");
    }

    #[test]
    fn test_strategy_b_components() {
        let wb = workbook(&[
            &["LastName", "Base Compensation", "Company Taxes Paid", "401k Match"],
            &["Smith", "10,000", "1,000", "375"],
        ]);

        let loaded = CompensationLoader::new(227.5).load(&wb).unwrap();
        let record = &loaded.records[0];
        assert_eq!(record.rate_source.strategy(), "B");
        assert!((record.hourly_cost - 50.0).abs() < 1e-9);

        match &record.rate_source {
            RateSource::Derived { components, .. } => assert_eq!(components.len(), 3),
            other => panic!("expected derived rate, got {:?}", other),
        }
    }

    #[test]
    fn test_strategy_b_total_column() {
        let wb = workbook(&[&["Last Name", "Monthly Total"], &["Smith", "21666.67"]]);

        let loaded = CompensationLoader::default().load(&wb).unwrap();
        assert!((loaded.records[0].hourly_cost - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_duplicate_staff_fails_with_names() {
        let wb = workbook(&[
            &["Last Name", "Hourly Cost"],
            &["Smith", "80"],
            &["Jones", "90"],
            &["Smith", "85"],
        ]);

        match CompensationLoader::default().load(&wb) {
            Err(AnalysisError::DuplicateStaff { names }) => assert_eq!(names, vec!["Smith"]),
            other => panic!("expected duplicate staff error, got {:?}", other.map(|l| l.records)),
        }
    }

    #[test]
    fn test_missing_staff_column() {
        let wb = workbook(&[&["Name", "Hourly Cost"], &["Smith", "80"]]);
        let err = CompensationLoader::default().load(&wb).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingColumn { .. }));
    }

    #[test]
    fn test_no_rate_columns() {
        let wb = workbook(&[&["Last Name", "Title"], &["Smith", "Analyst"]]);
        let err = CompensationLoader::default().load(&wb).unwrap_err();
        assert!(err.to_string().contains("Base Cost Per Hour"));
    }

    #[test]
    fn test_header_only_is_empty_not_error() {
        let wb = workbook(&[&["Last Name", "Hourly Cost"]]);
        let loaded = CompensationLoader::default().load(&wb).unwrap();
        assert!(loaded.records.is_empty());
    }
}
