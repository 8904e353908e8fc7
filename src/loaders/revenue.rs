// 💰 Revenue Loader - Pro Forma workbook (projects by month)
//
// Layout: a header row with the month sequence, a "Base Revenue" total row,
// then section rows (col B only) and project rows (col B name + col C code).
// Column A carries the optional allocation tag.

use super::{parse_amount, Loaded, SourceKind, SourceLoader};
use crate::config::AnalysisConfig;
use crate::entities::{AllocationTag, ProjectCode, RevenueLine};
use crate::error::{AnalysisError, Result};
use crate::period::Period;
use crate::reconciliation::ReconciliationEngine;
use crate::sheet::{Sheet, Workbook};
use std::collections::HashMap;

const HEADER_SEARCH_ROWS: usize = 10;
const TOTAL_SEARCH_ROWS: usize = 20;
const TOTAL_ROW_KEYWORDS: [&str; 2] = ["base revenue", "forecasted revenue"];

const COL_TAG: usize = 0;
const COL_NAME: usize = 1;
const COL_CODE: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct RevenueSource {
    /// Aggregated by code, in first-appearance order
    pub lines: Vec<RevenueLine>,
    /// Total from the workbook's own revenue row
    pub reported_total: f64,
}

impl RevenueSource {
    pub fn calculated_total(&self) -> f64 {
        self.lines.iter().map(|l| l.revenue).sum()
    }
}

pub struct RevenueLoader<'a> {
    config: &'a AnalysisConfig,
    period: Period,
}

impl<'a> RevenueLoader<'a> {
    pub fn new(config: &'a AnalysisConfig, period: Period) -> Self {
        RevenueLoader { config, period }
    }

    fn find_header_row(&self, sheet: &Sheet) -> Result<usize> {
        (0..sheet.row_count().min(HEADER_SEARCH_ROWS))
            .find(|&idx| {
                let text = sheet.row(idx).map(|r| r.join(" ")).unwrap_or_default();
                text.contains("Jan") && text.contains("Feb") && text.contains("Mar")
            })
            .ok_or_else(|| {
                AnalysisError::missing_structure(
                    SourceKind::Revenue.name(),
                    "cannot find header row with month sequence (Jan, Feb, Mar)",
                )
            })
    }

    fn find_month_column(&self, sheet: &Sheet, header_row: usize) -> Result<usize> {
        let name = self.period.month_name();
        let abbrev = self.period.month_abbrev();
        let header = sheet.row(header_row).unwrap_or_default();

        header
            .iter()
            .position(|cell| {
                let cell = cell.trim();
                cell == name || cell == abbrev || cell.eq_ignore_ascii_case(name)
            })
            .ok_or_else(|| {
                AnalysisError::missing_structure(
                    SourceKind::Revenue.name(),
                    format!("cannot find month column for '{}' in header", name),
                )
            })
    }

    fn find_total_row(&self, sheet: &Sheet) -> Result<usize> {
        (0..sheet.row_count().min(TOTAL_SEARCH_ROWS))
            .find(|&idx| {
                sheet
                    .cell(idx, COL_NAME)
                    .map(|b| {
                        let b = b.to_lowercase();
                        TOTAL_ROW_KEYWORDS.iter().any(|k| b.contains(k))
                    })
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                AnalysisError::missing_structure(
                    SourceKind::Revenue.name(),
                    "cannot find total revenue row (Base Revenue or Forecasted Revenue)",
                )
            })
    }

    fn parse_projects(
        &self,
        sheet: &Sheet,
        header_row: usize,
        month_col: usize,
    ) -> Result<Vec<RevenueLine>> {
        let mut projects = Vec::new();
        let mut section: Option<String> = None;

        for idx in (header_row + 1)..sheet.row_count() {
            let name = sheet.cell(idx, COL_NAME);
            let code = sheet.cell(idx, COL_CODE);

            match (name, code) {
                (Some(name), None) => section = Some(name.to_string()),
                (Some(name), Some(code)) => {
                    projects.push(RevenueLine {
                        code: ProjectCode::normalize(code)?,
                        project_name: name.to_string(),
                        section: section.clone(),
                        analysis_category: self.config.category_for(section.as_deref()),
                        allocation_tag: sheet.cell(idx, COL_TAG).and_then(AllocationTag::parse),
                        revenue: sheet
                            .cell(idx, month_col)
                            .and_then(parse_amount)
                            .unwrap_or(0.0),
                    });
                }
                // Blank rows and codes without a project name
                _ => continue,
            }
        }

        Ok(projects)
    }
}

/// Collapse repeated codes: revenue summed, first name/section kept, tags reconciled
pub fn aggregate_duplicates(projects: Vec<RevenueLine>) -> Result<(Vec<RevenueLine>, usize)> {
    let total_rows = projects.len();
    let mut index: HashMap<ProjectCode, usize> = HashMap::new();
    let mut aggregated: Vec<RevenueLine> = Vec::new();

    for project in projects {
        match index.get(&project.code) {
            Some(&pos) => {
                let existing = &mut aggregated[pos];
                existing.allocation_tag = match (existing.allocation_tag, project.allocation_tag) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(AnalysisError::AllocationTagConflict {
                            code: project.code.to_string(),
                        })
                    }
                    (Some(a), _) => Some(a),
                    (None, b) => b,
                };
                existing.revenue += project.revenue;
            }
            None => {
                index.insert(project.code.clone(), aggregated.len());
                aggregated.push(project);
            }
        }
    }

    let duplicates = total_rows - aggregated.len();
    Ok((aggregated, duplicates))
}

impl<'a> SourceLoader for RevenueLoader<'a> {
    type Output = RevenueSource;

    fn load(&self, workbook: &Workbook) -> Result<Loaded<RevenueSource>> {
        let kind = self.source_kind();
        let sheet = workbook
            .sheet(&self.config.revenue_sheet)
            .ok_or_else(|| AnalysisError::MissingSheet {
                source_name: kind.name().to_string(),
                sheet: self.config.revenue_sheet.clone(),
            })?;

        let header_row = self.find_header_row(sheet)?;
        let month_col = self.find_month_column(sheet, header_row)?;
        let total_row = self.find_total_row(sheet)?;
        let reported_total = sheet
            .cell(total_row, month_col)
            .and_then(parse_amount)
            .unwrap_or(0.0);

        let projects = self.parse_projects(sheet, header_row, month_col)?;
        if projects.is_empty() {
            return Err(AnalysisError::missing_structure(
                kind.name(),
                "no projects found after parsing",
            ));
        }

        let (lines, duplicates) = aggregate_duplicates(projects)?;
        let source = RevenueSource {
            lines,
            reported_total,
        };

        let calculated = source.calculated_total();
        let check = ReconciliationEngine::with_tolerance(self.config.tolerance).reconcile(
            "Revenue sum",
            calculated,
            reported_total,
        );
        if check.result.has_discrepancy() {
            return Err(AnalysisError::RevenueMismatch {
                calculated,
                reported: reported_total,
                difference: check.result.difference(),
            });
        }

        let mut loaded = Loaded::new(source);
        if duplicates > 0 {
            loaded.log(kind, format!("Aggregated {} duplicate contract codes", duplicates));
        }

        let lines = &loaded.records.lines;
        let count = |tag: Option<AllocationTag>| {
            lines.iter().filter(|l| l.allocation_tag == tag).count()
        };
        let (data, wellness, untagged) = (
            count(Some(AllocationTag::Data)),
            count(Some(AllocationTag::Wellness)),
            count(None),
        );
        let project_count = lines.len();

        loaded.log(
            kind,
            format!("Pro Forma: {} projects, revenue ${:.2}", project_count, reported_total),
        );
        loaded.log(
            kind,
            format!(
                "Allocation tags: {} Data, {} Wellness, {} untagged",
                data, wellness, untagged
            ),
        );

        Ok(loaded)
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Revenue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pro_forma(rows: &[&[&str]]) -> Workbook {
        Workbook::single("pro_forma.csv", Sheet::from_rows("PRO FORMA 2025", rows))
    }

    fn november() -> Period {
        Period::parse("November2025").unwrap()
    }

    fn standard_rows() -> Vec<&'static [&'static str]> {
        vec![
            &["", "Pro Forma 2025", "", "", ""],
            &["", "", "", "Oct", "Nov"],
            &["", "Base Revenue", "", "1000", "300"],
            &["", "BEH", "", "", ""],
            &["Data", "Project One", "R1", "400", "100"],
            &["", "PAD", "", "", ""],
            &["", "Project Two", "R2", "600", "200"],
        ]
    }

    #[test]
    fn test_missing_sheet() {
        let config = AnalysisConfig::default();
        let wb = Workbook::single("x.csv", Sheet::from_rows("Other", &[&["a"]]));
        let err = RevenueLoader::new(&config, november()).load(&wb).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingSheet { .. }));
    }

    #[test]
    fn test_header_needs_month_sequence() {
        let config = AnalysisConfig::default();
        let wb = pro_forma(&[&["", "Base Revenue", "", "Nov"]]);
        let err = RevenueLoader::new(&config, november()).load(&wb).unwrap_err();
        assert!(err.to_string().contains("month sequence"));
    }

    #[test]
    fn test_loads_projects_with_sections_and_tags() {
        let config = AnalysisConfig::default();
        let mut rows = standard_rows();
        rows[1] = &["", "", "Jan Feb Mar", "Oct", "Nov"];
        let wb = pro_forma(&rows);

        let loaded = RevenueLoader::new(&config, november()).load(&wb).unwrap();
        let lines = &loaded.records.lines;

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].code.as_str(), "R1");
        assert_eq!(lines[0].allocation_tag, Some(AllocationTag::Data));
        assert_eq!(lines[0].analysis_category, "Behavioral Health");
        assert_eq!(lines[1].section.as_deref(), Some("PAD"));
        assert_eq!(lines[1].allocation_tag, None);
        assert_eq!(loaded.records.reported_total, 300.0);
        assert!(loaded
            .logs
            .iter()
            .any(|l| l == "Allocation tags: 1 Data, 0 Wellness, 1 untagged"));
    }

    #[test]
    fn test_missing_month_column() {
        let config = AnalysisConfig::default();
        let wb = pro_forma(&[&["", "Base Revenue", "Jan", "Feb", "Mar"]]);
        let err = RevenueLoader::new(&config, november()).load(&wb).unwrap_err();
        assert!(err.to_string().contains("'November'"));
    }

    #[test]
    fn test_duplicates_aggregate_and_reconcile_tag() {
        let config = AnalysisConfig::default();
        let wb = pro_forma(&[
            &["", "", "Jan", "Feb", "Mar", "Nov"],
            &["", "Forecasted Revenue", "", "", "", "$1,500"],
            &["", "Project A", "A1", "", "", "1,000"],
            &["Wellness", "Project A (ext)", "A1", "", "", "500"],
        ]);

        let loaded = RevenueLoader::new(&config, november()).load(&wb).unwrap();
        let lines = &loaded.records.lines;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].revenue, 1500.0);
        assert_eq!(lines[0].project_name, "Project A");
        assert_eq!(lines[0].allocation_tag, Some(AllocationTag::Wellness));
        assert!(loaded.logs.contains(&"Aggregated 1 duplicate contract codes".to_string()));
    }

    #[test]
    fn test_conflicting_tags_fail() {
        let config = AnalysisConfig::default();
        let wb = pro_forma(&[
            &["", "", "Jan", "Feb", "Mar", "Nov"],
            &["", "Base Revenue", "", "", "", "20"],
            &["Data", "Project A", "A1", "", "", "10"],
            &["Wellness", "Project A", "A1", "", "", "10"],
        ]);

        let err = RevenueLoader::new(&config, november()).load(&wb).unwrap_err();
        assert!(matches!(err, AnalysisError::AllocationTagConflict { ref code } if code == "A1"));
    }

    #[test]
    fn test_total_mismatch_fails() {
        let config = AnalysisConfig::default();
        let wb = pro_forma(&[
            &["", "", "Jan", "Feb", "Mar", "Nov"],
            &["", "Base Revenue", "", "", "", "100"],
            &["", "Project A", "A1", "", "", "99.50"],
        ]);

        let err = RevenueLoader::new(&config, november()).load(&wb).unwrap_err();
        match err {
            AnalysisError::RevenueMismatch { difference, .. } => {
                assert!((difference - 0.5).abs() < 1e-9)
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_no_projects_fails() {
        let config = AnalysisConfig::default();
        let wb = pro_forma(&[
            &["", "", "Jan", "Feb", "Mar", "Nov"],
            &["", "Base Revenue", "", "", "", "0"],
        ]);

        let err = RevenueLoader::new(&config, november()).load(&wb).unwrap_err();
        assert!(err.to_string().contains("no projects"));
    }
}
