// 🗂️ Classification Engine - Every code lands in exactly one category
//
// Revenue center: revenue > 0 in the revenue source.
// Cost center: configured internal code, or internal prefix without revenue.
// Non-revenue client: everything else with recorded activity.

use crate::config::AnalysisConfig;
use crate::entities::{
    Category, CostCenter, CostPool, ExpenseRecord, NonRevenueClient, ProjectCode, RevenueCenter,
    RevenueLine, TimeEntryRecord,
};
use crate::error::{AnalysisError, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Revenue source order
    pub revenue_centers: Vec<RevenueCenter>,
    /// Configured centers in config order, then inferred centers by code
    pub cost_centers: Vec<CostCenter>,
    /// Sorted by code
    pub non_revenue_clients: Vec<NonRevenueClient>,
}

impl Classification {
    pub fn summary(&self) -> String {
        format!(
            "Classification: {} revenue centers, {} cost centers, {} non-revenue clients",
            self.revenue_centers.len(),
            self.cost_centers.len(),
            self.non_revenue_clients.len()
        )
    }
}

pub struct ClassificationEngine<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> ClassificationEngine<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        ClassificationEngine { config }
    }

    /// Configured cost-center codes, normalized like every other code
    fn configured_codes(&self) -> Result<Vec<(ProjectCode, &'a str, CostPool)>> {
        self.config
            .cost_centers
            .iter()
            .map(|cc| {
                ProjectCode::normalize(&cc.code)
                    .map(|code| (code, cc.description.as_str(), cc.pool))
                    .map_err(|e| AnalysisError::Config(format!("cost center code: {}", e)))
            })
            .collect()
    }

    /// Single-code rule; conflicts are reported by `classify`, which sees every code
    pub fn classify_code(
        &self,
        code: &ProjectCode,
        has_revenue: bool,
        configured: bool,
    ) -> Category {
        if has_revenue {
            Category::RevenueCenter
        } else if configured || code.has_prefix(&self.config.internal_code_prefix) {
            Category::CostCenter
        } else {
            Category::NonRevenueClient
        }
    }

    pub fn classify(
        &self,
        revenue: &[RevenueLine],
        time_entries: &[TimeEntryRecord],
        expenses: &[ExpenseRecord],
    ) -> Result<Classification> {
        let configured = self.configured_codes()?;
        let configured_lookup: HashMap<&ProjectCode, (&str, CostPool)> = configured
            .iter()
            .map(|(code, desc, pool)| (code, (*desc, *pool)))
            .collect();

        let revenue_codes: BTreeSet<&ProjectCode> = revenue
            .iter()
            .filter(|line| line.revenue > 0.0)
            .map(|line| &line.code)
            .collect();

        // Fail on every conflicting code at once
        let conflicts: Vec<String> = revenue_codes
            .iter()
            .filter(|code| configured_lookup.contains_key(*code))
            .map(|code| code.to_string())
            .collect();
        if !conflicts.is_empty() {
            return Err(AnalysisError::ClassificationConflict { codes: conflicts });
        }

        // First project name seen in time entries, per code
        let mut names: HashMap<&ProjectCode, &str> = HashMap::new();
        for entry in time_entries {
            if let Some(name) = entry.project_name.as_deref() {
                names.entry(&entry.code).or_insert(name);
            }
        }

        let mut all_codes: BTreeSet<&ProjectCode> = BTreeSet::new();
        all_codes.extend(revenue.iter().map(|l| &l.code));
        all_codes.extend(time_entries.iter().map(|t| &t.code));
        all_codes.extend(expenses.iter().map(|e| &e.code));
        all_codes.extend(configured.iter().map(|(code, _, _)| code));

        let mut inferred: BTreeMap<&ProjectCode, CostCenter> = BTreeMap::new();
        let mut non_revenue_clients = Vec::new();

        for code in all_codes {
            let is_configured = configured_lookup.contains_key(code);
            match self.classify_code(code, revenue_codes.contains(code), is_configured) {
                Category::RevenueCenter => {}
                Category::CostCenter if is_configured => {}
                Category::CostCenter => {
                    let description = names.get(code).copied().unwrap_or(code.as_str());
                    inferred.insert(code, empty_cost_center(code, description, CostPool::Sga, true));
                }
                Category::NonRevenueClient => non_revenue_clients.push(NonRevenueClient {
                    code: code.clone(),
                    name: names.get(code).copied().unwrap_or(code.as_str()).to_string(),
                    hours: 0.0,
                    labor_cost: 0.0,
                    expense_cost: 0.0,
                    total_cost: 0.0,
                }),
            }
        }

        let revenue_centers = revenue
            .iter()
            .filter(|line| revenue_codes.contains(&line.code))
            .map(|line| RevenueCenter {
                code: line.code.clone(),
                name: line.project_name.clone(),
                section: line.section.clone(),
                analysis_category: line.analysis_category.clone(),
                allocation_tag: line.allocation_tag,
                revenue: line.revenue,
                hours: 0.0,
                labor_cost: 0.0,
                expense_cost: 0.0,
                sga_allocation: 0.0,
                data_allocation: 0.0,
                workplace_allocation: 0.0,
                margin_dollars: 0.0,
                margin_percent: 0.0,
            })
            .collect();

        let mut cost_centers: Vec<CostCenter> = configured
            .iter()
            .map(|(code, desc, pool)| empty_cost_center(code, desc, *pool, false))
            .collect();
        cost_centers.extend(inferred.into_values());

        let classification = Classification {
            revenue_centers,
            cost_centers,
            non_revenue_clients,
        };
        tracing::debug!(
            revenue_centers = classification.revenue_centers.len(),
            cost_centers = classification.cost_centers.len(),
            non_revenue_clients = classification.non_revenue_clients.len(),
            "classified codes"
        );

        Ok(classification)
    }
}

fn empty_cost_center(code: &ProjectCode, description: &str, pool: CostPool, inferred: bool) -> CostCenter {
    CostCenter {
        code: code.clone(),
        description: description.to_string(),
        pool,
        inferred,
        hours: 0.0,
        labor_cost: 0.0,
        expense_cost: 0.0,
        total_cost: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CostCenterDefinition;
    use crate::entities::{AllocationTag, BillableFlag};
    use chrono::NaiveDate;

    fn code(s: &str) -> ProjectCode {
        ProjectCode::normalize(s).unwrap()
    }

    fn line(c: &str, revenue: f64, tag: Option<AllocationTag>) -> RevenueLine {
        RevenueLine {
            code: code(c),
            project_name: format!("Project {}", c),
            section: None,
            analysis_category: "Unknown".to_string(),
            allocation_tag: tag,
            revenue,
        }
    }

    fn hours(c: &str, name: Option<&str>) -> TimeEntryRecord {
        TimeEntryRecord {
            date: NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
            code: code(c),
            staff_key: "Smith".to_string(),
            hours: 1.0,
            project_name: name.map(|n| n.to_string()),
        }
    }

    fn expense(c: &str) -> ExpenseRecord {
        ExpenseRecord {
            date: NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
            code: code(c),
            amount: 10.0,
            notes: String::new(),
            billable: BillableFlag::NonReimbursable,
        }
    }

    fn config_with(cost_centers: &[&str]) -> AnalysisConfig {
        AnalysisConfig {
            cost_centers: cost_centers
                .iter()
                .map(|c| CostCenterDefinition {
                    code: c.to_string(),
                    description: format!("{} desc", c),
                    pool: CostPool::Sga,
                })
                .collect(),
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_three_way_split() {
        let config = config_with(&["C1"]);
        let engine = ClassificationEngine::new(&config);

        let result = engine
            .classify(
                &[line("R1", 100.0, Some(AllocationTag::Data)), line("R2", 200.0, None)],
                &[hours("C1", None), hours("X1", Some("Prospect"))],
                &[],
            )
            .unwrap();

        let rc: Vec<_> = result.revenue_centers.iter().map(|r| r.code.as_str()).collect();
        let cc: Vec<_> = result.cost_centers.iter().map(|c| c.code.as_str()).collect();
        let nrc: Vec<_> = result.non_revenue_clients.iter().map(|n| n.code.as_str()).collect();

        assert_eq!(rc, vec!["R1", "R2"]);
        assert_eq!(cc, vec!["C1"]);
        assert_eq!(nrc, vec!["X1"]);
        assert_eq!(result.non_revenue_clients[0].name, "Prospect");
    }

    #[test]
    fn test_conflict_names_code() {
        let config = config_with(&["THS-25-01-DEV"]);
        let engine = ClassificationEngine::new(&config);

        let err = engine
            .classify(&[line("THS-25-01-DEV", 500.0, None)], &[], &[])
            .unwrap_err();
        assert!(err.to_string().contains("THS-25-01-DEV"));
        assert!(matches!(err, AnalysisError::ClassificationConflict { .. }));
    }

    #[test]
    fn test_internal_prefix_inferred_as_cost_center() {
        let config = config_with(&[]);
        let engine = ClassificationEngine::new(&config);

        let result = engine
            .classify(
                &[],
                &[hours("THS-25-01-NEW", Some("New Initiative"))],
                &[expense("THS-25-01-ZZZ")],
            )
            .unwrap();

        assert_eq!(result.cost_centers.len(), 2);
        assert_eq!(result.cost_centers[0].description, "New Initiative");
        assert!(result.cost_centers[0].inferred);
        assert_eq!(result.cost_centers[1].description, "THS-25-01-ZZZ");
        assert_eq!(result.cost_centers[1].pool, CostPool::Sga);
    }

    #[test]
    fn test_prefixed_code_with_revenue_is_revenue_center() {
        let config = config_with(&[]);
        let engine = ClassificationEngine::new(&config);

        let result = engine
            .classify(&[line("THS-CLIENT", 50.0, None)], &[hours("THS-CLIENT", None)], &[])
            .unwrap();
        assert_eq!(result.revenue_centers.len(), 1);
        assert!(result.cost_centers.is_empty());
    }

    #[test]
    fn test_zero_revenue_line_falls_through() {
        let config = config_with(&["C1"]);
        let engine = ClassificationEngine::new(&config);

        let result = engine
            .classify(&[line("C1", 0.0, None), line("Z9", 0.0, None)], &[], &[])
            .unwrap();
        assert!(result.revenue_centers.is_empty());
        assert_eq!(result.cost_centers[0].code, code("C1"));
        assert_eq!(result.non_revenue_clients[0].code, code("Z9"));
    }

    #[test]
    fn test_categories_disjoint_and_exhaustive() {
        let config = AnalysisConfig::default();
        let engine = ClassificationEngine::new(&config);

        let revenue = vec![line("R1", 10.0, None), line("R2", 5.0, None)];
        let time = vec![hours("R1", None), hours("THS-25-01-DEV", None), hours("N1", None)];
        let expenses = vec![expense("N2"), expense("THS-X")];

        let result = engine.classify(&revenue, &time, &expenses).unwrap();

        let mut seen: Vec<&ProjectCode> = result
            .revenue_centers
            .iter()
            .map(|r| &r.code)
            .chain(result.cost_centers.iter().map(|c| &c.code))
            .chain(result.non_revenue_clients.iter().map(|n| &n.code))
            .collect();
        let total = seen.len();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), total, "categories overlap");

        let mut universe: BTreeSet<ProjectCode> = BTreeSet::new();
        universe.extend(revenue.iter().map(|l| l.code.clone()));
        universe.extend(time.iter().map(|t| t.code.clone()));
        universe.extend(expenses.iter().map(|e| e.code.clone()));
        universe.extend(config.cost_centers.iter().map(|c| code(&c.code)));
        assert_eq!(universe.len(), total);
    }
}
