// 📊 Overhead Allocation Engine - Pools from the ledger, shares by revenue
//
// SG&A     → every revenue center
// Data     → Data-tagged revenue centers only
// Workplace→ Wellness-tagged revenue centers only
//
// Weight = center revenue / subset revenue. Every distribution is re-summed and
// must reconcile to its pool within tolerance.

use crate::entities::{AllocationTag, CostCenter, CostPool, LedgerAccount, LedgerBucket, RevenueCenter};
use crate::error::{AnalysisError, Result};
use crate::reconciliation::ReconciliationEngine;
use serde::{Deserialize, Serialize};

// ============================================================================
// POOLS
// ============================================================================

/// Pool totals plus where each came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OverheadPools {
    pub sga_pool: f64,
    pub data_pool: f64,
    pub workplace_pool: f64,

    pub sga_from_ledger: f64,
    pub data_from_ledger: f64,
    pub workplace_from_ledger: f64,
    /// NIL bucket, kept out of every pool
    pub nil_excluded: f64,

    pub sga_from_cost_centers: f64,
    pub data_from_cost_centers: f64,
}

impl OverheadPools {
    pub fn total(&self) -> f64 {
        self.sga_pool + self.data_pool + self.workplace_pool
    }

    pub fn pool(&self, pool: OverheadPool) -> f64 {
        match pool {
            OverheadPool::Sga => self.sga_pool,
            OverheadPool::Data => self.data_pool,
            OverheadPool::Workplace => self.workplace_pool,
        }
    }

    /// All three totals are finite numbers
    pub fn is_complete(&self) -> bool {
        [self.sga_pool, self.data_pool, self.workplace_pool]
            .iter()
            .all(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverheadPool {
    Sga,
    Data,
    Workplace,
}

impl OverheadPool {
    pub const ALL: [OverheadPool; 3] = [OverheadPool::Sga, OverheadPool::Data, OverheadPool::Workplace];

    pub fn name(&self) -> &'static str {
        match self {
            OverheadPool::Sga => "SG&A",
            OverheadPool::Data => "Data",
            OverheadPool::Workplace => "Workplace",
        }
    }

    /// Column name in result tables
    pub fn column(&self) -> &'static str {
        match self {
            OverheadPool::Sga => "sga_allocation",
            OverheadPool::Data => "data_allocation",
            OverheadPool::Workplace => "workplace_allocation",
        }
    }

    /// Which revenue centers share this pool
    pub fn applies_to(&self, rc: &RevenueCenter) -> bool {
        match self {
            OverheadPool::Sga => true,
            OverheadPool::Data => rc.has_tag(AllocationTag::Data),
            OverheadPool::Workplace => rc.has_tag(AllocationTag::Wellness),
        }
    }

    pub fn allocation(&self, rc: &RevenueCenter) -> f64 {
        match self {
            OverheadPool::Sga => rc.sga_allocation,
            OverheadPool::Data => rc.data_allocation,
            OverheadPool::Workplace => rc.workplace_allocation,
        }
    }

    fn set_allocation(&self, rc: &mut RevenueCenter, amount: f64) {
        match self {
            OverheadPool::Sga => rc.sga_allocation = amount,
            OverheadPool::Data => rc.data_allocation = amount,
            OverheadPool::Workplace => rc.workplace_allocation = amount,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TaggedRevenue {
    pub total: f64,
    pub data_tagged: f64,
    pub wellness_tagged: f64,
}

impl TaggedRevenue {
    pub fn from_centers(centers: &[RevenueCenter]) -> Self {
        let sum = |pool: OverheadPool| -> f64 {
            centers
                .iter()
                .filter(|rc| pool.applies_to(rc))
                .map(|rc| rc.revenue)
                .sum()
        };
        TaggedRevenue {
            total: sum(OverheadPool::Sga),
            data_tagged: sum(OverheadPool::Data),
            wellness_tagged: sum(OverheadPool::Workplace),
        }
    }
}

// ============================================================================
// ALLOCATION ENGINE
// ============================================================================

pub struct AllocationEngine {
    pub tolerance: f64,
    pub include_cost_centers: bool,
}

impl AllocationEngine {
    pub fn new() -> Self {
        AllocationEngine {
            tolerance: 0.01,
            include_cost_centers: true,
        }
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        AllocationEngine {
            tolerance,
            ..AllocationEngine::new()
        }
    }

    pub fn include_cost_centers(mut self, include: bool) -> Self {
        self.include_cost_centers = include;
        self
    }

    /// Sum ledger buckets, then add cost-center totals to the matching pool
    pub fn calculate_pools(&self, ledger: &[LedgerAccount], cost_centers: &[CostCenter]) -> OverheadPools {
        let bucket_total = |bucket: LedgerBucket| -> f64 {
            ledger
                .iter()
                .filter(|a| a.bucket == bucket)
                .map(|a| a.amount)
                .sum()
        };
        let cc_total = |pool: CostPool| -> f64 {
            cost_centers
                .iter()
                .filter(|cc| cc.pool == pool)
                .map(|cc| cc.total_cost)
                .sum()
        };

        let mut pools = OverheadPools {
            sga_from_ledger: bucket_total(LedgerBucket::Sga),
            data_from_ledger: bucket_total(LedgerBucket::Data),
            workplace_from_ledger: bucket_total(LedgerBucket::Workplace),
            nil_excluded: bucket_total(LedgerBucket::Nil),
            ..OverheadPools::default()
        };

        if self.include_cost_centers {
            pools.sga_from_cost_centers = cc_total(CostPool::Sga);
            pools.data_from_cost_centers = cc_total(CostPool::Data);
        }

        pools.sga_pool = pools.sga_from_ledger + pools.sga_from_cost_centers;
        pools.data_pool = pools.data_from_ledger + pools.data_from_cost_centers;
        pools.workplace_pool = pools.workplace_from_ledger;

        pools
    }

    /// Distribute one pool pro-rata by revenue over its subset.
    ///
    /// Centers outside the subset get exactly zero. A subset with no positive
    /// revenue receives nothing; the unallocated pool then shows up as a
    /// reconciliation failure in validation.
    pub fn allocate_pool(
        &self,
        centers: &[RevenueCenter],
        pool: OverheadPool,
        amount: f64,
    ) -> Result<Vec<RevenueCenter>> {
        let subset_revenue: f64 = centers
            .iter()
            .filter(|rc| pool.applies_to(rc))
            .map(|rc| rc.revenue)
            .sum();

        let mut result = centers.to_vec();

        if subset_revenue <= 0.0 {
            for rc in result.iter_mut() {
                pool.set_allocation(rc, 0.0);
            }
            if amount != 0.0 {
                tracing::warn!(pool = pool.name(), amount, "no revenue to allocate pool against");
            }
            return Ok(result);
        }

        for rc in result.iter_mut() {
            let share = if pool.applies_to(rc) {
                rc.revenue / subset_revenue * amount
            } else {
                0.0
            };
            pool.set_allocation(rc, share);
        }

        let report = ReconciliationEngine::with_tolerance(self.tolerance).reconcile_sum(
            pool.name(),
            result.iter().map(|rc| pool.allocation(rc)),
            amount,
        );
        if report.result.has_discrepancy() {
            let allocated: f64 = result.iter().map(|rc| pool.allocation(rc)).sum();
            return Err(AnalysisError::AllocationMismatch {
                pool: pool.name().to_string(),
                allocated,
                pool_total: amount,
                difference: report.result.difference(),
                tolerance: self.tolerance,
            });
        }

        Ok(result)
    }

    /// All three pools, then margins
    pub fn allocate(&self, centers: &[RevenueCenter], pools: &OverheadPools) -> Result<Vec<RevenueCenter>> {
        let mut result = centers.to_vec();
        for pool in OverheadPool::ALL {
            result = self.allocate_pool(&result, pool, pools.pool(pool))?;
        }
        Ok(calculate_margins(&result))
    }
}

impl Default for AllocationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// margin = revenue − direct costs − allocations; percent is 0 when revenue is 0
pub fn calculate_margins(centers: &[RevenueCenter]) -> Vec<RevenueCenter> {
    centers
        .iter()
        .map(|rc| {
            let mut rc = rc.clone();
            rc.margin_dollars = rc.revenue
                - rc.labor_cost
                - rc.expense_cost
                - rc.sga_allocation
                - rc.data_allocation
                - rc.workplace_allocation;
            rc.margin_percent = if rc.revenue != 0.0 {
                rc.margin_dollars / rc.revenue * 100.0
            } else {
                0.0
            };
            rc
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{MatchedBy, ProjectCode};

    fn center(code: &str, revenue: f64, tag: Option<AllocationTag>) -> RevenueCenter {
        RevenueCenter {
            code: ProjectCode::normalize(code).unwrap(),
            name: code.to_string(),
            section: None,
            analysis_category: "Unknown".to_string(),
            allocation_tag: tag,
            revenue,
            hours: 0.0,
            labor_cost: 0.0,
            expense_cost: 0.0,
            sga_allocation: 0.0,
            data_allocation: 0.0,
            workplace_allocation: 0.0,
            margin_dollars: 0.0,
            margin_percent: 0.0,
        }
    }

    fn account(name: &str, amount: f64, bucket: LedgerBucket) -> LedgerAccount {
        LedgerAccount {
            account_name: name.to_string(),
            amount,
            bucket,
            matched_by: MatchedBy::Contains,
        }
    }

    fn cost_center(code: &str, pool: CostPool, total: f64) -> CostCenter {
        CostCenter {
            code: ProjectCode::normalize(code).unwrap(),
            description: code.to_string(),
            pool,
            inferred: false,
            hours: 0.0,
            labor_cost: total,
            expense_cost: 0.0,
            total_cost: total,
        }
    }

    fn scenario_centers() -> Vec<RevenueCenter> {
        vec![
            center("R1", 100.0, Some(AllocationTag::Data)),
            center("R2", 200.0, None),
        ]
    }

    #[test]
    fn test_sga_pro_rata_by_revenue() {
        let engine = AllocationEngine::new();
        let result = engine
            .allocate_pool(&scenario_centers(), OverheadPool::Sga, 300.0)
            .unwrap();

        assert!((result[0].sga_allocation - 100.0).abs() < 1e-9);
        assert!((result[1].sga_allocation - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_data_pool_only_to_tagged_centers() {
        let engine = AllocationEngine::new();
        let result = engine
            .allocate_pool(&scenario_centers(), OverheadPool::Data, 90.0)
            .unwrap();

        assert!((result[0].data_allocation - 90.0).abs() < 1e-9);
        assert_eq!(result[1].data_allocation, 0.0);
    }

    #[test]
    fn test_empty_subset_gets_zero() {
        let engine = AllocationEngine::new();
        let result = engine
            .allocate_pool(&scenario_centers(), OverheadPool::Workplace, 500.0)
            .unwrap();
        assert!(result.iter().all(|rc| rc.workplace_allocation == 0.0));
    }

    #[test]
    fn test_pools_from_ledger_and_cost_centers() {
        let ledger = vec![
            account("Rent", 1000.0, LedgerBucket::Sga),
            account("AWS", 300.0, LedgerBucket::Data),
            account("Wellness", 200.0, LedgerBucket::Workplace),
            account("Depreciation", 50.0, LedgerBucket::Nil),
        ];
        let centers = vec![
            cost_center("THS-25-01-DEV", CostPool::Sga, 400.0),
            cost_center("THS-25-01-SAD", CostPool::Data, 100.0),
        ];

        let pools = AllocationEngine::new().calculate_pools(&ledger, &centers);
        assert_eq!(pools.sga_pool, 1400.0);
        assert_eq!(pools.data_pool, 400.0);
        assert_eq!(pools.workplace_pool, 200.0);
        assert_eq!(pools.nil_excluded, 50.0);
        assert_eq!(pools.sga_from_cost_centers, 400.0);
        assert!(pools.is_complete());

        let ledger_only = AllocationEngine::new()
            .include_cost_centers(false)
            .calculate_pools(&ledger, &centers);
        assert_eq!(ledger_only.sga_pool, 1000.0);
        assert_eq!(ledger_only.data_from_cost_centers, 0.0);
    }

    #[test]
    fn test_full_allocation_and_margins() {
        let mut centers = scenario_centers();
        centers[0].labor_cost = 20.0;
        centers[1].expense_cost = 10.0;

        let pools = OverheadPools {
            sga_pool: 300.0,
            data_pool: 90.0,
            ..OverheadPools::default()
        };

        let result = AllocationEngine::new().allocate(&centers, &pools).unwrap();
        for pool in OverheadPool::ALL {
            let sum: f64 = result.iter().map(|rc| pool.allocation(rc)).sum();
            assert!((sum - pools.pool(pool)).abs() <= 0.01);
        }

        // R1: 100 - 20 - 100 - 90 = -110
        assert!((result[0].margin_dollars + 110.0).abs() < 1e-9);
        assert!((result[0].margin_percent + 110.0).abs() < 1e-9);
        // R2: 200 - 10 - 200 = -10
        assert!((result[1].margin_dollars + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_revenue_margin_percent() {
        let result = calculate_margins(&[center("R0", 0.0, None)]);
        assert_eq!(result[0].margin_percent, 0.0);
    }

    #[test]
    fn test_tagged_revenue() {
        let mut centers = scenario_centers();
        centers.push(center("R3", 50.0, Some(AllocationTag::Wellness)));
        let tagged = TaggedRevenue::from_centers(&centers);
        assert_eq!(tagged.total, 350.0);
        assert_eq!(tagged.data_tagged, 100.0);
        assert_eq!(tagged.wellness_tagged, 50.0);
    }

    #[test]
    fn test_allocation_is_deterministic() {
        let engine = AllocationEngine::new();
        let pools = OverheadPools {
            sga_pool: 1234.567,
            data_pool: 89.01,
            ..OverheadPools::default()
        };
        let a = engine.allocate(&scenario_centers(), &pools).unwrap();
        let b = engine.allocate(&scenario_centers(), &pools).unwrap();
        assert_eq!(a, b);
    }
}
