use serde::{Deserialize, Serialize};

use crate::{round2, AllocationError, AllocationPeriod};

pub const MAX_CAPACITY_PERCENTAGE: f64 = 100.0;

/// An already stored allocation, as seen by the capacity check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingAllocation {
    pub id: i32,
    pub period: AllocationPeriod,
    pub allocated_percentage: Option<f64>,
    pub allocated_hours: u32,
}

impl ExistingAllocation {
    fn percentage(&self) -> f64 {
        self.allocated_percentage.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapSummary {
    pub total: f64,
    pub overlapping_ids: Vec<i32>,
}

/// An allocation whose overlapping set adds up to more than 100%.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overallocation {
    pub allocation_id: i32,
    pub period: AllocationPeriod,
    pub total_percentage: f64,
    pub overlapping_ids: Vec<i32>,
}

/// Sums the percentage of every allocation in `existing` that overlaps
/// `period`.
pub fn overlapping_total(
    period: &AllocationPeriod,
    existing: &[ExistingAllocation],
) -> OverlapSummary {
    existing
        .iter()
        .filter(|allocation| period.overlaps(&allocation.period))
        .fold(OverlapSummary::default(), |mut summary, allocation| {
            summary.total += allocation.percentage();
            summary.overlapping_ids.push(allocation.id);
            summary
        })
}

/// Rejects a candidate allocation that would push the employee above 100%
/// in any period it overlaps.
///
/// `existing` must not contain the allocation being edited.
pub fn check_capacity(
    employee_id: i32,
    period: &AllocationPeriod,
    candidate_percentage: f64,
    existing: &[ExistingAllocation],
) -> Result<OverlapSummary, AllocationError> {
    let mut summary = overlapping_total(period, existing);
    summary.total = round2(summary.total);

    if round2(summary.total + candidate_percentage) > MAX_CAPACITY_PERCENTAGE {
        tracing::warn!(
            employee_id,
            current_total = summary.total,
            requested = candidate_percentage,
            "allocation would exceed capacity"
        );
        return Err(AllocationError::CapacityExceeded {
            employee_id,
            current_total: summary.total,
            requested: candidate_percentage,
        });
    }

    Ok(summary)
}

/// Finds stored allocations whose overlapping set already exceeds 100%.
pub fn find_overallocations(allocations: &[ExistingAllocation]) -> Vec<Overallocation> {
    allocations
        .iter()
        .filter_map(|allocation| {
            let summary = overlapping_total(&allocation.period, allocations);
            let total = round2(summary.total);

            (total > MAX_CAPACITY_PERCENTAGE).then(|| Overallocation {
                allocation_id: allocation.id,
                period: allocation.period,
                total_percentage: total,
                overlapping_ids: summary
                    .overlapping_ids
                    .into_iter()
                    .filter(|id| *id != allocation.id)
                    .collect(),
            })
        })
        .collect()
}
