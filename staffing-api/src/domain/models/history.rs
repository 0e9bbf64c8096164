use allocation::{AllocationMode, AllocationPeriod, Magnitude};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

use super::{Allocation, AllocationHistoryId, AllocationId, EmployeeId, ProjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    #[strum(serialize = "created")]
    Created,
    #[strum(serialize = "updated")]
    Updated,
    #[strum(serialize = "deleted")]
    Deleted,
}

/// Snapshot of an allocation at the time it was written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationHistoryEntry {
    pub id: AllocationHistoryId,
    pub allocation_id: AllocationId,
    pub employee_id: EmployeeId,
    pub project_id: ProjectId,
    pub action: HistoryAction,
    pub mode: AllocationMode,
    pub period: AllocationPeriod,
    pub allocated_hours: u32,
    pub allocated_percentage: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAllocationHistoryEntry {
    pub allocation_id: AllocationId,
    pub employee_id: EmployeeId,
    pub project_id: ProjectId,
    pub action: HistoryAction,
    pub mode: AllocationMode,
    pub period: AllocationPeriod,
    pub magnitude: Magnitude,
}

impl NewAllocationHistoryEntry {
    pub fn new(
        allocation: &Allocation,
        action: HistoryAction,
        mode: AllocationMode,
        magnitude: Magnitude,
    ) -> Self {
        Self {
            allocation_id: allocation.id,
            employee_id: allocation.employee_id,
            project_id: allocation.project_id,
            action,
            mode,
            period: allocation.period,
            magnitude,
        }
    }
}
