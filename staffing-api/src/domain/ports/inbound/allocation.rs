use allocation::Overallocation;
use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{
    models::{
        Allocation, AllocationHistoryEntry, AllocationId, EmployeeId, NewAllocationRequest,
        UpdateAllocationRequest,
    },
    StaffingError,
};

/// Over-allocations found for one employee.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeAudit {
    pub employee_id: EmployeeId,
    pub overallocations: Vec<Overallocation>,
}

/// Inbound port for allocation use cases.
///
/// Writes either persist the allocation, its derived magnitude and a history
/// entry together, or persist nothing.
#[async_trait]
pub trait AllocationService: Send + Sync + 'static {
    /// Create an allocation, deriving the companion magnitude field and
    /// enforcing the capacity ceiling when the policy asks for it.
    async fn create_allocation(
        &self,
        request: &NewAllocationRequest,
    ) -> Result<Allocation, StaffingError>;

    /// Edit an allocation. The allocation itself is excluded from the
    /// overlapping total.
    async fn update_allocation(
        &self,
        id: AllocationId,
        request: &UpdateAllocationRequest,
    ) -> Result<Allocation, StaffingError>;

    /// Delete an allocation. Its history is kept.
    async fn delete_allocation(&self, id: AllocationId) -> Result<(), StaffingError>;

    async fn get_allocations(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<Allocation>, StaffingError>;

    async fn get_history(
        &self,
        allocation_id: AllocationId,
    ) -> Result<Vec<AllocationHistoryEntry>, StaffingError>;

    /// Report stored allocations that already exceed 100%, for one employee
    /// or all of them. Employees without findings are left out.
    async fn audit(
        &self,
        employee_id: Option<EmployeeId>,
    ) -> Result<Vec<EmployeeAudit>, StaffingError>;
}
