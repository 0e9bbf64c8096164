//! Allocation persistence port (outbound).

use async_trait::async_trait;

use crate::domain::{
    models::{
        Allocation, AllocationHistoryEntry, AllocationHistoryId, AllocationId, Employee,
        EmployeeId, NewAllocation, NewAllocationHistoryEntry,
    },
    StaffingError,
};

/// Outbound port for allocation storage.
///
/// All writes go through an [`AllocationTransaction`], which serializes
/// writers for the same employee. That makes the read-check-write sequence
/// of the capacity ceiling atomic.
#[async_trait]
pub trait AllocationStore: Send + Sync + 'static {
    /// Open a write transaction scoped to one employee.
    ///
    /// Blocks until no other transaction for that employee is open.
    async fn begin(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Box<dyn AllocationTransaction>, StaffingError>;

    async fn employee_ids(&self) -> Result<Vec<EmployeeId>, StaffingError>;

    async fn find_employee(&self, employee_id: EmployeeId)
        -> Result<Option<Employee>, StaffingError>;

    /// Unlocked lookup, used to find which employee to lock for an edit.
    async fn find_allocation(&self, id: AllocationId)
        -> Result<Option<Allocation>, StaffingError>;

    async fn get_allocations(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<Allocation>, StaffingError>;

    async fn get_history(
        &self,
        allocation_id: AllocationId,
    ) -> Result<Vec<AllocationHistoryEntry>, StaffingError>;
}

/// Staged writes for one employee.
///
/// Dropping the transaction without calling [`commit`](Self::commit)
/// discards everything staged in it.
#[async_trait]
pub trait AllocationTransaction: Send {
    async fn employee(&mut self) -> Result<Option<Employee>, StaffingError>;

    /// All allocations of the locked employee, including staged changes.
    async fn allocations(&mut self) -> Result<Vec<Allocation>, StaffingError>;

    async fn insert_allocation(
        &mut self,
        allocation: &NewAllocation,
    ) -> Result<Allocation, StaffingError>;

    async fn update_allocation(&mut self, allocation: &Allocation) -> Result<(), StaffingError>;

    /// Returns whether a row was removed.
    async fn delete_allocation(&mut self, id: AllocationId) -> Result<bool, StaffingError>;

    async fn record_history(
        &mut self,
        entry: &NewAllocationHistoryEntry,
    ) -> Result<AllocationHistoryId, StaffingError>;

    async fn commit(self: Box<Self>) -> Result<(), StaffingError>;
}
