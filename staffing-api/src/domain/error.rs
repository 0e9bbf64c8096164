use allocation::AllocationError;
use thiserror::Error;

use super::models::{AllocationId, EmployeeId};

/// Errors that can occur while writing or reading allocations.
#[derive(Debug, Error)]
pub enum StaffingError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error("employee not found: {0}")]
    EmployeeNotFound(EmployeeId),
    #[error("allocation not found: {0}")]
    AllocationNotFound(AllocationId),
    #[error("allocation percentage must be between 0 and 100, got {0}")]
    PercentageOutOfRange(f64),
    #[error("allocated hours must be positive")]
    ZeroHours,
    #[error("storage error: {0}")]
    Storage(String),
}

impl StaffingError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether the error is a rejected capacity check.
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(
            self,
            Self::Allocation(AllocationError::CapacityExceeded { .. })
        )
    }
}
