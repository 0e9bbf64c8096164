use allocation::{AllocationPeriod, ExistingAllocation, Magnitude};
use serde::{Deserialize, Serialize};
use time::Date;

use super::{AllocationId, EmployeeId, ProjectId};

/// A stored allocation of an employee's time to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub id: AllocationId,
    pub employee_id: EmployeeId,
    pub project_id: ProjectId,
    pub period: AllocationPeriod,
    pub allocated_hours: u32,
    /// Always set for allocations written by this service. Older records may
    /// only carry hours.
    pub allocated_percentage: Option<f64>,
}

impl Allocation {
    pub fn start_date(&self) -> Date {
        self.period.start()
    }

    pub fn end_date(&self) -> Option<Date> {
        self.period.end()
    }

    pub fn to_existing(&self) -> ExistingAllocation {
        ExistingAllocation {
            id: self.id.as_i32(),
            period: self.period,
            allocated_percentage: self.allocated_percentage,
            allocated_hours: self.allocated_hours,
        }
    }
}

/// A validated allocation ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAllocation {
    pub employee_id: EmployeeId,
    pub project_id: ProjectId,
    pub period: AllocationPeriod,
    pub magnitude: Magnitude,
}

/// Request to create an allocation.
///
/// Only the field matching the configured allocation mode is read; the other
/// one is derived.
#[derive(Debug, Clone)]
pub struct NewAllocationRequest {
    pub employee_id: EmployeeId,
    pub project_id: ProjectId,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub allocated_hours: Option<u32>,
    pub allocated_percentage: Option<f64>,
}

impl NewAllocationRequest {
    pub fn new(
        employee_id: impl Into<EmployeeId>,
        project_id: impl Into<ProjectId>,
        start_date: Date,
        end_date: Option<Date>,
    ) -> Self {
        Self {
            employee_id: employee_id.into(),
            project_id: project_id.into(),
            start_date,
            end_date,
            allocated_hours: None,
            allocated_percentage: None,
        }
    }

    pub fn with_hours(mut self, hours: u32) -> Self {
        self.allocated_hours = Some(hours);
        self
    }

    pub fn with_percentage(mut self, percentage: f64) -> Self {
        self.allocated_percentage = Some(percentage);
        self
    }
}

/// Request to edit an allocation. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateAllocationRequest {
    pub project_id: Option<ProjectId>,
    pub start_date: Option<Date>,
    /// `Some(None)` clears the end date, making the allocation open-ended.
    pub end_date: Option<Option<Date>>,
    pub allocated_hours: Option<u32>,
    pub allocated_percentage: Option<f64>,
}

impl UpdateAllocationRequest {
    pub fn with_period(mut self, start_date: Date, end_date: Option<Date>) -> Self {
        self.start_date = Some(start_date);
        self.end_date = Some(end_date);
        self
    }

    pub fn with_hours(mut self, hours: u32) -> Self {
        self.allocated_hours = Some(hours);
        self
    }

    pub fn with_percentage(mut self, percentage: f64) -> Self {
        self.allocated_percentage = Some(percentage);
        self
    }
}
