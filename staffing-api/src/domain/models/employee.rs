use serde::{Deserialize, Serialize};

use super::EmployeeId;

pub const DEFAULT_MONTHLY_CAPACITY_HOURS: i32 = 160;

/// An employee as seen by the allocation write path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    /// Hours per month that count as 100% allocation.
    pub monthly_capacity_hours: i32,
}

impl Employee {
    pub fn new(id: impl Into<EmployeeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            monthly_capacity_hours: DEFAULT_MONTHLY_CAPACITY_HOURS,
        }
    }

    pub fn with_capacity(mut self, monthly_capacity_hours: i32) -> Self {
        self.monthly_capacity_hours = monthly_capacity_hours;
        self
    }
}
