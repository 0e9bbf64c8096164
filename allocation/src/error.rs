use thiserror::Error;
use time::Date;

use crate::AllocationMode;

/// Errors raised by the allocation engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationError {
    #[error("end date {end} is before start date {start}")]
    InvalidRange { start: Date, end: Date },
    #[error("monthly capacity must be positive, got {0}")]
    InvalidCapacity(i32),
    #[error("invalid allocation percentage: {0}")]
    InvalidPercentage(f64),
    #[error(
        "employee {employee_id} is already allocated {current_total}% in this period, \
         adding {requested}% would exceed 100%"
    )]
    CapacityExceeded {
        employee_id: i32,
        current_total: f64,
        requested: f64,
    },
    #[error("allocation mode is {0} but no {0} value was supplied")]
    MissingMagnitude(AllocationMode),
}
