//! Allocation reconciliation engine.
//!
//! Pure functions for converting an allocation between hours and a
//! percentage of monthly capacity, testing allocation periods for overlap,
//! and enforcing the 100% ceiling over overlapping allocations.

mod business_days;
mod capacity;
mod conversion;
mod error;
mod mode;
mod period;

pub use business_days::*;
pub use capacity::*;
pub use conversion::*;
pub use error::*;
pub use mode::*;
pub use period::*;
