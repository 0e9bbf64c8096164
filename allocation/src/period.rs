use serde::{Deserialize, Serialize};
use time::{Date, Duration};

use crate::AllocationError;

/// Calendar days added to the start of an open-ended period when it is used
/// for hours/percentage conversion.
pub const OPEN_ENDED_CALCULATION_DAYS: i64 = 7;

/// An inclusive date range. A missing end means the allocation is ongoing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPeriod {
    start: Date,
    end: Option<Date>,
}

impl AllocationPeriod {
    pub fn new(start: Date, end: Option<Date>) -> Result<Self, AllocationError> {
        match end {
            Some(end) if end < start => Err(AllocationError::InvalidRange { start, end }),
            _ => Ok(Self { start, end }),
        }
    }

    pub fn open(start: Date) -> Self {
        Self { start, end: None }
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn end(&self) -> Option<Date> {
        self.end
    }

    pub fn is_open_ended(&self) -> bool {
        self.end.is_none()
    }

    /// End date used for conversions. Open-ended periods are treated as
    /// running for one week from their start; the period itself is unchanged.
    pub fn calculation_end(&self) -> Date {
        self.end.unwrap_or_else(|| {
            self.start
                .checked_add(Duration::days(OPEN_ENDED_CALCULATION_DAYS))
                .unwrap_or(self.start)
        })
    }

    pub fn overlaps(&self, other: &AllocationPeriod) -> bool {
        dates_overlap(self.start, self.end, other.start, other.end)
    }
}

/// Whether two inclusive date ranges share at least one day.
///
/// A `None` end is unbounded. Ranges that touch on a single day overlap.
pub fn dates_overlap(
    start1: Date,
    end1: Option<Date>,
    start2: Date,
    end2: Option<Date>,
) -> bool {
    let starts_before_other_ends = end2.map_or(true, |end2| start1 <= end2);
    let other_starts_before_end = end1.map_or(true, |end1| start2 <= end1);

    starts_before_other_ends && other_starts_before_end
}
