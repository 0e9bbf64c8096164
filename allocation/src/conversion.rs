use serde::{Deserialize, Serialize};
use time::Date;

use crate::{business_days, AllocationError, AllocationPeriod};

/// Fixed approximation of working days in a month. Stored history values
/// were computed against this, so it is not derived from the calendar.
pub const WORKING_DAYS_PER_MONTH: u32 = 22;

/// Both representations of an allocation's size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Magnitude {
    pub hours: u32,
    pub percentage: f64,
}

/// The caller-supplied side of a [`Magnitude`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MagnitudeInput {
    Hours(u32),
    Percentage(f64),
}

/// Hours of capacity the employee has in `period`.
pub fn available_hours(monthly_capacity_hours: i32, period: &AllocationPeriod) -> f64 {
    let days = business_days(period.start(), period.calculation_end());
    monthly_capacity_hours as f64 / WORKING_DAYS_PER_MONTH as f64 * days as f64
}

/// Converts a percentage of capacity into whole hours for the given period.
pub fn hours_from_percentage(
    percentage: f64,
    monthly_capacity_hours: i32,
    start: Date,
    end: Option<Date>,
) -> Result<u32, AllocationError> {
    let period = AllocationPeriod::new(start, end)?;
    hours_for_period(percentage, monthly_capacity_hours, &period)
}

/// Converts hours into a percentage of capacity for the given period,
/// rounded to two decimals. A period without business days yields 0.
pub fn percentage_from_hours(
    hours: u32,
    monthly_capacity_hours: i32,
    start: Date,
    end: Option<Date>,
) -> Result<f64, AllocationError> {
    let period = AllocationPeriod::new(start, end)?;
    percentage_for_period(hours, monthly_capacity_hours, &period)
}

pub fn hours_for_period(
    percentage: f64,
    monthly_capacity_hours: i32,
    period: &AllocationPeriod,
) -> Result<u32, AllocationError> {
    validate_capacity(monthly_capacity_hours)?;
    if !percentage.is_finite() || percentage < 0.0 {
        return Err(AllocationError::InvalidPercentage(percentage));
    }

    let available = available_hours(monthly_capacity_hours, period);
    Ok((percentage / 100.0 * available).round() as u32)
}

pub fn percentage_for_period(
    hours: u32,
    monthly_capacity_hours: i32,
    period: &AllocationPeriod,
) -> Result<f64, AllocationError> {
    validate_capacity(monthly_capacity_hours)?;

    let available = available_hours(monthly_capacity_hours, period);
    if available == 0.0 {
        return Ok(0.0);
    }

    Ok(round2(hours as f64 / available * 100.0))
}

/// Fills in the companion field of `input` for `period`.
///
/// Works on any past `(period, value, capacity)` tuple, which is how history
/// entries are produced for records stored before both fields were kept.
pub fn derive_magnitude(
    input: MagnitudeInput,
    monthly_capacity_hours: i32,
    period: &AllocationPeriod,
) -> Result<Magnitude, AllocationError> {
    let magnitude = match input {
        MagnitudeInput::Hours(hours) => Magnitude {
            hours,
            percentage: percentage_for_period(hours, monthly_capacity_hours, period)?,
        },
        MagnitudeInput::Percentage(percentage) => {
            // Hours follow the stored (rounded) percentage so the pair replays.
            let percentage = round2(percentage);
            Magnitude {
                hours: hours_for_period(percentage, monthly_capacity_hours, period)?,
                percentage,
            }
        }
    };

    tracing::debug!(
        ?input,
        hours = magnitude.hours,
        percentage = magnitude.percentage,
        "derived allocation magnitude"
    );

    Ok(magnitude)
}

/// Rounds to two decimals, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn validate_capacity(monthly_capacity_hours: i32) -> Result<(), AllocationError> {
    if monthly_capacity_hours <= 0 {
        return Err(AllocationError::InvalidCapacity(monthly_capacity_hours));
    }
    Ok(())
}
