use time::{Date, Weekday};

const DAYS_PER_WEEK: i32 = 7;
const BUSINESS_DAYS_PER_WEEK: u32 = 5;

/// Counts the Monday–Friday days in the inclusive range `[start, end]`.
///
/// Returns 0 when `end` is before `start`. Holidays are not considered.
pub fn business_days(start: Date, end: Date) -> u32 {
    if end < start {
        return 0;
    }

    let total_days = end.to_julian_day() - start.to_julian_day() + 1;
    let full_weeks = total_days / DAYS_PER_WEEK;
    let remainder = total_days % DAYS_PER_WEEK;

    // Whole weeks always hold five business days, so only the tail needs
    // walking. It starts on the same weekday as `start`.
    let mut count = full_weeks as u32 * BUSINESS_DAYS_PER_WEEK;
    let mut weekday = start.weekday();
    for _ in 0..remainder {
        if is_business_day(weekday) {
            count += 1;
        }
        weekday = weekday.next();
    }

    count
}

pub fn is_business_day(weekday: Weekday) -> bool {
    !matches!(weekday, Weekday::Saturday | Weekday::Sunday)
}
