//! Calendar arithmetic for the booking backend.
//!
//! Point expirations use "same day next month" semantics: adding months keeps
//! the day-of-month and clamps to the last day when the target month is
//! shorter (Jan 31 + 1 month is Feb 28/29, Jan 31 + 6 months is Jul 31).
//! Naive day-count addition does not reproduce this, so the logic lives here.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};

/// Check if a year is a leap year.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Get the number of days in a month (1-12).
pub fn days_in_month(month: u32, year: i32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Add whole months to a timestamp, clamping the day-of-month to the target
/// month's length. The time of day is preserved.
pub fn add_months_clamped(at: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let total_months = at.year() * 12 + at.month0() as i32 + months as i32;
    let year = total_months.div_euclid(12);
    let month = total_months.rem_euclid(12) as u32 + 1;
    let day = at.day().min(days_in_month(month, year));

    // Utc has no DST gaps, so the composed timestamp always exists.
    Utc.with_ymd_and_hms(year, month, day, at.hour(), at.minute(), at.second())
        .unwrap()
}

/// End of a booking starting at `start` and lasting `minutes`. Minute
/// granularity, no rounding.
pub fn span_end(start: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    start + Duration::minutes(minutes)
}
