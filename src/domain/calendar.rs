//! Trade-date arithmetic: weekend adjustment, lookback dates, monthly schedule.
//!
//! Weekend adjustment is applied when a boundary date is computed, so the
//! adjusted date is the one searched for in the price history.

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};

/// Saturday moves back to Friday, Sunday forward to Monday. Weekdays are unchanged.
pub fn resolve_nearest_weekday(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

/// `trade_date` minus `months` calendar months, then weekend-adjusted.
///
/// The day is clamped to the end of a shorter target month (May 31 minus
/// three months is Feb 29/28). `None` only when the result leaves chrono's range.
pub fn lookback_date(trade_date: NaiveDate, months: u32) -> Option<NaiveDate> {
    trade_date
        .checked_sub_months(Months::new(months))
        .map(resolve_nearest_weekday)
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).map(|d| d - Duration::days(1))
}

/// Trade day for a month: `day_of_month`, or the month's last day when the
/// month is shorter, then weekend-adjusted.
pub fn trade_day(year: i32, month: u32, day_of_month: u32) -> Option<NaiveDate> {
    let day = match NaiveDate::from_ymd_opt(year, month, day_of_month) {
        Some(d) => d,
        None => last_day_of_month(year, month)?,
    };
    Some(resolve_nearest_weekday(day))
}

/// One trade day per calendar month covering `start..=end`.
///
/// Months whose adjusted trade day falls outside the range are skipped.
pub fn trade_schedule(start: NaiveDate, end: NaiveDate, day_of_month: u32) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    if start > end {
        return dates;
    }

    let (mut year, mut month) = (start.year(), start.month());
    while (year, month) <= (end.year(), end.month()) {
        if let Some(day) = trade_day(year, month, day_of_month) {
            if day >= start && day <= end {
                dates.push(day);
            }
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    dates
}
