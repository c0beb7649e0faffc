// src/utils/calendar.rs
use chrono::{Datelike, Local, NaiveDateTime, TimeZone, Timelike};

/// Timestamp format used for workbook rows and recency arithmetic.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Interprets a millisecond epoch value as a local-time timestamp.
/// Returns `None` for values chrono cannot map (out of range, or falling
/// into a DST gap with no unambiguous local reading).
pub fn from_epoch_millis(millis: i64) -> Option<NaiveDateTime> {
    match Local.timestamp_millis_opt(millis) {
        chrono::LocalResult::Single(dt) => Some(dt.naive_local()),
        chrono::LocalResult::Ambiguous(dt, _) => Some(dt.naive_local()),
        chrono::LocalResult::None => None,
    }
}

pub fn format_date(date: &NaiveDateTime) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Whole months elapsed between two timestamps, order-insensitive.
///
/// Day- and time-of-month aware: a gap must cover the full month for it to
/// count, so Jan 31 -> Feb 28 is 0 months while Jan 15 -> Feb 15 is 1.
pub fn months_between(a: NaiveDateTime, b: NaiveDateTime) -> u32 {
    let (early, late) = if a <= b { (a, b) } else { (b, a) };

    let mut months = (late.year() - early.year()) * 12 + late.month() as i32
        - early.month() as i32;

    if months > 0
        && (late.day() < early.day()
            || (late.day() == early.day()
                && late.num_seconds_from_midnight()
                    < early.num_seconds_from_midnight()))
    {
        months -= 1;
    }

    months.max(0) as u32
}
