//! Time utilities: epoch seconds <-> local timestamps, hour rounding, display formats.

use chrono::{DateTime, Local, NaiveDate, TimeZone};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Seconds since the Unix epoch, with sub-second precision.
pub fn to_epoch_seconds(t: DateTime<Local>) -> f64 {
    t.timestamp_micros() as f64 / 1_000_000.0
}

pub fn from_epoch_seconds(secs: f64) -> Option<DateTime<Local>> {
    let micros = (secs * 1_000_000.0).round() as i64;
    Local.timestamp_micros(micros).single()
}

/// `YYYY-MM-DD HH:MM:SS` in local time; an out-of-range value is shown raw.
pub fn format_epoch(secs: f64) -> String {
    match from_epoch_seconds(secs) {
        Some(t) => t.format(TIMESTAMP_FORMAT).to_string(),
        None => format!("{secs}"),
    }
}

/// Local calendar date of an epoch instant.
pub fn local_date(secs: f64) -> Option<NaiveDate> {
    from_epoch_seconds(secs).map(|t| t.date_naive())
}

/// Round to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Hours between two epoch instants, rounded to two decimals.
pub fn duration_hours(start: f64, end: f64) -> f64 {
    round2((end - start) / 3600.0)
}

/// Render a float so it always carries a fractional part (`1000.0`, `2.5`).
pub fn format_float(value: f64) -> String {
    format!("{value:?}")
}

/// Elapsed seconds as `HHh MMm`.
pub fn readable_elapsed(secs: f64) -> String {
    let total_mins = (secs.max(0.0) / 60.0).floor() as i64;
    format!("{:02}h {:02}m", total_mins / 60, total_mins % 60)
}
