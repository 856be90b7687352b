//! Parse `--period` filters into an inclusive date interval.

use crate::errors::{AppError, AppResult};
use chrono::{Datelike, Duration, NaiveDate};

/// Parse a period expression.
///
/// Supported forms:
/// - `week` (current ISO week, Monday to Sunday)
/// - `YYYY`
/// - `YYYY-MM`
/// - `YYYY-MM-DD`
/// - `A:B` where both sides use the same form among the three above
pub fn parse_period(p: &str, today: NaiveDate) -> AppResult<(NaiveDate, NaiveDate)> {
    let p = p.trim();

    if p.eq_ignore_ascii_case("week") {
        let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
        return Ok((monday, monday + Duration::days(6)));
    }

    if let Some((start_raw, end_raw)) = p.split_once(':') {
        let (start, end) = (start_raw.trim(), end_raw.trim());
        if start.len() != end.len() {
            return Err(AppError::InvalidDate(format!(
                "start and end must have the same format: {p}"
            )));
        }
        let (d1, _) = bounds(start)?;
        let (_, d2) = bounds(end)?;
        return Ok((d1, d2));
    }

    bounds(p)
}

fn bounds(token: &str) -> AppResult<(NaiveDate, NaiveDate)> {
    let invalid = || AppError::InvalidDate(token.to_string());

    match token.len() {
        // YYYY
        4 => {
            let y: i32 = token.parse().map_err(|_| invalid())?;
            let d1 = NaiveDate::from_ymd_opt(y, 1, 1).ok_or_else(invalid)?;
            let d2 = NaiveDate::from_ymd_opt(y, 12, 31).ok_or_else(invalid)?;
            Ok((d1, d2))
        }
        // YYYY-MM
        7 => {
            let d1 = NaiveDate::parse_from_str(&format!("{token}-01"), "%Y-%m-%d")
                .map_err(|_| invalid())?;
            let next_month = if d1.month() == 12 {
                NaiveDate::from_ymd_opt(d1.year() + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(d1.year(), d1.month() + 1, 1)
            }
            .ok_or_else(invalid)?;
            Ok((d1, next_month - Duration::days(1)))
        }
        // YYYY-MM-DD
        10 => {
            let d = NaiveDate::parse_from_str(token, "%Y-%m-%d").map_err(|_| invalid())?;
            Ok((d, d))
        }
        _ => Err(invalid()),
    }
}
