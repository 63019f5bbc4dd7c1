use crate::error::{Result, SalesReportError};
use chrono::{Datelike, NaiveDate};

pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let year_diff = end.year() - start.year();
    let month_diff = end.month() as i32 - start.month() as i32;
    year_diff * 12 + month_diff
}

/// Parses a period string in the format "YYYY-MM" and returns the first day
/// of that month.
pub fn parse_period_string(period: &str) -> Result<NaiveDate> {
    let start_str = format!("{}-01", period.trim());
    NaiveDate::parse_from_str(&start_str, "%Y-%m-%d").map_err(|_| {
        SalesReportError::DateError(format!(
            "Invalid period format: {}. Expected YYYY-MM",
            period
        ))
    })
}

/// Formats an amount rounded to whole units with `,` thousands separators,
/// e.g. `1234567.6` -> `"1,234,568"`.
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Formats a ratio as a percentage with two decimals, e.g. `0.1714` -> `"17.14%"`.
pub fn format_percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}
