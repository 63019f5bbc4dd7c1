//! Cell-level type coercion.
//!
//! Numeric and date cells follow deliberately different policies: an amount
//! that cannot be read becomes zero and the row is kept, while a date that
//! cannot be read removes the row from every downstream aggregate.

use crate::aliases::ColumnMapping;
use crate::config::{DateOrder, ReportConfig};
use crate::schema::{CellValue, NormalizedRow, RawTable};
use chrono::{DateTime, Datelike, Days, NaiveDate};
use log::{debug, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Characters removed from amount text before numeric parsing.
const AMOUNT_NOISE: [char; 4] = [',', ' ', '\u{a0}', '\u{202f}'];

/// Largest serial a spreadsheet can hold (9999-12-31).
const MAX_SPREADSHEET_SERIAL: f64 = 2_958_465.0;

/// chrono's `%b` only parses abbreviations, so every form also has a `%B`
/// spelling for full month names.
const NAMED_MONTH_FORMATS: [&str; 14] = [
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%d %b, %Y",
    "%d %B, %Y",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%d-%b-%y",
    "%b-%d-%Y",
    "%B-%d-%Y",
    "%Y-%b-%d",
];

/// Month-and-year forms such as `Jan 2024`, read as the first of the month.
/// Parsed with a `1 ` prefix because chrono needs a day.
const NAMED_MONTH_YEAR_FORMATS: [&str; 4] = ["%d %b %Y", "%d %B %Y", "%d %b, %Y", "%d %B, %Y"];

/// Named-month text never carries fewer than four year digits; anything
/// earlier means `%d` swallowed part of the year.
const MIN_NAMED_MONTH_YEAR: i32 = 1000;

/// Counters describing what coercion did to the upload. They only observe the
/// policy; no threshold here ever rejects data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CoercionStats {
    pub input_rows: usize,
    pub kept_rows: usize,
    pub dropped_invalid_date: usize,
    pub revenue_defaulted: usize,
    pub profit_defaulted: usize,
    pub unknown_products: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoercedTable {
    pub rows: Vec<NormalizedRow>,
    pub stats: CoercionStats,
}

pub struct TypeCoercer {
    date_order: DateOrder,
    unknown_product_label: String,
}

impl TypeCoercer {
    pub fn new(date_order: DateOrder, unknown_product_label: impl Into<String>) -> Self {
        Self {
            date_order,
            unknown_product_label: unknown_product_label.into(),
        }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(config.date_order, config.unknown_product_label.clone())
    }

    /// Projects the resolved columns out of `table` and coerces each row.
    /// Output keeps the input row order.
    pub fn coerce(&self, table: &RawTable, mapping: &ColumnMapping) -> CoercedTable {
        let mut stats = CoercionStats {
            input_rows: table.len(),
            ..CoercionStats::default()
        };
        let mut rows = Vec::with_capacity(table.len());

        for idx in 0..table.len() {
            let Some(date) = coerce_date(table.cell(idx, mapping.date.index), self.date_order)
            else {
                stats.dropped_invalid_date += 1;
                continue;
            };

            let revenue = coerce_amount(table.cell(idx, mapping.revenue.index)).unwrap_or_else(|| {
                stats.revenue_defaulted += 1;
                0.0
            });

            let profit = coerce_amount(table.cell(idx, mapping.profit.index)).unwrap_or_else(|| {
                stats.profit_defaulted += 1;
                0.0
            });

            let product_id = match coerce_product_id(table.cell(idx, mapping.product_id.index)) {
                Some(id) => id,
                None => {
                    stats.unknown_products += 1;
                    self.unknown_product_label.clone()
                }
            };

            rows.push(NormalizedRow {
                date,
                product_id,
                revenue,
                profit,
            });
        }

        stats.kept_rows = rows.len();

        if stats.dropped_invalid_date > 0 {
            warn!(
                "Dropped {} of {} rows with an unreadable '{}' value",
                stats.dropped_invalid_date, stats.input_rows, mapping.date.header
            );
        }
        if stats.revenue_defaulted > 0 || stats.profit_defaulted > 0 {
            warn!(
                "Defaulted unreadable amounts to zero: {} revenue cells, {} profit cells",
                stats.revenue_defaulted, stats.profit_defaulted
            );
        }
        debug!("Coercion finished: {:?}", stats);

        CoercedTable { rows, stats }
    }
}

/// Reads an amount. `None` means the cell is unusable and the caller applies
/// the zero default.
pub fn coerce_amount(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => parse_amount_str(s),
        CellValue::Number(_) | CellValue::Blank | CellValue::Date(_) => None,
    }
}

/// Parses amount text such as `"1,234.50"` or `" 12 000 "`.
pub fn parse_amount_str(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| !AMOUNT_NOISE.contains(c)).collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn coerce_date(cell: &CellValue, order: DateOrder) -> Option<NaiveDate> {
    match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::Number(n) => serial_to_date(*n),
        CellValue::Text(s) => parse_date_str(s, order),
        CellValue::Blank => None,
    }
}

/// Converts a 1900-system spreadsheet serial to a date, ignoring the time
/// fraction. Serial 60 is the spreadsheet's phantom 1900-02-29 and is rejected.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial >= MAX_SPREADSHEET_SERIAL + 1.0 {
        return None;
    }
    let days = serial.floor() as u64;
    match days {
        60 => None,
        1..=59 => NaiveDate::from_ymd_opt(1899, 12, 31)?.checked_add_days(Days::new(days)),
        _ => NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(days)),
    }
}

/// Permissive calendar-date parser.
///
/// Accepts ISO dates and date-times (RFC 3339 included), `YYYY-MM` and
/// `MM/YYYY` months, compact `YYYYMMDD`, separated day/month/year in either
/// order and English month names (`Jan 2024` is the first of January). A
/// trailing time of day is ignored. A bare year is not a date.
pub fn parse_date_str(raw: &str, order: DateOrder) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    parse_date_only(s, order).or_else(|| {
        let head = strip_time_of_day(s)?;
        parse_date_only(head, order)
    })
}

fn parse_date_only(s: &str, order: DateOrder) -> Option<NaiveDate> {
    parse_numeric_date(s, order).or_else(|| parse_named_month_date(s))
}

/// Returns the date part of `"<date> 10:30"` / `"<date>T10:30:00"`, or `None`
/// when the text carries no time of day.
fn strip_time_of_day(s: &str) -> Option<&str> {
    let colon = s.find(':')?;
    let sep = s[..colon].rfind([' ', 'T'])?;
    let time_starts_with_digit = s[sep + 1..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit());
    if !time_starts_with_digit {
        return None;
    }
    let head = s[..sep].trim();
    (!head.is_empty()).then_some(head)
}

fn parse_numeric_date(s: &str, order: DateOrder) -> Option<NaiveDate> {
    let Some(sep) = s.chars().find(|c| matches!(c, '-' | '/' | '.')) else {
        return parse_compact_date(s);
    };

    let parts: Vec<&str> = s.split(sep).collect();
    if parts
        .iter()
        .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    let num = |p: &str| p.parse::<u32>().ok();

    match parts.as_slice() {
        [year, month] if year.len() == 4 => {
            NaiveDate::from_ymd_opt(num(year)? as i32, num(month)?, 1)
        }
        [month, year] if year.len() == 4 && month.len() <= 2 => {
            NaiveDate::from_ymd_opt(num(year)? as i32, num(month)?, 1)
        }
        [year, month, day] if year.len() == 4 => {
            NaiveDate::from_ymd_opt(num(year)? as i32, num(month)?, num(day)?)
        }
        [first, second, year] if year.len() == 4 || year.len() == 2 => {
            let year = expand_year(year.len(), num(year)?);
            let (first, second) = (num(first)?, num(second)?);
            let month_first = NaiveDate::from_ymd_opt(year, first, second);
            let day_first = NaiveDate::from_ymd_opt(year, second, first);
            match order {
                DateOrder::MonthFirst => month_first.or(day_first),
                DateOrder::DayFirst => day_first.or(month_first),
            }
        }
        _ => None,
    }
}

fn parse_compact_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").ok()
}

/// Two-digit years pivot the way strftime's `%y` does: 69-99 are 19xx,
/// 00-68 are 20xx.
fn expand_year(digits: usize, value: u32) -> i32 {
    match (digits, value) {
        (2, v) if v >= 69 => 1900 + v as i32,
        (2, v) => 2000 + v as i32,
        (_, v) => v as i32,
    }
}

fn parse_named_month_date(s: &str) -> Option<NaiveDate> {
    if !s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let plausible = |d: &NaiveDate| d.year() >= MIN_NAMED_MONTH_YEAR;

    NAMED_MONTH_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok().filter(plausible))
        .or_else(|| {
            let first_of_month = format!("1 {}", s);
            NAMED_MONTH_YEAR_FORMATS.iter().find_map(|fmt| {
                NaiveDate::parse_from_str(&first_of_month, fmt)
                    .ok()
                    .filter(plausible)
            })
        })
}

/// Product identifier text, or `None` when the cell is blank.
pub fn coerce_product_id(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Blank => None,
        CellValue::Text(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        CellValue::Number(n) if !n.is_finite() => None,
        CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
            Some(format!("{}", *n as i64))
        }
        CellValue::Number(n) => Some(n.to_string()),
        CellValue::Date(d) => Some(d.to_string()),
    }
}
