use crate::error::{Result, SalesReportError};
use crate::utils::parse_period_string;
use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four canonical columns every sales export must provide.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum LogicalField {
    #[schemars(description = "Transaction or order date")]
    Date,

    #[schemars(description = "Product identifier (SKU, item code, product name)")]
    ProductId,

    #[schemars(description = "Gross sales amount of the row")]
    Revenue,

    #[schemars(description = "Profit earned on the row")]
    Profit,
}

impl LogicalField {
    /// Canonical order, used for error reporting and column projection.
    pub const ALL: [LogicalField; 4] = [
        LogicalField::Date,
        LogicalField::ProductId,
        LogicalField::Revenue,
        LogicalField::Profit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalField::Date => "date",
            LogicalField::ProductId => "product_id",
            LogicalField::Revenue => "revenue",
            LogicalField::Profit => "profit",
        }
    }
}

impl fmt::Display for LogicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single raw cell as handed over by a table decoder.
///
/// Delimited text only ever produces `Blank` and `Text`; spreadsheet decoders
/// may hand over typed `Number` and `Date` cells directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum CellValue {
    Blank,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl CellValue {
    /// Builds a text cell, mapping empty or whitespace-only input to `Blank`.
    pub fn from_text(raw: &str) -> Self {
        if raw.trim().is_empty() {
            CellValue::Blank
        } else {
            CellValue::Text(raw.to_string())
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::from_text(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::from_text(&value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Blank)
    }
}

static BLANK_CELL: CellValue = CellValue::Blank;

/// Decoded upload: a header row plus positional data rows.
///
/// Rows are kept positional rather than keyed by header so that duplicate
/// headers survive decoding and the first one can win during resolution.
/// No invariants hold across rows; a row may be shorter or longer than the
/// header list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { headers, rows }
    }

    /// Convenience constructor used by decoders and tests that work with text.
    pub fn from_strings<H, R, C>(headers: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<CellValue>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `(row, column)`, or `Blank` when the row is too short.
    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&BLANK_CELL)
    }
}

/// One coerced sales row. `date` is always a valid calendar date; rows whose
/// date could not be parsed never become a `NormalizedRow`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedRow {
    pub date: NaiveDate,
    pub product_id: String,
    pub revenue: f64,
    pub profit: f64,
}

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(SalesReportError::DateError(format!(
                "Invalid month {} for year {}: must be between 1 and 12",
                month, year
            )));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = SalesReportError;

    fn from_str(s: &str) -> Result<Self> {
        let start = parse_period_string(s)?;
        Ok(Self::from_date(start))
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for YearMonth {
    type Error = SalesReportError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Revenue and profit summed over one observed calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MonthlyBucket {
    #[schemars(with = "String", description = "Calendar month in YYYY-MM format")]
    pub period: YearMonth,

    #[schemars(description = "Sum of revenue over all rows dated in this month")]
    pub revenue_sum: f64,

    #[schemars(description = "Sum of profit over all rows dated in this month")]
    pub profit_sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProductRevenue {
    pub product_id: String,
    pub revenue: f64,
}

/// The derived business KPIs of one upload.
///
/// Ratios are plain fractions (0.15 means 15%); scaling for display is left
/// to the consumer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct KpiSet {
    #[schemars(description = "Sum of revenue across all kept rows")]
    pub total_revenue: f64,

    #[schemars(description = "Sum of profit across all kept rows")]
    pub total_profit: f64,

    #[schemars(
        description = "total_profit / total_revenue as a ratio, 0.0 when total revenue is not positive"
    )]
    pub gross_margin: f64,

    #[schemars(description = "Mean of the monthly revenue sums, 0.0 when no month was observed")]
    pub average_monthly_revenue: f64,

    #[schemars(
        description = "Revenue growth of the last observed month over the previous observed month as a ratio. Null with fewer than two months or when the previous month had zero revenue."
    )]
    pub mom_growth: Option<f64>,

    #[schemars(description = "Best-selling products by summed revenue, descending")]
    pub top_products: Vec<ProductRevenue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_month_ordering_and_display() {
        let dec = YearMonth::new(2023, 12).unwrap();
        let jan = YearMonth::new(2024, 1).unwrap();
        assert!(dec < jan);
        assert_eq!(jan.to_string(), "2024-01");
        assert_eq!("2023-12".parse::<YearMonth>().unwrap(), dec);
        assert_eq!(jan.first_day(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(YearMonth::new(2024, 13).is_err());
    }

    #[test]
    fn test_year_month_serializes_as_string() {
        let bucket = MonthlyBucket {
            period: YearMonth::new(2024, 2).unwrap(),
            revenue_sum: 2000.0,
            profit_sum: 300.0,
        };
        let json = serde_json::to_string(&bucket).unwrap();
        assert!(json.contains("\"period\":\"2024-02\""));

        let back: MonthlyBucket = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bucket);
    }

    #[test]
    fn test_raw_table_short_rows_read_as_blank() {
        let table = RawTable::from_strings(["date", "revenue"], vec![vec!["2024-01-01"]]);
        assert_eq!(table.cell(0, 0), &CellValue::Text("2024-01-01".to_string()));
        assert_eq!(table.cell(0, 1), &CellValue::Blank);
        assert_eq!(table.cell(5, 0), &CellValue::Blank);
    }

    #[test]
    fn test_cell_from_text_blanks_whitespace() {
        assert_eq!(CellValue::from_text("   "), CellValue::Blank);
        assert_eq!(CellValue::from_text(" 12 "), CellValue::Text(" 12 ".to_string()));
        assert_eq!(CellValue::from(Option::<f64>::None), CellValue::Blank);
    }
}
