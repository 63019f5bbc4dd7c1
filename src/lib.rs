//! # Sales KPI Report
//!
//! A library for turning a raw sales export (spreadsheet or delimited text)
//! into business KPIs, chart data and a narrative report.
//!
//! ## Pipeline
//!
//! - **Column resolution**: arbitrary headers ("Doanh thu", "SKU", "order_date") are mapped
//!   onto the canonical `date`, `product_id`, `revenue` and `profit` fields
//! - **Type coercion**: amount text like `"1,234.50"` becomes a number (unreadable amounts default
//!   to zero), dates are parsed permissively and rows without a valid date are dropped
//! - **Aggregation**: totals, observed monthly buckets and the top products by revenue
//! - **Metric derivation**: gross margin, average monthly revenue and month-over-month growth
//! - **Narration**: rule-based report lines driven by fixed business thresholds
//!
//! Every stage is a pure function of its input, so concurrent uploads can be processed on
//! separate threads without coordination.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sales_kpi_report::*;
//!
//! let csv = "date,product_id,revenue,profit\n\
//!            2024-01-05,P1,\"1,000\",200\n\
//!            2024-02-10,P2,\"2,000\",300\n";
//!
//! let report = process_sales_csv(csv.as_bytes()).unwrap();
//! assert_eq!(report.kpis.total_revenue, 3000.0);
//! for line in &report.narrative {
//!     println!("{}", line);
//! }
//! ```

pub mod aggregator;
pub mod aliases;
pub mod charts;
pub mod coercion;
pub mod config;
pub mod error;
pub mod export;
pub mod ingestion;
pub mod metrics;
pub mod narrator;
pub mod schema;
pub mod utils;

pub use aggregator::{Aggregates, Aggregator};
pub use aliases::{resolve_columns, ColumnAliases, ColumnMapping, ResolvedColumn};
pub use charts::{ChartArtifact, ChartData, ChartKind, ChartPoint};
pub use coercion::{CoercedTable, CoercionStats, TypeCoercer};
pub use config::{DateOrder, MarginThresholds, ReportConfig};
pub use error::{Result, SalesReportError};
pub use export::ReportDocument;
pub use ingestion::{decode_csv_bytes, read_csv, read_csv_file, CsvOptions};
pub use metrics::derive_kpis;
pub use narrator::ReportNarrator;
pub use schema::*;

use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Complete result of one upload. Created once per upload and never mutated
/// by the pipeline afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SalesReport {
    /// Which upload columns fed the canonical fields
    pub mapping: ColumnMapping,
    pub kpis: KpiSet,
    /// Observed months in chronological order
    pub monthly: Vec<MonthlyBucket>,
    /// Report lines in display order; empty strings separate sections
    pub narrative: Vec<String>,
    pub charts: ChartData,
    pub stats: CoercionStats,
}

impl SalesReport {
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SalesReport)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::json_schema())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Default)]
pub struct SalesReportProcessor {
    config: ReportConfig,
}

impl SalesReportProcessor {
    pub fn new(config: ReportConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Runs the whole pipeline over an already decoded table.
    ///
    /// Fails only when the canonical columns cannot be resolved; a table whose
    /// rows all lack a valid date yields a report with default KPIs.
    pub fn process(&self, table: &RawTable) -> Result<SalesReport> {
        info!(
            "Processing sales table with {} columns and {} rows",
            table.headers().len(),
            table.len()
        );

        let mapping = resolve_columns(table.headers(), &self.config.aliases)?;

        let coerced = TypeCoercer::from_config(&self.config).coerce(table, &mapping);
        if coerced.rows.is_empty() {
            debug!("No rows left after date filtering; KPIs fall back to defaults");
        }

        let aggregates = Aggregator::new(self.config.top_products_limit).aggregate(&coerced.rows);
        let kpis = derive_kpis(&aggregates);
        let narrative = ReportNarrator::from_config(&self.config).narrate(&kpis);
        let charts = ChartData::build(&aggregates.monthly, &kpis);

        info!(
            "Report ready: {} rows kept, {} months, revenue {:.2}, margin {:.4}",
            coerced.stats.kept_rows,
            aggregates.monthly.len(),
            kpis.total_revenue,
            kpis.gross_margin
        );

        Ok(SalesReport {
            mapping,
            kpis,
            monthly: aggregates.monthly,
            narrative,
            charts,
            stats: coerced.stats,
        })
    }

    pub fn process_csv<R: Read>(&self, reader: R, options: &CsvOptions) -> Result<SalesReport> {
        let table = read_csv(reader, options)?;
        self.process(&table)
    }

    /// Builds the export bundle for a processed report.
    pub fn document(
        &self,
        report: &SalesReport,
        generated_at: chrono::NaiveDateTime,
        run_id: &str,
    ) -> ReportDocument {
        ReportDocument::from_report(report, generated_at, run_id, &self.config.currency_label)
    }
}

pub fn process_sales_table(table: &RawTable) -> Result<SalesReport> {
    SalesReportProcessor::default().process(table)
}

pub fn process_sales_csv<R: Read>(reader: R) -> Result<SalesReport> {
    SalesReportProcessor::default().process_csv(reader, &CsvOptions::default())
}
