use crate::charts::ChartKind;
use crate::error::{Result, SalesReportError};
use crate::schema::{KpiSet, MonthlyBucket};
use crate::utils::{format_amount, format_percent};
use crate::SalesReport;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiLine {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartReference {
    pub kind: ChartKind,
    pub title: String,
    pub file_name: String,
}

/// Content of the exported business report, independent of page layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDocument {
    pub title: String,
    pub generated_at: NaiveDateTime,
    pub kpis: KpiSet,
    /// KPIs formatted for display, percentages scaled by 100.
    pub kpi_lines: Vec<KpiLine>,
    pub monthly: Vec<MonthlyBucket>,
    pub charts: Vec<ChartReference>,
    pub narrative: Vec<String>,
    pub currency: String,
}

impl ReportDocument {
    /// `run_id` names the chart files of this run; it must be unique per upload.
    pub fn from_report(
        report: &SalesReport,
        generated_at: NaiveDateTime,
        run_id: &str,
        currency: &str,
    ) -> Self {
        let kpis = &report.kpis;
        let amount = |v: f64| format!("{} {}", format_amount(v), currency);

        let kpi_lines = vec![
            KpiLine {
                label: "Total revenue".to_string(),
                value: amount(kpis.total_revenue),
            },
            KpiLine {
                label: "Total profit".to_string(),
                value: amount(kpis.total_profit),
            },
            KpiLine {
                label: "Gross margin".to_string(),
                value: format_percent(kpis.gross_margin),
            },
            KpiLine {
                label: "Average monthly revenue".to_string(),
                value: amount(kpis.average_monthly_revenue),
            },
            KpiLine {
                label: "MoM growth".to_string(),
                value: kpis
                    .mom_growth
                    .map(format_percent)
                    .unwrap_or_else(|| "Not enough data".to_string()),
            },
        ];

        let charts = report
            .charts
            .artifacts()
            .map(|artifact| ChartReference {
                kind: artifact.kind,
                title: artifact.title.clone(),
                file_name: artifact.file_name(run_id),
            })
            .collect();

        Self {
            title: "AUTOMATED BUSINESS REPORT".to_string(),
            generated_at,
            kpis: kpis.clone(),
            kpi_lines,
            monthly: report.monthly.clone(),
            charts,
            narrative: report.narrative.clone(),
            currency: currency.to_string(),
        }
    }

    pub fn generated_at_display(&self) -> String {
        self.generated_at.format("%d/%m/%Y %H:%M").to_string()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Flat CSV with a `section` column: `kpi`, `monthly` and `top_products`
    /// rows, raw numbers unformatted.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["section", "key", "value", "profit"])?;

        let kpis = &self.kpis;
        let kpi_rows = [
            ("total_revenue", Some(kpis.total_revenue)),
            ("total_profit", Some(kpis.total_profit)),
            ("gross_margin", Some(kpis.gross_margin)),
            ("average_monthly_revenue", Some(kpis.average_monthly_revenue)),
            ("mom_growth", kpis.mom_growth),
        ];
        for (key, value) in kpi_rows {
            let value = value.map(|v| v.to_string()).unwrap_or_default();
            writer.write_record(["kpi", key, value.as_str(), ""])?;
        }

        for bucket in &self.monthly {
            writer.write_record([
                "monthly".to_string(),
                bucket.period.to_string(),
                bucket.revenue_sum.to_string(),
                bucket.profit_sum.to_string(),
            ])?;
        }

        for product in &self.kpis.top_products {
            writer.write_record([
                "top_products",
                product.product_id.as_str(),
                product.revenue.to_string().as_str(),
                "",
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| SalesReportError::IoError(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| SalesReportError::Encoding(e.to_string()))
    }
}
