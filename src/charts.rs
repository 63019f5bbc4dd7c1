use crate::schema::{KpiSet, MonthlyBucket};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    #[schemars(description = "Line chart of revenue per observed month")]
    RevenueTrend,

    #[schemars(description = "Horizontal bar chart of the best-selling products")]
    TopProducts,
}

impl ChartKind {
    pub fn slug(&self) -> &'static str {
        match self {
            ChartKind::RevenueTrend => "revenue_trend",
            ChartKind::TopProducts => "top_products",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// Everything a renderer needs to draw one chart. Rasterization and storage
/// happen outside this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChartArtifact {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Points in drawing order.
    pub points: Vec<ChartPoint>,
}

impl ChartArtifact {
    /// Output file name scoped to one pipeline run, so renderers serving
    /// concurrent uploads never overwrite each other.
    pub fn file_name(&self, run_id: &str) -> String {
        format!("{}_{}.png", self.kind.slug(), run_id)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ChartData {
    pub revenue_trend: Option<ChartArtifact>,
    pub top_products: Option<ChartArtifact>,
}

impl ChartData {
    pub fn build(monthly: &[MonthlyBucket], kpis: &KpiSet) -> Self {
        Self {
            revenue_trend: revenue_trend(monthly),
            top_products: top_products(kpis),
        }
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &ChartArtifact> {
        self.revenue_trend.iter().chain(self.top_products.iter())
    }
}

/// Monthly revenue in chronological order, `None` without any month.
pub fn revenue_trend(monthly: &[MonthlyBucket]) -> Option<ChartArtifact> {
    if monthly.is_empty() {
        return None;
    }
    Some(ChartArtifact {
        kind: ChartKind::RevenueTrend,
        title: "Monthly revenue trend".to_string(),
        x_label: "Month".to_string(),
        y_label: "Revenue".to_string(),
        points: monthly
            .iter()
            .map(|b| ChartPoint {
                label: b.period.to_string(),
                value: b.revenue_sum,
            })
            .collect(),
    })
}

/// Ranked products drawn bottom-up: the smallest bar comes first so the best
/// seller ends up on top of a horizontal bar chart.
pub fn top_products(kpis: &KpiSet) -> Option<ChartArtifact> {
    if kpis.top_products.is_empty() {
        return None;
    }
    Some(ChartArtifact {
        kind: ChartKind::TopProducts,
        title: "Top products by revenue".to_string(),
        x_label: "Revenue".to_string(),
        y_label: "Product".to_string(),
        points: kpis
            .top_products
            .iter()
            .rev()
            .map(|p| ChartPoint {
                label: p.product_id.clone(),
                value: p.revenue,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ProductRevenue, YearMonth};

    #[test]
    fn test_empty_inputs_produce_no_artifacts() {
        let charts = ChartData::build(&[], &KpiSet::default());
        assert!(charts.revenue_trend.is_none());
        assert!(charts.top_products.is_none());
        assert_eq!(charts.artifacts().count(), 0);
    }

    #[test]
    fn test_chart_points() {
        let monthly = vec![
            MonthlyBucket {
                period: YearMonth::new(2024, 1).unwrap(),
                revenue_sum: 1500.0,
                profit_sum: 300.0,
            },
            MonthlyBucket {
                period: YearMonth::new(2024, 2).unwrap(),
                revenue_sum: 2000.0,
                profit_sum: 300.0,
            },
        ];
        let kpis = KpiSet {
            top_products: vec![
                ProductRevenue {
                    product_id: "P2".to_string(),
                    revenue: 2000.0,
                },
                ProductRevenue {
                    product_id: "P1".to_string(),
                    revenue: 1500.0,
                },
            ],
            ..KpiSet::default()
        };

        let charts = ChartData::build(&monthly, &kpis);
        let trend = charts.revenue_trend.as_ref().unwrap();
        assert_eq!(trend.points[0].label, "2024-01");
        assert_eq!(trend.points[1].value, 2000.0);

        let bars = charts.top_products.as_ref().unwrap();
        let labels: Vec<&str> = bars.points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["P1", "P2"]);
        assert_eq!(bars.file_name("20240301_101500"), "top_products_20240301_101500.png");
    }
}
