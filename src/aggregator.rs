use crate::schema::{MonthlyBucket, NormalizedRow, ProductRevenue, YearMonth};
use crate::utils::months_between;
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// Neumaier-compensated running sum, so totals do not drift with the order in
/// which equal rows happen to be stored.
///
/// A sum that would overflow saturates at `±f64::MAX` and stops compensating,
/// so the result is always finite.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    pub(crate) fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if !t.is_finite() {
            self.sum = f64::MAX.copysign(t);
            self.compensation = 0.0;
            return;
        }
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    pub(crate) fn value(&self) -> f64 {
        let total = self.sum + self.compensation;
        if total.is_finite() {
            total
        } else {
            self.sum
        }
    }
}

impl FromIterator<f64> for CompensatedSum {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut sum = CompensatedSum::default();
        for value in iter {
            sum.add(value);
        }
        sum
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregates {
    pub total_revenue: f64,
    pub total_profit: f64,
    /// Observed months only, ascending.
    pub monthly: Vec<MonthlyBucket>,
    /// At most `limit` products, descending by revenue.
    pub top_products: Vec<ProductRevenue>,
}

pub struct Aggregator {
    top_products_limit: usize,
}

impl Aggregator {
    pub fn new(top_products_limit: usize) -> Self {
        Self { top_products_limit }
    }

    pub fn aggregate(&self, rows: &[NormalizedRow]) -> Aggregates {
        let (total_revenue, total_profit) = totals(rows);
        let monthly = monthly_buckets(rows);
        let top_products = top_products(rows, self.top_products_limit);

        debug!(
            "Aggregated {} rows into {} monthly buckets and {} ranked products",
            rows.len(),
            monthly.len(),
            top_products.len()
        );

        Aggregates {
            total_revenue,
            total_profit,
            monthly,
            top_products,
        }
    }
}

/// `(total_revenue, total_profit)` over all rows.
pub fn totals(rows: &[NormalizedRow]) -> (f64, f64) {
    let mut revenue = CompensatedSum::default();
    let mut profit = CompensatedSum::default();
    for row in rows {
        revenue.add(row.revenue);
        profit.add(row.profit);
    }
    (revenue.value(), profit.value())
}

/// Groups rows by calendar month. Months without rows are not synthesized.
pub fn monthly_buckets(rows: &[NormalizedRow]) -> Vec<MonthlyBucket> {
    let mut grid: BTreeMap<YearMonth, (CompensatedSum, CompensatedSum)> = BTreeMap::new();

    for row in rows {
        let slot = grid.entry(YearMonth::from_date(row.date)).or_default();
        slot.0.add(row.revenue);
        slot.1.add(row.profit);
    }

    let buckets: Vec<MonthlyBucket> = grid
        .into_iter()
        .map(|(period, (revenue, profit))| MonthlyBucket {
            period,
            revenue_sum: revenue.value(),
            profit_sum: profit.value(),
        })
        .collect();

    for pair in buckets.windows(2) {
        let gap = months_between(pair[0].period.first_day(), pair[1].period.first_day());
        if gap > 1 {
            debug!(
                "No sales between {} and {} ({} empty months)",
                pair[0].period,
                pair[1].period,
                gap - 1
            );
        }
    }

    buckets
}

/// Sums revenue per product and keeps the `limit` largest.
///
/// Products with equal revenue keep the order in which they first appeared
/// in `rows`.
pub fn top_products(rows: &[NormalizedRow], limit: usize) -> Vec<ProductRevenue> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, CompensatedSum)> = Vec::new();

    for row in rows {
        let slot = *index.entry(row.product_id.as_str()).or_insert_with(|| {
            groups.push((row.product_id.as_str(), CompensatedSum::default()));
            groups.len() - 1
        });
        groups[slot].1.add(row.revenue);
    }

    let mut ranked: Vec<ProductRevenue> = groups
        .into_iter()
        .map(|(product_id, revenue)| ProductRevenue {
            product_id: product_id.to_string(),
            revenue: revenue.value(),
        })
        .collect();

    // `sort_by` is stable, so first-occurrence order survives among ties.
    ranked.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(y: i32, m: u32, d: u32, product: &str, revenue: f64, profit: f64) -> NormalizedRow {
        NormalizedRow {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            product_id: product.to_string(),
            revenue,
            profit,
        }
    }

    #[test]
    fn test_totals() {
        let rows = vec![
            row(2024, 1, 5, "P1", 1000.0, 200.0),
            row(2024, 1, 20, "P1", 500.0, 100.0),
            row(2024, 2, 10, "P2", 2000.0, 300.0),
        ];
        assert_eq!(totals(&rows), (3500.0, 600.0));
        assert_eq!(totals(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_overflowing_sums_saturate_instead_of_turning_nan() {
        let rows = vec![
            row(2024, 1, 1, "A", 1e308, 1e308),
            row(2024, 1, 2, "A", 1e308, 1e308),
        ];
        let (revenue, profit) = totals(&rows);
        assert_eq!(revenue, f64::MAX);
        assert_eq!(profit, f64::MAX);

        let buckets = monthly_buckets(&rows);
        assert!(buckets[0].revenue_sum.is_finite());
        assert_eq!(top_products(&rows, 5)[0].revenue, f64::MAX);

        let negative: CompensatedSum = [-1e308, -1e308, -5.0].into_iter().collect();
        assert_eq!(negative.value(), -f64::MAX);
    }

    #[test]
    fn test_monthly_buckets_are_chronological_without_gap_filling() {
        let rows = vec![
            row(2024, 3, 1, "A", 30.0, 3.0),
            row(2023, 12, 31, "A", 10.0, 1.0),
            row(2024, 3, 31, "B", 5.0, 0.5),
            row(2024, 1, 1, "A", 20.0, 2.0),
        ];
        let buckets = monthly_buckets(&rows);
        let periods: Vec<String> = buckets.iter().map(|b| b.period.to_string()).collect();
        assert_eq!(periods, vec!["2023-12", "2024-01", "2024-03"]);
        assert_eq!(buckets[2].revenue_sum, 35.0);
        assert_eq!(buckets[2].profit_sum, 3.5);
    }

    #[test]
    fn test_top_products_truncates_to_limit() {
        let rows: Vec<NormalizedRow> = (1..=8)
            .map(|i| row(2024, 1, 1, &format!("P{}", i), i as f64 * 100.0, 0.0))
            .collect();
        let top = top_products(&rows, 5);
        let ids: Vec<&str> = top.iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(ids, vec!["P8", "P7", "P6", "P5", "P4"]);
        assert!(top.windows(2).all(|w| w[0].revenue >= w[1].revenue));
    }

    #[test]
    fn test_top_products_ties_keep_first_occurrence_order() {
        let rows = vec![
            row(2024, 1, 1, "late-big", 10.0, 0.0),
            row(2024, 1, 2, "tie-b", 50.0, 0.0),
            row(2024, 1, 3, "tie-a", 30.0, 0.0),
            row(2024, 1, 4, "tie-a", 20.0, 0.0),
            row(2024, 1, 5, "late-big", 90.0, 0.0),
            row(2024, 1, 6, "tie-c", 50.0, 0.0),
        ];
        let top = top_products(&rows, 5);
        let ids: Vec<&str> = top.iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(ids, vec!["late-big", "tie-b", "tie-a", "tie-c"]);
    }

    #[test]
    fn test_sums_survive_cancellation_in_any_order() {
        let values = [1e16, 1.0, -1e16, 3.0, 0.1, 0.2, 0.3];
        let forward: Vec<NormalizedRow> = values
            .iter()
            .map(|v| row(2024, 5, 1, "X", *v, *v))
            .collect();
        let mut backward = forward.clone();
        backward.reverse();

        let a = Aggregator::new(5).aggregate(&forward);
        let b = Aggregator::new(5).aggregate(&backward);
        assert!((a.total_revenue - 4.6).abs() < 1e-9);
        assert!((b.total_revenue - 4.6).abs() < 1e-9);
        assert!((a.monthly[0].profit_sum - b.monthly[0].profit_sum).abs() < 1e-9);
        assert_eq!(a.top_products.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let agg = Aggregator::new(5).aggregate(&[]);
        assert_eq!(agg.total_revenue, 0.0);
        assert!(agg.monthly.is_empty());
        assert!(agg.top_products.is_empty());
    }
}
