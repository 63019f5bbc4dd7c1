use crate::aggregator::{Aggregates, CompensatedSum};
use crate::schema::{KpiSet, MonthlyBucket};

/// `total_profit / total_revenue`, or `0.0` when revenue is not positive.
pub fn gross_margin(total_revenue: f64, total_profit: f64) -> f64 {
    if total_revenue > 0.0 {
        total_profit / total_revenue
    } else {
        0.0
    }
}

/// Mean of the observed monthly revenue sums, `0.0` without any month.
pub fn average_monthly_revenue(monthly: &[MonthlyBucket]) -> f64 {
    if monthly.is_empty() {
        return 0.0;
    }
    let total: CompensatedSum = monthly.iter().map(|b| b.revenue_sum).collect();
    total.value() / monthly.len() as f64
}

/// Growth of the last observed month over the one observed before it.
///
/// The comparison uses the two chronologically last buckets, which are not
/// necessarily adjacent calendar months. `None` with fewer than two buckets
/// or when the earlier bucket has zero revenue.
pub fn mom_growth(monthly: &[MonthlyBucket]) -> Option<f64> {
    let [.., previous, last] = monthly else {
        return None;
    };
    if previous.revenue_sum == 0.0 {
        return None;
    }
    Some((last.revenue_sum - previous.revenue_sum) / previous.revenue_sum)
}

pub fn derive_kpis(aggregates: &Aggregates) -> KpiSet {
    KpiSet {
        total_revenue: aggregates.total_revenue,
        total_profit: aggregates.total_profit,
        gross_margin: gross_margin(aggregates.total_revenue, aggregates.total_profit),
        average_monthly_revenue: average_monthly_revenue(&aggregates.monthly),
        mom_growth: mom_growth(&aggregates.monthly),
        top_products: aggregates.top_products.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::YearMonth;

    fn bucket(period: &str, revenue: f64) -> MonthlyBucket {
        MonthlyBucket {
            period: period.parse::<YearMonth>().unwrap(),
            revenue_sum: revenue,
            profit_sum: 0.0,
        }
    }

    #[test]
    fn test_margin_never_divides_by_zero() {
        assert_eq!(gross_margin(0.0, 0.0), 0.0);
        assert_eq!(gross_margin(0.0, 125.0), 0.0);
        assert_eq!(gross_margin(-100.0, 50.0), 0.0);
        assert!((gross_margin(3500.0, 600.0) - 0.171428).abs() < 1e-4);
        assert_eq!(gross_margin(1000.0, -250.0), -0.25);
    }

    #[test]
    fn test_average_monthly_revenue() {
        assert_eq!(average_monthly_revenue(&[]), 0.0);
        let monthly = vec![bucket("2024-01", 1500.0), bucket("2024-02", 2000.0)];
        assert_eq!(average_monthly_revenue(&monthly), 1750.0);
    }

    #[test]
    fn test_average_of_huge_buckets_stays_finite() {
        let monthly = vec![bucket("2024-01", f64::MAX), bucket("2024-02", f64::MAX)];
        let average = average_monthly_revenue(&monthly);
        assert!(average.is_finite());
        assert_eq!(average, f64::MAX / 2.0);
    }

    #[test]
    fn test_mom_growth_needs_two_buckets() {
        assert_eq!(mom_growth(&[]), None);
        assert_eq!(mom_growth(&[bucket("2024-01", 100.0)]), None);
    }

    #[test]
    fn test_mom_growth_zero_prior_is_null() {
        let monthly = vec![bucket("2024-01", 0.0), bucket("2024-02", 500.0)];
        assert_eq!(mom_growth(&monthly), None);
    }

    #[test]
    fn test_mom_growth_uses_last_observed_months() {
        // March is missing: February is compared against April.
        let monthly = vec![
            bucket("2024-01", 900.0),
            bucket("2024-02", 1000.0),
            bucket("2024-04", 800.0),
        ];
        let growth = mom_growth(&monthly).unwrap();
        assert!((growth - (-0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_mom_growth_sign() {
        let up = vec![bucket("2024-01", 1500.0), bucket("2024-02", 2000.0)];
        assert!((mom_growth(&up).unwrap() - 1.0 / 3.0).abs() < 1e-12);

        let flat = vec![bucket("2024-01", 10.0), bucket("2024-02", 10.0)];
        assert_eq!(mom_growth(&flat), Some(0.0));
    }
}
