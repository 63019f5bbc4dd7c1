//! Rule-based report narration.
//!
//! Each narrative section is an ordered rule table. Rules are evaluated top to
//! bottom and the first one whose predicate holds renders the section, so the
//! business thresholds can be read (and tested) straight off the tables below.

use crate::config::{MarginThresholds, ReportConfig};
use crate::schema::KpiSet;
use crate::utils::{format_amount, format_percent};

pub struct NarrativeContext<'a> {
    pub kpis: &'a KpiSet,
    pub thresholds: &'a MarginThresholds,
    pub top_count: usize,
    pub currency: &'a str,
}

pub type Predicate = fn(&NarrativeContext<'_>) -> bool;
pub type Template = fn(&NarrativeContext<'_>) -> Vec<String>;

pub struct NarrativeRule {
    pub name: &'static str,
    pub applies: Predicate,
    pub render: Template,
}

/// Conclusion section. The margin branches only apply to positive revenue;
/// everything else falls through to the inconclusive line.
pub const MARGIN_RULES: &[NarrativeRule] = &[
    NarrativeRule {
        name: "healthy_margin",
        applies: |ctx| ctx.kpis.total_revenue > 0.0 && ctx.kpis.gross_margin >= ctx.thresholds.healthy,
        render: |_| vec!["- Gross margin is healthy, with room for further growth.".to_string()],
    },
    NarrativeRule {
        name: "thin_margin",
        applies: |ctx| ctx.kpis.total_revenue > 0.0 && ctx.kpis.gross_margin < ctx.thresholds.thin,
        render: |_| {
            vec!["- Gross margin is thin; consider optimizing costs or adjusting selling prices.".to_string()]
        },
    },
    NarrativeRule {
        name: "inconclusive_margin",
        applies: |_| true,
        render: |_| vec!["- Not enough data to draw a conclusion on overall performance.".to_string()],
    },
];

pub const GROWTH_RULES: &[NarrativeRule] = &[
    NarrativeRule {
        name: "growth_unavailable",
        applies: |ctx| ctx.kpis.mom_growth.is_none(),
        render: |_| vec!["- Not enough data to compute growth for the latest month.".to_string()],
    },
    NarrativeRule {
        name: "growth_up",
        applies: |ctx| ctx.kpis.mom_growth.is_some_and(|g| g > 0.0),
        render: |ctx| {
            let growth = ctx.kpis.mom_growth.unwrap_or_default();
            vec![format!(
                "- Revenue in the latest month rose {} compared with the previous month.",
                format_percent(growth)
            )]
        },
    },
    NarrativeRule {
        name: "growth_down",
        applies: |ctx| ctx.kpis.mom_growth.is_some_and(|g| g < 0.0),
        render: |ctx| {
            let growth = ctx.kpis.mom_growth.unwrap_or_default();
            vec![format!(
                "- Revenue in the latest month fell {} compared with the previous month.",
                format_percent(growth.abs())
            )]
        },
    },
    NarrativeRule {
        name: "growth_flat",
        applies: |_| true,
        render: |_| vec!["- Revenue is unchanged from the previous month.".to_string()],
    },
];

pub const PRODUCT_RULES: &[NarrativeRule] = &[
    NarrativeRule {
        name: "products_unavailable",
        applies: |ctx| ctx.kpis.top_products.is_empty() || ctx.top_count == 0,
        render: |_| vec!["- Not enough product data to build a ranking.".to_string()],
    },
    NarrativeRule {
        name: "products_ranked",
        applies: |_| true,
        render: |ctx| {
            ctx.kpis
                .top_products
                .iter()
                .take(ctx.top_count)
                .enumerate()
                .map(|(i, p)| {
                    format!(
                        "- Top {}: {} - revenue {} {}",
                        i + 1,
                        p.product_id,
                        format_amount(p.revenue),
                        ctx.currency
                    )
                })
                .collect()
        },
    },
];

/// First rule of `rules` that applies to `ctx`.
pub fn select_rule<'r>(rules: &'r [NarrativeRule], ctx: &NarrativeContext<'_>) -> Option<&'r NarrativeRule> {
    rules.iter().find(|rule| (rule.applies)(ctx))
}

fn render_section(rules: &[NarrativeRule], ctx: &NarrativeContext<'_>) -> Vec<String> {
    select_rule(rules, ctx)
        .map(|rule| (rule.render)(ctx))
        .unwrap_or_default()
}

fn heading(lines: &mut Vec<String>, title: &str) {
    lines.push(String::new());
    lines.push(title.to_string());
    lines.push("-".repeat(title.chars().count()));
}

pub struct ReportNarrator {
    thresholds: MarginThresholds,
    top_count: usize,
    currency: String,
}

impl ReportNarrator {
    pub fn new(thresholds: MarginThresholds, top_count: usize, currency: impl Into<String>) -> Self {
        Self {
            thresholds,
            top_count,
            currency: currency.into(),
        }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(
            config.thresholds.clone(),
            config.narrative_top_products,
            config.currency_label.clone(),
        )
    }

    pub fn context<'a>(&'a self, kpis: &'a KpiSet) -> NarrativeContext<'a> {
        NarrativeContext {
            kpis,
            thresholds: &self.thresholds,
            top_count: self.top_count,
            currency: &self.currency,
        }
    }

    /// Renders the full report as ordered lines. Blank strings separate
    /// sections. Output depends only on `kpis` and the narrator settings.
    pub fn narrate(&self, kpis: &KpiSet) -> Vec<String> {
        let ctx = self.context(kpis);
        let mut lines = vec![
            "--- AUTOMATED BUSINESS REPORT ---".to_string(),
            String::new(),
            "Dear Management,".to_string(),
            String::new(),
            "This report was compiled automatically from the raw data provided by the sales department."
                .to_string(),
        ];

        heading(&mut lines, "1) OVERVIEW");
        lines.push(format!(
            "- Total revenue: {} {}",
            format_amount(kpis.total_revenue),
            self.currency
        ));
        lines.push(format!(
            "- Total profit: {} {}",
            format_amount(kpis.total_profit),
            self.currency
        ));
        lines.push(format!(
            "- Gross margin (estimated): {}",
            format_percent(kpis.gross_margin)
        ));
        lines.push(format!(
            "- Average monthly revenue: {} {}",
            format_amount(kpis.average_monthly_revenue),
            self.currency
        ));

        heading(&mut lines, "2) REVENUE TREND");
        lines.extend(render_section(GROWTH_RULES, &ctx));

        heading(&mut lines, "3) KEY PRODUCTS");
        lines.extend(render_section(PRODUCT_RULES, &ctx));

        heading(&mut lines, "4) CONCLUSION & RECOMMENDATIONS");
        lines.extend(render_section(MARGIN_RULES, &ctx));
        lines.push(
            "- Recommendation: concentrate on the top products, invest in the channels that drive growth and keep tracking the month-over-month trend for the next 2-3 months."
                .to_string(),
        );

        lines.push(String::new());
        lines.push("Regards.".to_string());
        lines
    }

    pub fn narrate_text(&self, kpis: &KpiSet) -> String {
        self.narrate(kpis).join("\n")
    }
}
