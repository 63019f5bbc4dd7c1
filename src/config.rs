use crate::aliases::ColumnAliases;
use crate::error::{Result, SalesReportError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Preferred reading of ambiguous numeric dates such as `03/04/2024`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    #[default]
    #[schemars(description = "Read 03/04/2024 as March 4th, falling back to day-first when the month is out of range")]
    MonthFirst,

    #[schemars(description = "Read 03/04/2024 as April 3rd, falling back to month-first when the day-first reading is impossible")]
    DayFirst,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MarginThresholds {
    #[schemars(description = "Gross margin at or above this ratio is reported as healthy")]
    pub healthy: f64,

    #[schemars(description = "Gross margin below this ratio is reported as thin")]
    pub thin: f64,
}

impl Default for MarginThresholds {
    fn default() -> Self {
        Self {
            healthy: 0.15,
            thin: 0.08,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReportConfig {
    #[schemars(description = "Header alias dictionary used to find the canonical columns")]
    pub aliases: ColumnAliases,

    #[schemars(description = "Maximum number of entries kept in the top products ranking")]
    pub top_products_limit: usize,

    #[schemars(description = "How many of the top products the narrative enumerates")]
    pub narrative_top_products: usize,

    pub thresholds: MarginThresholds,

    #[schemars(description = "Product id assigned to rows with a blank product cell")]
    pub unknown_product_label: String,

    #[schemars(description = "Currency suffix used when rendering amounts in text")]
    pub currency_label: String,

    pub date_order: DateOrder,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            aliases: ColumnAliases::default(),
            top_products_limit: 5,
            narrative_top_products: 3,
            thresholds: MarginThresholds::default(),
            unknown_product_label: "UNKNOWN".to_string(),
            currency_label: "VND".to_string(),
            date_order: DateOrder::default(),
        }
    }
}

impl ReportConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ReportConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_products_limit == 0 {
            return Err(SalesReportError::InvalidConfig(
                "top_products_limit must be at least 1".to_string(),
            ));
        }

        let MarginThresholds { healthy, thin } = self.thresholds;
        if !healthy.is_finite() || !thin.is_finite() {
            return Err(SalesReportError::InvalidConfig(format!(
                "margin thresholds must be finite, got healthy={} thin={}",
                healthy, thin
            )));
        }
        if thin > healthy {
            return Err(SalesReportError::InvalidConfig(format!(
                "thin margin threshold {} is above healthy threshold {}",
                thin, healthy
            )));
        }

        let unpopulated = self.aliases.unpopulated_fields();
        if !unpopulated.is_empty() {
            let names: Vec<&str> = unpopulated.iter().map(|f| f.as_str()).collect();
            return Err(SalesReportError::InvalidConfig(format!(
                "no column aliases configured for: {}",
                names.join(", ")
            )));
        }

        let shared = self.aliases.shared_aliases();
        if !shared.is_empty() {
            let described: Vec<String> = shared
                .iter()
                .map(|(alias, fields)| {
                    let names: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
                    format!("'{}' ({})", alias, names.join(", "))
                })
                .collect();
            return Err(SalesReportError::InvalidConfig(format!(
                "column aliases assigned to more than one field: {}",
                described.join("; ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LogicalField;

    #[test]
    fn test_defaults_are_valid() {
        let config = ReportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.top_products_limit, 5);
        assert_eq!(config.narrative_top_products, 3);
        assert_eq!(config.unknown_product_label, "UNKNOWN");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = ReportConfig::from_json_str(
            r#"{ "top_products_limit": 10, "thresholds": { "healthy": 0.2 } }"#,
        )
        .unwrap();
        assert_eq!(config.top_products_limit, 10);
        assert_eq!(config.thresholds.healthy, 0.2);
        assert_eq!(config.thresholds.thin, 0.08);
        assert!(config.aliases.matches(LogicalField::Revenue, "Doanh thu"));
    }

    #[test]
    fn test_round_trip_through_json() {
        let config = ReportConfig {
            date_order: DateOrder::DayFirst,
            aliases: ColumnAliases::default().with_extra(LogicalField::Profit, "Margin $"),
            ..ReportConfig::default()
        };
        let json = config.to_json().unwrap();
        assert!(json.contains("day_first"));
        let back = ReportConfig::from_json_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let zero_limit = ReportConfig {
            top_products_limit: 0,
            ..ReportConfig::default()
        };
        assert!(matches!(
            zero_limit.validate(),
            Err(SalesReportError::InvalidConfig(_))
        ));

        let inverted = ReportConfig {
            thresholds: MarginThresholds {
                healthy: 0.05,
                thin: 0.10,
            },
            ..ReportConfig::default()
        };
        assert!(inverted.validate().is_err());

        let no_aliases = ReportConfig {
            aliases: ColumnAliases::empty(),
            ..ReportConfig::default()
        };
        let err = no_aliases.validate().unwrap_err();
        assert!(err.to_string().contains("date, product_id, revenue, profit"));
    }

    #[test]
    fn test_alias_shared_by_two_fields_is_rejected() {
        let config = ReportConfig {
            aliases: ColumnAliases::default().with_extra(LogicalField::Profit, "Amount"),
            ..ReportConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SalesReportError::InvalidConfig(_)));
        assert!(err.to_string().contains("'amount' (revenue, profit)"));

        let json = r#"{ "aliases": { "date": ["d"], "product_id": ["p"], "revenue": ["x"], "profit": ["X "] } }"#;
        assert!(ReportConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_load_from_path() {
        let path = std::env::temp_dir().join(format!(
            "sales_kpi_report_config_{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{ "currency_label": "USD", "date_order": "day_first" }"#).unwrap();
        let loaded = ReportConfig::from_path(&path);
        std::fs::remove_file(&path).unwrap();

        let config = loaded.unwrap();
        assert_eq!(config.currency_label, "USD");
        assert_eq!(config.date_order, DateOrder::DayFirst);

        let missing = ReportConfig::from_path(std::env::temp_dir().join("sales_kpi_report_no_such.json"));
        assert!(matches!(missing, Err(SalesReportError::IoError(_))));
    }
}
