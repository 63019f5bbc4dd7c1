//! Column alias resolution.
//!
//! Sales exports arrive with whatever headers the sales team typed
//! ("Doanh thu", " SKU ", "order_date", ...). This module maps them onto the
//! four canonical fields using a fixed alias dictionary.

use crate::error::{Result, SalesReportError};
use crate::schema::LogicalField;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const DEFAULT_ALIASES: [(LogicalField, &[&str]); 4] = [
    (
        LogicalField::Date,
        &[
            "date",
            "ngay",
            "ngày",
            "order_date",
            "ngày bán",
            "time",
            "thoi_gian",
            "thời gian",
        ],
    ),
    (
        LogicalField::ProductId,
        &[
            "product_id",
            "ma_sp",
            "mã_sp",
            "mã sản phẩm",
            "product",
            "item",
            "sku",
        ],
    ),
    (
        LogicalField::Revenue,
        &[
            "revenue",
            "doanh_thu",
            "doanh thu",
            "sales",
            "amount",
            "gross_sales",
            "tiền bán",
        ],
    ),
    (
        LogicalField::Profit,
        &["profit", "loi_nhuan", "lợi nhuận", "net_profit", "lãi"],
    ),
];

const NAMING_EXAMPLE: &str =
    "Example column names: date/ngày, product_id/mã sản phẩm, revenue/doanh thu, profit/lợi nhuận.";

/// Lowercases, trims and collapses inner whitespace runs to a single space.
pub fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Accepted header spellings per logical field. Entries are stored normalized,
/// including those read from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct ColumnAliases {
    fields: BTreeMap<LogicalField, BTreeSet<String>>,
}

impl Default for ColumnAliases {
    fn default() -> Self {
        let fields = DEFAULT_ALIASES
            .iter()
            .map(|(field, names)| {
                let set = names.iter().map(|n| normalize_header(n)).collect();
                (*field, set)
            })
            .collect();
        Self { fields }
    }
}

impl<'de> Deserialize<'de> for ColumnAliases {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<LogicalField, Vec<String>>::deserialize(deserializer)?;
        let mut aliases = ColumnAliases::empty();
        for (field, names) in raw {
            for name in names {
                aliases.insert(field, &name);
            }
        }
        Ok(aliases)
    }
}

impl ColumnAliases {
    /// An empty dictionary; every field must be populated before use.
    pub fn empty() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, field: LogicalField, alias: &str) -> Self {
        self.insert(field, alias);
        self
    }

    pub fn insert(&mut self, field: LogicalField, alias: &str) {
        let normalized = normalize_header(alias);
        if normalized.is_empty() {
            return;
        }
        self.fields.entry(field).or_default().insert(normalized);
    }

    pub fn aliases(&self, field: LogicalField) -> impl Iterator<Item = &str> {
        self.fields
            .get(&field)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn matches(&self, field: LogicalField, header: &str) -> bool {
        self.fields
            .get(&field)
            .map(|set| set.contains(&normalize_header(header)))
            .unwrap_or(false)
    }

    /// Fields that have no accepted spelling at all.
    pub fn unpopulated_fields(&self) -> Vec<LogicalField> {
        LogicalField::ALL
            .into_iter()
            .filter(|f| self.fields.get(f).map_or(true, |set| set.is_empty()))
            .collect()
    }

    /// Spellings claimed by more than one field, with the fields claiming them.
    /// Such an alias would let one column feed two fields.
    pub fn shared_aliases(&self) -> Vec<(&str, Vec<LogicalField>)> {
        let mut owners: BTreeMap<&str, Vec<LogicalField>> = BTreeMap::new();
        for (field, names) in &self.fields {
            for name in names {
                owners.entry(name.as_str()).or_default().push(*field);
            }
        }
        owners
            .into_iter()
            .filter(|(_, fields)| fields.len() > 1)
            .collect()
    }

    fn remediation_hint(&self, missing: &[LogicalField]) -> String {
        let mut hint = String::from(NAMING_EXAMPLE);
        for field in missing {
            let accepted: Vec<&str> = self.aliases(*field).collect();
            hint.push_str(&format!(
                "\nAccepted names for {}: {}.",
                field,
                accepted.join(", ")
            ));
        }
        hint
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResolvedColumn {
    /// Header exactly as it appeared in the upload.
    pub header: String,
    /// Zero-based position of the column.
    pub index: usize,
}

/// Which actual column feeds each canonical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnMapping {
    pub date: ResolvedColumn,
    pub product_id: ResolvedColumn,
    pub revenue: ResolvedColumn,
    pub profit: ResolvedColumn,
}

impl ColumnMapping {
    pub fn get(&self, field: LogicalField) -> &ResolvedColumn {
        match field {
            LogicalField::Date => &self.date,
            LogicalField::ProductId => &self.product_id,
            LogicalField::Revenue => &self.revenue,
            LogicalField::Profit => &self.profit,
        }
    }
}

/// Maps the upload's headers onto the canonical schema.
///
/// When several headers match the same field, the leftmost one wins. When any
/// field cannot be resolved, the error names every missing field.
pub fn resolve_columns(headers: &[String], aliases: &ColumnAliases) -> Result<ColumnMapping> {
    let lookup = |field: LogicalField| {
        headers
            .iter()
            .enumerate()
            .find(|(_, h)| aliases.matches(field, h))
            .map(|(index, header)| ResolvedColumn {
                header: header.clone(),
                index,
            })
    };

    let resolved = (
        lookup(LogicalField::Date),
        lookup(LogicalField::ProductId),
        lookup(LogicalField::Revenue),
        lookup(LogicalField::Profit),
    );

    match resolved {
        (Some(date), Some(product_id), Some(revenue), Some(profit)) => {
            debug!(
                "Resolved columns: date='{}', product_id='{}', revenue='{}', profit='{}'",
                date.header, product_id.header, revenue.header, profit.header
            );
            Ok(ColumnMapping {
                date,
                product_id,
                revenue,
                profit,
            })
        }
        (date, product_id, revenue, profit) => {
            let missing: Vec<LogicalField> = [
                (LogicalField::Date, date.is_none()),
                (LogicalField::ProductId, product_id.is_none()),
                (LogicalField::Revenue, revenue.is_none()),
                (LogicalField::Profit, profit.is_none()),
            ]
            .into_iter()
            .filter_map(|(field, absent)| absent.then_some(field))
            .collect();

            Err(SalesReportError::Schema {
                hint: aliases.remediation_hint(&missing),
                missing,
            })
        }
    }
}
