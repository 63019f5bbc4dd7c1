use crate::schema::LogicalField;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SalesReportError {
    #[error(
        "Missing required column(s) or unrecognized column names: {}.\n{hint}",
        format_fields(.missing)
    )]
    Schema {
        missing: Vec<LogicalField>,
        hint: String,
    },

    #[error("Table has no header row")]
    EmptyTable,

    #[error("Unable to decode input as text: {0}")]
    Encoding(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SalesReportError {
    /// Logical fields that could not be resolved, empty for every other variant.
    pub fn missing_fields(&self) -> &[LogicalField] {
        match self {
            SalesReportError::Schema { missing, .. } => missing,
            _ => &[],
        }
    }
}

fn format_fields(fields: &[LogicalField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, SalesReportError>;
