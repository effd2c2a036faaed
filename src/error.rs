use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{dataset}: missing columns: {}. Available: {}", .missing.join(", "), .available.join(", "))]
    Schema {
        dataset: &'static str,
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("{dataset}: no valid rows after cleaning")]
    EmptyDataset { dataset: &'static str },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A malformed order-id pattern. Recovered by the filter engine, which falls
/// back to the unfiltered order set and hands this back as a notice.
#[derive(Debug, Clone, Error)]
#[error("invalid OrderID filter \"{pattern}\": {source}")]
pub struct FilterError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Row-level data issues. Never fatal; always carry a count and an example
/// so the data loss is auditable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    UnreadableRows { dataset: &'static str, dropped: usize, example_line: Option<u64> },
    InvalidOrderDates { dropped: usize, example: Option<String> },
    UnexpectedOrderIdPrefix { prefix: String },
    MissingCoordinates { dropped: usize, example: Option<String> },
    UnmatchedPostcodes { count: usize, example: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnreadableRows { dataset, dropped, example_line } => {
                write!(f, "Removed {} unreadable {} rows", dropped, dataset)?;
                if let Some(line) = example_line {
                    write!(f, " (e.g., line {})", line)?;
                }
                Ok(())
            }
            Warning::InvalidOrderDates { dropped, example } => {
                write!(f, "Removed {} rows with invalid OrderDate values", dropped)?;
                if let Some(e) = example {
                    write!(f, " (e.g., {:?})", e)?;
                }
                Ok(())
            }
            Warning::UnexpectedOrderIdPrefix { prefix } => {
                write!(f, "No OrderIDs start with '{}'; the order source may not be the expected one", prefix)
            }
            Warning::MissingCoordinates { dropped, example } => {
                write!(f, "Removed {} postcodes with invalid lat/lon values", dropped)?;
                if let Some(e) = example {
                    write!(f, " (e.g., {})", e)?;
                }
                Ok(())
            }
            Warning::UnmatchedPostcodes { count, example } => write!(
                f,
                "{} postcodes lack lat/lon data (e.g., {}). These will not appear on the map.",
                count, example
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_missing_and_available_columns() {
        let err = ReportError::Schema {
            dataset: "orders",
            missing: vec!["OrderDate".into(), "State".into()],
            available: vec!["OrderID".into(), "PostalCode".into()],
        };
        assert_eq!(
            err.to_string(),
            "orders: missing columns: OrderDate, State. Available: OrderID, PostalCode"
        );
    }

    #[test]
    fn unmatched_warning_mentions_count_and_example() {
        let w = Warning::UnmatchedPostcodes { count: 1, example: "9999".into() };
        assert!(w.to_string().starts_with("1 postcodes lack lat/lon data (e.g., 9999)"));
    }

    #[test]
    fn unreadable_rows_warning_names_a_line() {
        let w = Warning::UnreadableRows { dataset: "orders", dropped: 2, example_line: Some(3) };
        assert_eq!(w.to_string(), "Removed 2 unreadable orders rows (e.g., line 3)");
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"], "unreadable_rows");
        assert_eq!(json["example_line"], 3);
    }
}
