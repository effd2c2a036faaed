use crate::error::{ReportError, Warning};
use crate::table::{row_line, RawTable};
use crate::types::{Order, RawOrderRow, ORDER_COLUMNS, UNKNOWN};
use crate::util::{clean_field, parse_date_safe};
use std::path::Path;
use tracing::{debug, warn};

pub const DEFAULT_ORDER_ID_PREFIX: &str = "AU";

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Order ids are expected to carry this prefix; if none do, a warning
    /// is raised. `None` disables the check.
    pub expected_prefix: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions { expected_prefix: Some(DEFAULT_ORDER_ID_PREFIX.to_string()) }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub invalid_dates: usize,
    pub parse_errors: usize,
    pub warnings: Vec<Warning>,
}

impl LoadReport {
    pub fn dropped_rows(&self) -> usize {
        self.invalid_dates + self.parse_errors
    }
}

pub fn load_orders_from_path(
    path: impl AsRef<Path>,
    options: &LoadOptions,
) -> Result<(Vec<Order>, LoadReport), ReportError> {
    let table = RawTable::from_path(path)?;
    load_orders(&table, options)
}

/// Type and validate raw order rows.
///
/// Rows that cannot be decoded and rows whose `OrderDate` is not a
/// `YYYY-MM-DD` date are dropped and counted; a blank state becomes `Unknown`.
pub fn load_orders(table: &RawTable, options: &LoadOptions) -> Result<(Vec<Order>, LoadReport), ReportError> {
    table.require_columns("orders", &ORDER_COLUMNS)?;

    let mut report = LoadReport { total_rows: table.len(), ..Default::default() };
    let mut bad_date_example: Option<String> = None;
    let mut unreadable_line: Option<u64> = None;
    let mut orders: Vec<Order> = Vec::with_capacity(table.len());

    for result in table.rows::<RawOrderRow>() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("skipping unreadable order row: {}", e);
                report.parse_errors += 1;
                if unreadable_line.is_none() {
                    unreadable_line = row_line(&e);
                }
                continue;
            }
        };
        let order_date = match parse_date_safe(row.order_date.as_deref()) {
            Some(d) => d,
            None => {
                report.invalid_dates += 1;
                if bad_date_example.is_none() {
                    bad_date_example = Some(row.order_date.unwrap_or_default());
                }
                continue;
            }
        };

        orders.push(Order {
            order_id: clean_field(row.order_id.as_deref()).unwrap_or_default().to_string(),
            order_date,
            postal_code: clean_field(row.postal_code.as_deref()).unwrap_or_default().to_string(),
            state: clean_field(row.state.as_deref()).unwrap_or(UNKNOWN).to_string(),
        });
    }
    report.loaded_rows = orders.len();

    if report.parse_errors > 0 {
        let w = Warning::UnreadableRows {
            dataset: "orders",
            dropped: report.parse_errors,
            example_line: unreadable_line,
        };
        warn!("{}", w);
        report.warnings.push(w);
    }
    if report.invalid_dates > 0 {
        let w = Warning::InvalidOrderDates { dropped: report.invalid_dates, example: bad_date_example };
        warn!("{}", w);
        report.warnings.push(w);
    }
    if orders.is_empty() {
        return Err(ReportError::EmptyDataset { dataset: "orders" });
    }
    if let Some(prefix) = options.expected_prefix.as_deref() {
        if !orders.iter().any(|o| o.order_id.starts_with(prefix)) {
            let w = Warning::UnexpectedOrderIdPrefix { prefix: prefix.to_string() };
            warn!("{}", w);
            report.warnings.push(w);
        }
    }

    debug!(
        total = report.total_rows,
        loaded = report.loaded_rows,
        dropped = report.dropped_rows(),
        "orders loaded"
    );
    Ok((orders, report))
}
