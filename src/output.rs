use crate::error::ReportError;
use crate::pipeline::ReportBundle;
use crate::types::{Order, ORDER_COLUMNS};
use crate::util::{format_int, format_number};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Write orders with the same header and column order they were loaded
/// with. The header is written even when there are no rows.
pub fn write_orders_csv<W: Write>(writer: W, orders: &[&Order]) -> Result<(), ReportError> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(ORDER_COLUMNS)?;
    for o in orders {
        wtr.serialize(o)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_orders_csv(path: impl AsRef<Path>, orders: &[&Order]) -> Result<(), ReportError> {
    let file = std::fs::File::create(path)?;
    write_orders_csv(file, orders)
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<(), ReportError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table<T>(title: &str, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", title);
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// Print every section of a report as markdown tables.
pub fn print_report(bundle: &ReportBundle<'_>, max_rows: usize) {
    let s = &bundle.summary;
    println!("Summary\n");
    println!("  Total Orders:      {}", format_int(s.total_orders));
    println!(
        "  Top State:         {} ({}%)",
        s.top_state.state,
        format_number(s.top_state.share_pct, 1)
    );
    println!("  Latest MoM Growth: {}%\n", format_number(s.latest_mom, 1));
    println!("Insight: {}\n", bundle.insight);

    for notice in bundle.notices() {
        println!("Warning: {}", notice);
    }

    preview_table("Top Postal Codes", &bundle.top_postcodes, max_rows);
    preview_table("Top Suburbs", &bundle.suburbs, max_rows);
    preview_table("Orders by Postal Code (map points)", &bundle.geo_points, max_rows);
    preview_table("Orders by State", &bundle.state_counts, max_rows);
    preview_table("Orders Over Time", &bundle.monthly_trend, max_rows);
    if bundle.monthly_trend.len() > 1 {
        preview_table("State-Level MoM Growth", &bundle.state_trend, max_rows);
    } else {
        println!("Insufficient data for MoM analysis (need at least 2 months).\n");
    }

    println!("Order Details");
    println!("{}\n", bundle.caption);
    let rows: Vec<Order> = bundle.page_rows.iter().map(|o| (*o).clone()).collect();
    preview_table(&format!("Page {}", bundle.page_number), &rows, rows.len());
    println!("{}\n", bundle.page_range);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn orders_round_trip_the_loaded_schema() {
        let orders = vec![
            Order {
                order_id: "AU001".into(),
                order_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                postal_code: "200".into(),
                state: "ACT".into(),
            },
            Order {
                order_id: "AU002".into(),
                order_date: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
                postal_code: "221".into(),
                state: "Unknown".into(),
            },
        ];
        let refs: Vec<&Order> = orders.iter().collect();
        let mut buf = Vec::new();
        write_orders_csv(&mut buf, &refs).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "OrderID,OrderDate,PostalCode,State\nAU001,2024-01-15,200,ACT\nAU002,2024-02-10,221,Unknown\n"
        );
    }

    #[test]
    fn empty_export_still_has_header() {
        let mut buf = Vec::new();
        write_orders_csv(&mut buf, &[]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "OrderID,OrderDate,PostalCode,State\n");
    }
}
