use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use tabled::Tabled;

/// Sentinel state value that disables the state predicate.
pub const ALL_STATES: &str = "All";

/// Label used when an order's state (or a suburb) cannot be resolved.
pub const UNKNOWN: &str = "Unknown";

/// Order CSV header, in the order the file is read and written back.
pub const ORDER_COLUMNS: [&str; 4] = ["OrderID", "OrderDate", "PostalCode", "State"];

/// Columns the postcode reference table cannot do without.
pub const POSTCODE_COLUMNS: [&str; 3] = ["postcode", "latitude", "longitude"];

#[derive(Debug, Deserialize)]
pub struct RawOrderRow {
    #[serde(rename = "OrderID")]
    pub order_id: Option<String>,
    #[serde(rename = "OrderDate")]
    pub order_date: Option<String>,
    #[serde(rename = "PostalCode")]
    pub postal_code: Option<String>,
    #[serde(rename = "State")]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawPostcodeRow {
    pub postcode: Option<String>,
    pub place_name: Option<String>,
    pub state_name: Option<String>,
    pub state_code: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub accuracy: Option<String>,
}

/// A validated order. Serializes back to the exact order CSV schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct Order {
    #[serde(rename = "OrderID")]
    #[tabled(rename = "OrderID")]
    pub order_id: String,
    #[serde(rename = "OrderDate")]
    #[tabled(rename = "OrderDate")]
    pub order_date: NaiveDate,
    #[serde(rename = "PostalCode")]
    #[tabled(rename = "PostalCode")]
    pub postal_code: String,
    #[serde(rename = "State")]
    #[tabled(rename = "State")]
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostcodeReference {
    pub postcode: String,
    pub place_name: String,
    pub state_name: String,
    pub state_code: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Ranked numerically; exports may carry fractional values.
    pub accuracy: Option<f64>,
}

/// Calendar month bucket used for trend grouping. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        YearMonth { year: date.year(), month: date.month() }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// User-selected constraints for one evaluation.
///
/// `date_range` is kept as a list so that a partially picked range (one
/// endpoint) can be represented; anything other than exactly two endpoints
/// is treated as no date constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub state: Option<String>,
    pub date_range: Option<Vec<NaiveDate>>,
    pub order_id: Option<String>,
}

impl FilterSpec {
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(vec![start, end]);
        self
    }

    pub fn with_order_id(mut self, pattern: impl Into<String>) -> Self {
        self.order_id = Some(pattern.into());
        self
    }

    /// The state to match exactly, or `None` when unset or `All`.
    pub fn state_constraint(&self) -> Option<&str> {
        self.state
            .as_deref()
            .filter(|s| !s.is_empty() && *s != ALL_STATES)
    }

    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self.date_range.as_deref() {
            Some([start, end]) => Some((*start, *end)),
            _ => None,
        }
    }

    pub fn order_id_pattern(&self) -> Option<&str> {
        self.order_id.as_deref().filter(|p| !p.is_empty())
    }

    /// One-line caption describing what the order table is showing.
    pub fn caption(&self) -> String {
        if let Some(p) = self.order_id_pattern() {
            format!("Showing orders matching OrderID: {}", p)
        } else if let Some(s) = self.state_constraint() {
            format!("Showing orders for State: {}", s)
        } else {
            "Showing all orders".to_string()
        }
    }
}

pub fn display_opt<T: fmt::Display>(v: &Option<T>) -> String {
    match v {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

pub fn display_pct(v: &f64) -> String {
    format!("{:.1}%", v)
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct StateCount {
    #[serde(rename = "State")]
    #[tabled(rename = "State")]
    pub state: String,
    #[serde(rename = "OrderCount")]
    #[tabled(rename = "Orders")]
    pub orders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct PostalCount {
    #[serde(rename = "PostalCode")]
    #[tabled(rename = "Postal Code")]
    pub postal_code: String,
    #[serde(rename = "State")]
    #[tabled(rename = "State")]
    pub state: String,
    #[serde(rename = "OrderCount")]
    #[tabled(rename = "Orders")]
    pub orders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct SuburbCount {
    #[serde(rename = "Suburb")]
    #[tabled(rename = "Suburb")]
    pub suburb: String,
    #[serde(rename = "State")]
    #[tabled(rename = "State")]
    pub state: String,
    #[serde(rename = "OrderCount")]
    #[tabled(rename = "Orders")]
    pub orders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct MonthCount {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: YearMonth,
    #[serde(rename = "OrderCount")]
    #[tabled(rename = "Orders")]
    pub orders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct MonthTrendRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: YearMonth,
    #[serde(rename = "OrderCount")]
    #[tabled(rename = "Orders")]
    pub orders: usize,
    #[serde(rename = "MoM_Change")]
    #[tabled(rename = "MoM Change", display_with = "display_pct")]
    pub mom_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct StateMonthTrendRow {
    #[serde(rename = "State")]
    #[tabled(rename = "State")]
    pub state: String,
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: YearMonth,
    #[serde(rename = "OrderCount")]
    #[tabled(rename = "Orders")]
    pub orders: usize,
    #[serde(rename = "MoM_Change")]
    #[tabled(rename = "MoM Change", display_with = "display_pct")]
    pub mom_change: f64,
}

/// Per-postal-code order count joined to reference coordinates. Geo fields
/// are `None` when the postal code has no reference entry.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct GeoPoint {
    #[serde(rename = "PostalCode")]
    #[tabled(rename = "Postal Code")]
    pub postal_code: String,
    #[serde(rename = "OrderCount")]
    #[tabled(rename = "Orders")]
    pub orders: usize,
    #[tabled(rename = "Latitude", display_with = "display_opt")]
    pub latitude: Option<f64>,
    #[tabled(rename = "Longitude", display_with = "display_opt")]
    pub longitude: Option<f64>,
    #[tabled(rename = "State", display_with = "display_opt")]
    pub state_name: Option<String>,
    #[tabled(rename = "Place", display_with = "display_opt")]
    pub place_name: Option<String>,
}

impl GeoPoint {
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopState {
    pub state: String,
    pub orders: usize,
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total_orders: usize,
    pub top_state: TopState,
    pub latest_mom: f64,
}

impl SummaryStats {
    pub fn insight(&self) -> String {
        format!(
            "The top state, {}, accounts for {:.1}% of orders, with a recent month-over-month change of {:.1}%.",
            self.top_state.state, self.top_state.share_pct, self.latest_mom
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn year_month_orders_chronologically_and_prints_padded() {
        let dec = YearMonth::of(d("2023-12-31"));
        let jan = YearMonth::of(d("2024-01-01"));
        assert!(dec < jan);
        assert_eq!(jan.to_string(), "2024-01");
        assert_eq!(serde_json::to_string(&dec).unwrap(), "\"2023-12\"");
    }

    #[test]
    fn all_sentinel_disables_state_constraint() {
        assert_eq!(FilterSpec::default().with_state("All").state_constraint(), None);
        assert_eq!(FilterSpec::default().with_state("NSW").state_constraint(), Some("NSW"));
    }

    #[test]
    fn date_bounds_need_exactly_two_endpoints() {
        let one = FilterSpec { date_range: Some(vec![d("2024-01-01")]), ..Default::default() };
        assert_eq!(one.date_bounds(), None);
        let three = FilterSpec {
            date_range: Some(vec![d("2024-01-01"), d("2024-02-01"), d("2024-03-01")]),
            ..Default::default()
        };
        assert_eq!(three.date_bounds(), None);
        let two = FilterSpec::default().with_date_range(d("2024-01-01"), d("2024-12-31"));
        assert_eq!(two.date_bounds(), Some((d("2024-01-01"), d("2024-12-31"))));
    }

    #[test]
    fn caption_prefers_order_id_then_state() {
        let spec = FilterSpec::default().with_state("ACT").with_order_id("au00");
        assert_eq!(spec.caption(), "Showing orders matching OrderID: au00");
        assert_eq!(FilterSpec::default().with_state("ACT").caption(), "Showing orders for State: ACT");
        assert_eq!(FilterSpec::default().caption(), "Showing all orders");
    }
}
