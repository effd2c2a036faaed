use crate::error::FilterError;
use crate::types::{FilterSpec, Order};
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

/// The orders a filter selected, or the explicit "nothing matched" signal
/// that tells callers to skip aggregation altogether.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<'a> {
    Orders(Vec<&'a Order>),
    NoResults,
}

impl<'a> Selection<'a> {
    pub fn orders(&self) -> Option<&[&'a Order]> {
        match self {
            Selection::Orders(o) => Some(o.as_slice()),
            Selection::NoResults => None,
        }
    }

    pub fn is_no_results(&self) -> bool {
        matches!(self, Selection::NoResults)
    }
}

#[derive(Debug, Clone)]
pub struct FilterOutcome<'a> {
    pub selection: Selection<'a>,
    /// Set when the order-id pattern was malformed; the selection is then
    /// the complete unfiltered order set.
    pub error: Option<FilterError>,
}

/// Compile the order-id pattern as a case-insensitive search.
pub fn compile_order_id_pattern(pattern: &str) -> Result<Regex, FilterError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| FilterError { pattern: pattern.to_string(), source })
}

/// Apply every active predicate of `spec`, keeping input order.
///
/// A malformed order-id pattern is not fatal: the outcome falls back to all
/// orders and carries the error for the caller to surface.
pub fn apply<'a>(orders: &'a [Order], spec: &FilterSpec) -> FilterOutcome<'a> {
    let id_pattern = match spec.order_id_pattern().map(compile_order_id_pattern).transpose() {
        Ok(p) => p,
        Err(e) => {
            warn!("{}", e);
            return FilterOutcome { selection: select(orders.iter().collect()), error: Some(e) };
        }
    };
    let state = spec.state_constraint();
    let bounds = spec.date_bounds();

    let kept: Vec<&Order> = orders
        .iter()
        .filter(|o| state.map_or(true, |s| o.state == s))
        .filter(|o| bounds.map_or(true, |(start, end)| start <= o.order_date && o.order_date <= end))
        .filter(|o| id_pattern.as_ref().map_or(true, |re| re.is_match(&o.order_id)))
        .collect();

    debug!(input = orders.len(), kept = kept.len(), "filter applied");
    FilterOutcome { selection: select(kept), error: None }
}

fn select(orders: Vec<&Order>) -> Selection<'_> {
    if orders.is_empty() {
        Selection::NoResults
    } else {
        Selection::Orders(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn order(id: &str, date: &str, postal: &str, state: &str) -> Order {
        Order {
            order_id: id.to_string(),
            order_date: d(date),
            postal_code: postal.to_string(),
            state: state.to_string(),
        }
    }

    fn sample() -> Vec<Order> {
        vec![
            order("AU001", "2024-01-15", "2000", "NSW"),
            order("AU002", "2024-02-10", "2600", "ACT"),
            order("AU003", "2023-12-31", "2000", "NSW"),
            order("au004", "2025-01-01", "3000", "VIC"),
        ]
    }

    fn ids(outcome: &FilterOutcome<'_>) -> Vec<String> {
        outcome
            .selection
            .orders()
            .unwrap_or(&[])
            .iter()
            .map(|o| o.order_id.clone())
            .collect()
    }

    #[test]
    fn state_and_inclusive_date_range() {
        let orders = vec![
            order("AU001", "2024-01-15", "2000", "NSW"),
            order("AU002", "2024-03-01", "2600", "ACT"),
        ];
        let spec = FilterSpec::default()
            .with_state("NSW")
            .with_date_range(d("2024-01-01"), d("2024-12-31"));
        assert_eq!(ids(&apply(&orders, &spec)), vec!["AU001"]);
    }

    #[test]
    fn date_range_includes_both_ends() {
        let orders = sample();
        let spec = FilterSpec::default().with_date_range(d("2023-12-31"), d("2024-01-15"));
        assert_eq!(ids(&apply(&orders, &spec)), vec!["AU001", "AU003"]);
    }

    #[test]
    fn all_and_partial_ranges_are_unconstrained() {
        let orders = sample();
        let spec = FilterSpec {
            state: Some("All".into()),
            date_range: Some(vec![d("2030-01-01")]),
            order_id: Some(String::new()),
        };
        assert_eq!(ids(&apply(&orders, &spec)), vec!["AU001", "AU002", "AU003", "au004"]);
    }

    #[test]
    fn order_id_match_is_case_insensitive_substring() {
        let orders = sample();
        let spec = FilterSpec::default().with_order_id("U00");
        assert_eq!(ids(&apply(&orders, &spec)).len(), 4);
        let spec = FilterSpec::default().with_order_id("Au004");
        assert_eq!(ids(&apply(&orders, &spec)), vec!["au004"]);
    }

    #[test]
    fn malformed_pattern_falls_back_to_everything() {
        let orders = sample();
        let spec = FilterSpec::default().with_state("ACT").with_order_id("AU(");
        let outcome = apply(&orders, &spec);
        assert_eq!(ids(&outcome).len(), 4);
        let err = outcome.error.expect("pattern error");
        assert_eq!(err.pattern, "AU(");
    }

    #[test]
    fn nothing_matching_is_no_results() {
        let orders = sample();
        let outcome = apply(&orders, &FilterSpec::default().with_state("WA"));
        assert!(outcome.selection.is_no_results());
        assert!(outcome.error.is_none());
    }

    #[test]
    fn same_spec_twice_gives_same_selection() {
        let orders = sample();
        let spec = FilterSpec::default().with_state("NSW").with_order_id("au");
        let first = apply(&orders, &spec);
        let second = apply(&orders, &spec);
        assert_eq!(first.selection, second.selection);
    }
}
