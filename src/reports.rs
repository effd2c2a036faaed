use crate::error::Warning;
use crate::reference::PostcodeIndex;
use crate::types::{
    GeoPoint, MonthCount, MonthTrendRow, Order, PostalCount, StateCount, StateMonthTrendRow, SuburbCount,
    SummaryStats, TopState, YearMonth, UNKNOWN,
};
use crate::util::{pct_change, share_pct};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use tracing::warn;

pub const DEFAULT_TOP_N: usize = 10;

/// Count keys, keeping groups in the order they were first seen.
fn count_first_seen<K, I>(keys: I) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<(K, usize)> = Vec::new();
    for key in keys {
        match slots.get(&key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                slots.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }
    counts
}

/// Group by key, sort by count descending and keep the first `n`. The sort is
/// stable, so groups with equal counts stay in first-seen order.
pub fn top_n<K, I>(keys: I, n: usize) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut counts = count_first_seen(keys);
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(n);
    counts
}

pub fn total_count(orders: &[&Order]) -> usize {
    orders.len()
}

pub fn state_counts(orders: &[&Order]) -> Vec<StateCount> {
    top_n(orders.iter().map(|o| o.state.as_str()), usize::MAX)
        .into_iter()
        .map(|(state, orders)| StateCount { state: state.to_string(), orders })
        .collect()
}

/// Most frequent state and its share of all orders. An empty input yields
/// `N/A` with a zero share.
pub fn top_state(orders: &[&Order]) -> TopState {
    let total = total_count(orders);
    match state_counts(orders).into_iter().next() {
        Some(top) => TopState { share_pct: share_pct(top.orders, total), state: top.state, orders: top.orders },
        None => TopState { state: "N/A".to_string(), orders: 0, share_pct: 0.0 },
    }
}

pub fn monthly_counts(orders: &[&Order]) -> Vec<MonthCount> {
    let mut by_month: BTreeMap<YearMonth, usize> = BTreeMap::new();
    for o in orders {
        *by_month.entry(YearMonth::of(o.order_date)).or_default() += 1;
    }
    by_month.into_iter().map(|(month, orders)| MonthCount { month, orders }).collect()
}

/// Percentage change between consecutive periods.
///
/// The first period is 0. A change from a zero count is undefined and is
/// reported as 0 as well, so the series never carries NaN or infinity.
pub fn month_over_month_change(counts: &[usize]) -> Vec<f64> {
    let mut changes = Vec::with_capacity(counts.len());
    if counts.is_empty() {
        return changes;
    }
    changes.push(0.0);
    changes.extend(counts.windows(2).map(|w| pct_change(w[0], w[1])));
    changes
}

pub fn monthly_trend(orders: &[&Order]) -> Vec<MonthTrendRow> {
    let months = monthly_counts(orders);
    let counts: Vec<usize> = months.iter().map(|m| m.orders).collect();
    months
        .into_iter()
        .zip(month_over_month_change(&counts))
        .map(|(m, mom_change)| MonthTrendRow { month: m.month, orders: m.orders, mom_change })
        .collect()
}

/// Change of the most recent month, or 0 with fewer than two months.
pub fn latest_mom(trend: &[MonthTrendRow]) -> f64 {
    match trend {
        [.., last] if trend.len() > 1 => last.mom_change,
        _ => 0.0,
    }
}

/// Month-over-month change computed separately for each state. Rows come
/// out grouped by state (alphabetical), months ascending within a state.
/// Months in which a state had no orders do not appear.
pub fn month_over_month_by_state(orders: &[&Order]) -> Vec<StateMonthTrendRow> {
    let mut by_state: BTreeMap<&str, BTreeMap<YearMonth, usize>> = BTreeMap::new();
    for o in orders {
        *by_state
            .entry(o.state.as_str())
            .or_default()
            .entry(YearMonth::of(o.order_date))
            .or_default() += 1;
    }

    let mut rows = Vec::new();
    for (state, months) in by_state {
        let counts: Vec<usize> = months.values().copied().collect();
        for ((month, count), mom_change) in months.into_iter().zip(month_over_month_change(&counts)) {
            rows.push(StateMonthTrendRow { state: state.to_string(), month, orders: count, mom_change });
        }
    }
    rows
}

pub fn top_postcodes(orders: &[&Order], n: usize) -> Vec<PostalCount> {
    top_n(orders.iter().map(|o| (o.postal_code.as_str(), o.state.as_str())), n)
        .into_iter()
        .map(|((postal_code, state), orders)| PostalCount {
            postal_code: postal_code.to_string(),
            state: state.to_string(),
            orders,
        })
        .collect()
}

/// Top suburbs by order count, resolving each order's postal code to the
/// reference place name and state code. Unresolved orders are grouped under
/// `Unknown` with their own state.
pub fn suburb_rollup(orders: &[&Order], index: &PostcodeIndex, n: usize) -> Vec<SuburbCount> {
    let keys = orders.iter().map(|o| match index.get(&o.postal_code) {
        Some(r) => {
            let state = if r.state_code.is_empty() { o.state.as_str() } else { r.state_code.as_str() };
            (r.place_name.as_str(), state)
        }
        None => (UNKNOWN, o.state.as_str()),
    });
    top_n(keys, n)
        .into_iter()
        .map(|((suburb, state), orders)| SuburbCount {
            suburb: suburb.to_string(),
            state: state.to_string(),
            orders,
        })
        .collect()
}

/// Per-postal-code counts left-joined to the reference coordinates, in
/// postal code order.
///
/// Postal codes with no reference entry stay in the result with empty geo
/// fields and are summarised in the returned warning.
pub fn geo_join(orders: &[&Order], index: &PostcodeIndex) -> (Vec<GeoPoint>, Option<Warning>) {
    let mut by_postcode: BTreeMap<&str, usize> = BTreeMap::new();
    for o in orders {
        *by_postcode.entry(o.postal_code.as_str()).or_default() += 1;
    }

    let mut unmatched = 0usize;
    let mut example: Option<&str> = None;
    let points: Vec<GeoPoint> = by_postcode
        .into_iter()
        .map(|(postal_code, orders)| match index.get(postal_code) {
            Some(r) => GeoPoint {
                postal_code: postal_code.to_string(),
                orders,
                latitude: Some(r.latitude),
                longitude: Some(r.longitude),
                state_name: Some(r.state_name.clone()),
                place_name: Some(r.place_name.clone()),
            },
            None => {
                unmatched += 1;
                if example.is_none() {
                    example = Some(postal_code);
                }
                GeoPoint {
                    postal_code: postal_code.to_string(),
                    orders,
                    latitude: None,
                    longitude: None,
                    state_name: None,
                    place_name: None,
                }
            }
        })
        .collect();

    let warning = example.map(|e| Warning::UnmatchedPostcodes { count: unmatched, example: e.to_string() });
    if let Some(w) = &warning {
        warn!("{}", w);
    }
    (points, warning)
}

pub fn summary(orders: &[&Order]) -> SummaryStats {
    SummaryStats {
        total_orders: total_count(orders),
        top_state: top_state(orders),
        latest_mom: latest_mom(&monthly_trend(orders)),
    }
}
