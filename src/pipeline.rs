//! One evaluation of the report: filter, aggregate, paginate.
//!
//! `evaluate` is a pure function of the loaded datasets, the filter and the
//! page parameters. Front-ends call it again on every interaction instead of
//! keeping any derived state of their own.

use crate::cache::{self, OrderDataset, ReferenceDataset};
use crate::error::{FilterError, ReportError, Warning};
use crate::filter::{self, Selection};
use crate::loader::{LoadOptions, LoadReport};
use crate::paging::{paginate, PageRange, DEFAULT_PAGE_SIZE};
use crate::reference::{PostcodeIndex, ReferenceReport};
use crate::reports::{self, DEFAULT_TOP_N};
use crate::types::{
    FilterSpec, GeoPoint, MonthTrendRow, Order, PostalCount, StateCount, StateMonthTrendRow, SuburbCount,
    SummaryStats, ALL_STATES,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Immutable snapshots of both inputs for one data-load cycle.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub orders: Arc<OrderDataset>,
    pub reference: Arc<ReferenceDataset>,
}

impl Datasets {
    /// Load both sources through the shared cache.
    pub fn load(orders: &Path, postcodes: &Path, options: &LoadOptions) -> Result<Self, ReportError> {
        let mut cache = cache::global();
        Ok(Datasets { orders: cache.orders(orders, options)?, reference: cache.reference(postcodes)? })
    }

    /// Drop cached copies of both sources and load them again.
    pub fn reload(orders: &Path, postcodes: &Path, options: &LoadOptions) -> Result<Self, ReportError> {
        {
            let mut cache = cache::global();
            cache.invalidate(orders);
            cache.invalidate(postcodes);
        }
        info!("dataset cache invalidated");
        Self::load(orders, postcodes, options)
    }

    pub fn from_parts(orders: Vec<Order>, index: PostcodeIndex) -> Self {
        let loaded = orders.len();
        Datasets {
            orders: Arc::new(OrderDataset {
                source: PathBuf::new(),
                orders,
                report: LoadReport { total_rows: loaded, loaded_rows: loaded, ..Default::default() },
            }),
            reference: Arc::new(ReferenceDataset {
                source: PathBuf::new(),
                report: ReferenceReport { distinct_postcodes: index.len(), ..Default::default() },
                index,
            }),
        }
    }

    /// State selector options: `All` followed by the distinct states, sorted.
    pub fn state_options(&self) -> Vec<String> {
        let states: BTreeSet<&str> = self.orders.orders.iter().map(|o| o.state.as_str()).collect();
        std::iter::once(ALL_STATES)
            .chain(states)
            .map(str::to_string)
            .collect()
    }

    /// Earliest and latest order date.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let dates = self.orders.orders.iter().map(|o| o.order_date);
        Some((dates.clone().min()?, dates.max()?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    pub page: usize,
    pub page_size: usize,
    pub top_n: usize,
}

impl Default for ViewOptions {
    fn default() -> Self {
        ViewOptions { page: 1, page_size: DEFAULT_PAGE_SIZE, top_n: DEFAULT_TOP_N }
    }
}

/// Everything a front-end needs to render one view.
#[derive(Debug, Clone, Serialize)]
pub struct ReportBundle<'a> {
    pub caption: String,
    pub summary: SummaryStats,
    pub insight: String,
    pub top_postcodes: Vec<PostalCount>,
    pub suburbs: Vec<SuburbCount>,
    pub state_counts: Vec<StateCount>,
    pub monthly_trend: Vec<MonthTrendRow>,
    pub state_trend: Vec<StateMonthTrendRow>,
    pub geo_points: Vec<GeoPoint>,
    pub page_number: usize,
    pub page_range: PageRange,
    pub page_rows: Vec<&'a Order>,
    #[serde(skip)]
    pub filtered: Vec<&'a Order>,
    pub warnings: Vec<Warning>,
    #[serde(skip)]
    pub filter_error: Option<FilterError>,
}

impl<'a> ReportBundle<'a> {
    /// Points that can be placed on a map.
    pub fn mappable(&self) -> impl Iterator<Item = &GeoPoint> {
        self.geo_points.iter().filter(|p| p.has_coordinates())
    }

    /// Human-readable notices: the filter fallback first, then data warnings.
    pub fn notices(&self) -> Vec<String> {
        self.filter_error
            .iter()
            .map(|e| format!("{}; showing all orders", e))
            .chain(self.warnings.iter().map(Warning::to_string))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub enum Evaluation<'a> {
    /// The filters matched nothing; no aggregates were computed.
    NoResults { caption: String },
    Report(Box<ReportBundle<'a>>),
}

pub fn evaluate<'a>(data: &'a Datasets, spec: &FilterSpec, view: &ViewOptions) -> Evaluation<'a> {
    let caption = spec.caption();
    let outcome = filter::apply(&data.orders.orders, spec);
    let filtered = match outcome.selection {
        Selection::Orders(orders) => orders,
        Selection::NoResults => {
            info!("no orders match the selected filters");
            return Evaluation::NoResults { caption };
        }
    };

    let index = &data.reference.index;
    let summary = reports::summary(&filtered);
    let (geo_points, unmatched) = reports::geo_join(&filtered, index);
    let page = paginate(&filtered, view.page, view.page_size);

    Evaluation::Report(Box::new(ReportBundle {
        caption,
        insight: summary.insight(),
        top_postcodes: reports::top_postcodes(&filtered, view.top_n),
        suburbs: reports::suburb_rollup(&filtered, index, view.top_n),
        state_counts: reports::state_counts(&filtered),
        monthly_trend: reports::monthly_trend(&filtered),
        state_trend: reports::month_over_month_by_state(&filtered),
        geo_points,
        page_number: page.number,
        page_range: page.range,
        page_rows: page.items.to_vec(),
        warnings: unmatched.into_iter().collect(),
        filter_error: outcome.error,
        summary,
        filtered,
    }))
}
