//! Order trend reporting for Australian orders.
//!
//! Loads an order log and a postcode reference table, filters the orders by
//! state, date range and order id, and derives the summary, trend, ranking
//! and map tables a report front-end renders.
pub mod cache;
pub mod error;
pub mod filter;
pub mod loader;
pub mod output;
pub mod paging;
pub mod pipeline;
pub mod reference;
pub mod reports;
pub mod table;
pub mod types;
pub mod util;

pub use error::{FilterError, ReportError, Warning};
pub use pipeline::{evaluate, Datasets, Evaluation, ReportBundle, ViewOptions};
pub use types::{FilterSpec, Order, PostcodeReference};
