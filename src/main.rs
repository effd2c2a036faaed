// Command-line front-end.
//
// Loads the order log and postcode table, then either renders the report
// once (`--batch`) or runs a small menu loop where filters and the page can
// be changed and the report re-rendered. Every render is a fresh call to
// `pipeline::evaluate`; the only state kept between iterations is the
// loaded datasets and the current filter/page selection.
use au_orders_report::filter;
use au_orders_report::loader::LoadOptions;
use au_orders_report::output;
use au_orders_report::paging::{page_count, DEFAULT_PAGE_SIZE};
use au_orders_report::pipeline::{evaluate, Datasets, Evaluation, ViewOptions};
use au_orders_report::reports::DEFAULT_TOP_N;
use au_orders_report::types::{FilterSpec, ALL_STATES};
use au_orders_report::util::format_int;
use chrono::NaiveDate;
use clap::Parser;
use once_cell::sync::Lazy;
use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Parser)]
#[command(name = "au_orders_report", about = "Regional order trend report for AU orders")]
struct Args {
    /// Order log CSV (OrderID,OrderDate,PostalCode,State)
    #[arg(long, default_value = "data/au_orders.csv")]
    orders: PathBuf,

    /// Postcode reference CSV
    #[arg(long, default_value = "data/au_postcodes.csv")]
    postcodes: PathBuf,

    #[arg(long, default_value = ALL_STATES)]
    state: String,

    /// First order date to include (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last order date to include (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Case-insensitive OrderID pattern
    #[arg(long)]
    order_id: Option<String>,

    #[arg(long, default_value_t = 1)]
    page: usize,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Rows in the top postcode/suburb tables
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top: usize,

    /// Write the filtered orders to this CSV file
    #[arg(long)]
    export_csv: Option<PathBuf>,

    /// Write the full report as JSON to this file
    #[arg(long)]
    export_json: Option<PathBuf>,

    /// Render once and exit instead of showing the menu
    #[arg(long)]
    batch: bool,

    #[arg(long, short)]
    verbose: bool,
}

#[derive(Default)]
struct AppState {
    data: Option<Datasets>,
    spec: FilterSpec,
    view: ViewOptions,
    /// Set once dates come from `--from`/`--to` or the filter menu. Until
    /// then the date range tracks the loaded data's span.
    dates_explicit: bool,
}

impl AppState {
    fn install(&mut self, data: Datasets) {
        if !self.dates_explicit {
            self.spec.date_range = data.date_span().map(|(min, max)| vec![min, max]);
        }
        self.data = Some(data);
    }

    /// Orders the current filters select, for paging.
    fn filtered_total(&self) -> usize {
        let Some(data) = &self.data else {
            return 0;
        };
        let outcome = filter::apply(&data.orders.orders, &self.spec);
        outcome.selection.orders().map_or(0, |o| o.len())
    }
}

static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState::default()));

fn app_state() -> std::sync::MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Date range from the command line, `None` when neither bound is given.
/// With only one bound the range has a single endpoint and the filter
/// ignores it.
fn cli_date_range(args: &Args) -> Option<Vec<NaiveDate>> {
    match (args.from, args.to) {
        (Some(from), Some(to)) => Some(vec![from, to]),
        (Some(one), None) | (None, Some(one)) => Some(vec![one]),
        (None, None) => None,
    }
}

fn handle_load(args: &Args, reload: bool) -> bool {
    let options = LoadOptions::default();
    let loaded = if reload {
        Datasets::reload(&args.orders, &args.postcodes, &options)
    } else {
        Datasets::load(&args.orders, &args.postcodes, &options)
    };
    match loaded {
        Ok(data) => {
            let report = &data.orders.report;
            println!(
                "Processing dataset... ({} rows read, {} orders loaded, {} dropped)",
                format_int(report.total_rows),
                format_int(report.loaded_rows),
                format_int(report.dropped_rows())
            );
            println!(
                "Postcode reference: {} postcodes with coordinates",
                format_int(data.reference.index.len())
            );
            for w in report.warnings.iter().chain(&data.reference.report.warnings) {
                println!("Warning: {}", w);
            }
            println!();
            app_state().install(data);
            true
        }
        Err(e) => {
            error!("failed to load data: {}", e);
            eprintln!("Failed to load data: {}\n", e);
            false
        }
    }
}

fn handle_generate(args: &Args) {
    let (data, spec, view) = {
        let state = app_state();
        (state.data.clone(), state.spec.clone(), state.view)
    };
    let Some(data) = data else {
        println!("Error: No data loaded. Please load the files first (option 1).\n");
        return;
    };

    match evaluate(&data, &spec, &view) {
        Evaluation::NoResults { caption } => {
            println!("{}", caption);
            println!("No orders match the selected filters.\n");
        }
        Evaluation::Report(bundle) => {
            output::print_report(&bundle, view.top_n.max(1));
            if let Some(path) = &args.export_csv {
                match output::export_orders_csv(path, &bundle.filtered) {
                    Ok(()) => println!("(Filtered orders exported to {})", path.display()),
                    Err(e) => eprintln!("Write error: {}", e),
                }
            }
            if let Some(path) = &args.export_json {
                match output::write_json(path, &*bundle) {
                    Ok(()) => println!("(Report exported to {})", path.display()),
                    Err(e) => eprintln!("Write error: {}", e),
                }
            }
            println!();
        }
    }
}

fn handle_filters() {
    let mut state = app_state();
    let states = state.data.as_ref().map(Datasets::state_options).unwrap_or_default();
    if !states.is_empty() {
        println!("States: {}", states.join(", "));
    }
    let current_state = state.spec.state.clone().unwrap_or_else(|| ALL_STATES.to_string());
    let s = prompt(&format!("State [{}]: ", current_state));
    if !s.is_empty() {
        state.spec.state = Some(s);
    }

    let from = prompt("From date YYYY-MM-DD (blank = no date filter): ");
    state.dates_explicit = true;
    if from.is_empty() {
        state.spec.date_range = None;
    } else {
        let to = prompt("To date YYYY-MM-DD: ");
        let dates: Vec<NaiveDate> = [from, to]
            .iter()
            .filter_map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .collect();
        if dates.len() != 2 {
            println!("Incomplete date range; dates will not be filtered.");
        }
        state.spec.date_range = Some(dates);
    }

    let id = prompt("OrderID search (blank = none): ");
    state.spec.order_id = if id.is_empty() { None } else { Some(id) };
    state.view.page = 1;
    println!();
}

fn handle_page() {
    let mut state = app_state();
    let pages = page_count(state.filtered_total(), state.view.page_size);
    match prompt(&format!("Page (1-{}): ", pages.max(1))).parse::<usize>() {
        Ok(n) if n >= 1 => state.view.page = n,
        _ => println!("Invalid page number."),
    }
    println!();
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    {
        let mut state = app_state();
        let date_range = cli_date_range(&args);
        state.dates_explicit = date_range.is_some();
        state.spec = FilterSpec {
            state: Some(args.state.clone()),
            date_range,
            order_id: args.order_id.clone(),
        };
        state.view = ViewOptions { page: args.page, page_size: args.page_size, top_n: args.top };
    }

    if args.batch {
        if !handle_load(&args, false) {
            return Err("could not load input data".into());
        }
        handle_generate(&args);
        return Ok(());
    }

    println!("Australia Location Review\n");
    loop {
        println!("[1] Load the files");
        println!("[2] Generate Report");
        println!("[3] Set Filters");
        println!("[4] Change Page");
        println!("[5] Reload Data");
        println!("[0] Exit\n");
        match prompt("Enter choice: ").as_str() {
            "1" => {
                handle_load(&args, false);
            }
            "2" => {
                println!();
                handle_generate(&args);
            }
            "3" => handle_filters(),
            "4" => handle_page(),
            "5" => {
                handle_load(&args, true);
            }
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 0-5.\n"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use au_orders_report::reference::PostcodeIndex;
    use au_orders_report::Order;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn data(rows: &[(&str, &str, &str)]) -> Datasets {
        let orders = rows
            .iter()
            .map(|(id, date, state)| Order {
                order_id: id.to_string(),
                order_date: d(date),
                postal_code: "200".to_string(),
                state: state.to_string(),
            })
            .collect();
        Datasets::from_parts(orders, PostcodeIndex::new())
    }

    #[test]
    fn reload_extends_the_default_date_range() {
        let mut state = AppState::default();
        state.install(data(&[("AU001", "2024-01-15", "ACT"), ("AU006", "2024-04-15", "ACT")]));
        assert_eq!(state.spec.date_range, Some(vec![d("2024-01-15"), d("2024-04-15")]));

        state.install(data(&[
            ("AU001", "2024-01-15", "ACT"),
            ("AU006", "2024-04-15", "ACT"),
            ("AU007", "2024-05-01", "ACT"),
        ]));
        assert_eq!(state.spec.date_range, Some(vec![d("2024-01-15"), d("2024-05-01")]));
        assert_eq!(state.filtered_total(), 3);
    }

    #[test]
    fn chosen_dates_survive_a_reload() {
        let mut state = AppState { dates_explicit: true, ..Default::default() };
        state.spec.date_range = Some(vec![d("2024-02-01"), d("2024-03-31")]);
        state.install(data(&[("AU001", "2024-01-15", "ACT"), ("AU007", "2024-05-01", "ACT")]));
        assert_eq!(state.spec.date_range, Some(vec![d("2024-02-01"), d("2024-03-31")]));
    }

    #[test]
    fn page_total_counts_only_filtered_orders() {
        let mut state = AppState::default();
        assert_eq!(state.filtered_total(), 0);
        state.install(data(&[
            ("AU001", "2024-01-15", "ACT"),
            ("AU002", "2024-02-10", "NSW"),
            ("AU003", "2024-03-05", "ACT"),
        ]));
        state.spec.state = Some("ACT".to_string());
        assert_eq!(state.filtered_total(), 2);
        state.spec.state = Some("WA".to_string());
        assert_eq!(state.filtered_total(), 0);
    }
}
