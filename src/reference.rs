//! Postcode reference normalisation.
//!
//! The raw reference table can list several localities per postcode. For
//! mapping we keep exactly one row per postcode, the most accurate one, and
//! throw away anything without usable coordinates.

use crate::error::{ReportError, Warning};
use crate::table::{row_line, RawTable};
use crate::types::{PostcodeReference, RawPostcodeRow, POSTCODE_COLUMNS};
use crate::util::{clean_field, parse_f64_safe};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

pub type PostcodeIndex = HashMap<String, PostcodeReference>;

#[derive(Debug, Clone, Default)]
pub struct ReferenceReport {
    pub total_rows: usize,
    pub distinct_postcodes: usize,
    pub parse_errors: usize,
    pub missing_coordinates: usize,
    pub warnings: Vec<Warning>,
}

struct Candidate {
    row: RawPostcodeRow,
    accuracy: Option<f64>,
}

pub fn load_reference_from_path(path: impl AsRef<Path>) -> Result<(PostcodeIndex, ReferenceReport), ReportError> {
    let table = RawTable::from_path(path)?;
    load_reference(&table)
}

pub fn load_reference(table: &RawTable) -> Result<(PostcodeIndex, ReferenceReport), ReportError> {
    table.require_columns("postcodes", &POSTCODE_COLUMNS)?;

    let mut report = ReferenceReport { total_rows: table.len(), ..Default::default() };

    // Postcodes in first-seen order, each holding its current best row.
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, Candidate> = HashMap::new();
    let mut unreadable_line: Option<u64> = None;

    for result in table.rows::<RawPostcodeRow>() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("skipping unreadable postcode row: {}", e);
                report.parse_errors += 1;
                if unreadable_line.is_none() {
                    unreadable_line = row_line(&e);
                }
                continue;
            }
        };
        let Some(postcode) = clean_field(row.postcode.as_deref()).map(str::to_string) else {
            continue;
        };
        let accuracy = parse_f64_safe(row.accuracy.as_deref());
        match best.get_mut(&postcode) {
            Some(current) => {
                // Strictly greater, so ties keep the earlier row. `None`
                // sorts below every `Some`.
                if accuracy > current.accuracy {
                    *current = Candidate { row, accuracy };
                }
            }
            None => {
                order.push(postcode.clone());
                best.insert(postcode, Candidate { row, accuracy });
            }
        }
    }
    report.distinct_postcodes = order.len();

    if report.parse_errors > 0 {
        let w = Warning::UnreadableRows {
            dataset: "postcodes",
            dropped: report.parse_errors,
            example_line: unreadable_line,
        };
        warn!("{}", w);
        report.warnings.push(w);
    }

    let mut index = PostcodeIndex::with_capacity(order.len());
    let mut dropped_example: Option<String> = None;
    for postcode in order {
        let Some(Candidate { row, accuracy }) = best.remove(&postcode) else {
            continue;
        };
        let lat = parse_f64_safe(row.latitude.as_deref());
        let lon = parse_f64_safe(row.longitude.as_deref());
        let (Some(latitude), Some(longitude)) = (lat, lon) else {
            report.missing_coordinates += 1;
            if dropped_example.is_none() {
                dropped_example = Some(postcode);
            }
            continue;
        };
        let owned = |v: Option<String>| clean_field(v.as_deref()).unwrap_or_default().to_string();
        index.insert(
            postcode.clone(),
            PostcodeReference {
                postcode,
                place_name: owned(row.place_name),
                state_name: owned(row.state_name),
                state_code: owned(row.state_code),
                latitude,
                longitude,
                accuracy,
            },
        );
    }

    if report.missing_coordinates > 0 {
        let w = Warning::MissingCoordinates { dropped: report.missing_coordinates, example: dropped_example };
        warn!("{}", w);
        report.warnings.push(w);
    }
    debug!(rows = report.total_rows, postcodes = index.len(), "postcode reference normalised");
    Ok((index, report))
}
