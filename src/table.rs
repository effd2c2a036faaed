use crate::error::ReportError;
use csv::{ByteRecord, ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;

/// Header plus raw records of one CSV source, before any typing.
///
/// Records are kept as bytes so that a row with invalid UTF-8 fails on its
/// own when deserialized instead of failing the whole read.
#[derive(Debug, Clone)]
pub struct RawTable {
    headers: StringRecord,
    records: Vec<ByteRecord>,
}

impl RawTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReportError> {
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::Headers)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();
        let records = rdr.byte_records().collect::<Result<Vec<_>, _>>()?;
        Ok(RawTable { headers, records })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn parse_str(data: &str) -> Result<Self, ReportError> {
        Self::from_reader(data.as_bytes())
    }

    pub fn headers(&self) -> Vec<String> {
        self.headers.iter().map(str::to_string).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fail with a schema error naming every absent column.
    pub fn require_columns(&self, dataset: &'static str, required: &[&str]) -> Result<(), ReportError> {
        let missing: Vec<String> = required
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(ReportError::Schema { dataset, missing, available: self.headers() })
    }

    /// Deserialize every record by header name. Columns absent from the
    /// source come through as `None` on optional fields. A failed row's error
    /// carries its position, see [`row_line`].
    pub fn rows<T: DeserializeOwned>(&self) -> impl Iterator<Item = Result<T, csv::Error>> + '_ {
        let headers = self.headers.as_byte_record();
        self.records.iter().map(move |r| r.deserialize(Some(headers)))
    }
}

/// Source line of the row a CSV error came from, when known.
pub fn row_line(err: &csv::Error) -> Option<u64> {
    err.position().map(|p| p.line())
}
