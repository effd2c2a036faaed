//! Process-wide cache of loaded datasets.
//!
//! Entries are keyed by the source path and remembered together with the
//! file's modification time and length when it was read. A lookup whose
//! file signature changed reloads; `invalidate` and `clear` drop entries
//! explicitly. Datasets are handed out as `Arc` snapshots, so a reload never
//! disturbs an evaluation still holding the previous one.

use crate::error::ReportError;
use crate::loader::{load_orders_from_path, LoadOptions, LoadReport};
use crate::reference::{load_reference_from_path, PostcodeIndex, ReferenceReport};
use crate::types::Order;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tracing::{debug, info};

#[derive(Debug)]
pub struct OrderDataset {
    pub source: PathBuf,
    pub orders: Vec<Order>,
    pub report: LoadReport,
}

#[derive(Debug)]
pub struct ReferenceDataset {
    pub source: PathBuf,
    pub index: PostcodeIndex,
    pub report: ReferenceReport,
}

/// What a source looked like when it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSignature {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl SourceSignature {
    pub fn of(path: &Path) -> Result<Self, ReportError> {
        let meta = std::fs::metadata(path)?;
        Ok(SourceSignature { modified: meta.modified().ok(), len: meta.len() })
    }
}

struct Entry<T> {
    signature: SourceSignature,
    data: Arc<T>,
}

#[derive(Default)]
pub struct DatasetCache {
    orders: HashMap<PathBuf, (Option<String>, Entry<OrderDataset>)>,
    reference: HashMap<PathBuf, Entry<ReferenceDataset>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&mut self, path: &Path, options: &LoadOptions) -> Result<Arc<OrderDataset>, ReportError> {
        let signature = SourceSignature::of(path)?;
        if let Some((prefix, entry)) = self.orders.get(path) {
            if entry.signature == signature && *prefix == options.expected_prefix {
                debug!(path = %path.display(), "orders cache hit");
                return Ok(Arc::clone(&entry.data));
            }
        }

        let (orders, report) = load_orders_from_path(path, options)?;
        info!(path = %path.display(), rows = orders.len(), "orders loaded");
        let data = Arc::new(OrderDataset { source: path.to_path_buf(), orders, report });
        self.orders.insert(
            path.to_path_buf(),
            (options.expected_prefix.clone(), Entry { signature, data: Arc::clone(&data) }),
        );
        Ok(data)
    }

    pub fn reference(&mut self, path: &Path) -> Result<Arc<ReferenceDataset>, ReportError> {
        let signature = SourceSignature::of(path)?;
        if let Some(entry) = self.reference.get(path) {
            if entry.signature == signature {
                debug!(path = %path.display(), "postcode cache hit");
                return Ok(Arc::clone(&entry.data));
            }
        }

        let (index, report) = load_reference_from_path(path)?;
        info!(path = %path.display(), postcodes = index.len(), "postcode reference loaded");
        let data = Arc::new(ReferenceDataset { source: path.to_path_buf(), index, report });
        self.reference.insert(path.to_path_buf(), Entry { signature, data: Arc::clone(&data) });
        Ok(data)
    }

    /// Forget anything cached for `path`. Returns whether an entry existed.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        let had_orders = self.orders.remove(path).is_some();
        let had_reference = self.reference.remove(path).is_some();
        had_orders || had_reference
    }

    pub fn clear(&mut self) {
        self.orders.clear();
        self.reference.clear();
    }

    pub fn len(&self) -> usize {
        self.orders.len() + self.reference.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static DATASET_CACHE: Lazy<Mutex<DatasetCache>> = Lazy::new(|| Mutex::new(DatasetCache::new()));

/// Lock the shared cache. A panic while it was held cannot leave an entry
/// half-written, so a poisoned lock is still usable.
pub fn global() -> MutexGuard<'static, DatasetCache> {
    DATASET_CACHE.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("au_orders_report_{}_{}.csv", name, std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn second_lookup_returns_the_same_snapshot() {
        let path = fixture("cache_hit", include_str!("../data/au_orders.csv"));
        let mut cache = DatasetCache::new();
        let first = cache.orders(&path, &LoadOptions::default()).unwrap();
        let second = cache.orders(&path, &LoadOptions::default()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.orders.len(), 6);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn changed_source_reloads_without_touching_old_snapshot() {
        let path = fixture("cache_reload", "OrderID,OrderDate,PostalCode,State\nAU001,2024-01-15,200,ACT\n");
        let mut cache = DatasetCache::new();
        let old = cache.orders(&path, &LoadOptions::default()).unwrap();

        fs::write(
            &path,
            "OrderID,OrderDate,PostalCode,State\nAU001,2024-01-15,200,ACT\nAU002,2024-02-10,221,ACT\n",
        )
        .unwrap();
        let new = cache.orders(&path, &LoadOptions::default()).unwrap();

        assert_eq!(old.orders.len(), 1);
        assert_eq!(new.orders.len(), 2);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn invalidate_forces_a_reload() {
        let path = fixture("cache_invalidate", include_str!("../data/au_postcodes.csv"));
        let mut cache = DatasetCache::new();
        let first = cache.reference(&path).unwrap();
        assert_eq!(first.index.len(), 4);
        assert_eq!(cache.len(), 1);

        assert!(cache.invalidate(&path));
        assert!(cache.is_empty());
        let second = cache.reference(&path).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));

        cache.clear();
        assert!(cache.is_empty());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_source_is_an_io_error() {
        let mut cache = DatasetCache::new();
        let err = cache.reference(Path::new("/nonexistent/au_postcodes.csv")).unwrap_err();
        assert!(matches!(err, ReportError::Io(_)));
    }
}
