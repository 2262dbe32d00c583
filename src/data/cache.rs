use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::debug;

use super::loader::{load_file, LoadError};
use super::model::CollisionTable;

// ---------------------------------------------------------------------------
// TableCache – one loaded table per requested row count
// ---------------------------------------------------------------------------

/// Process-lifetime cache of loaded tables, keyed by the row-count limit.
///
/// The source file is assumed static while the process runs, so a table is
/// built once per distinct `max_rows` and shared as an `Arc` afterwards.
/// The inner mutex is held across a build, which gives at most one
/// population at a time: a second thread asking for the same key blocks and
/// then takes the cached result instead of re-reading the source. Failed
/// loads are not cached; the next call retries.
pub struct TableCache {
    source: PathBuf,
    tables: Mutex<HashMap<usize, Arc<CollisionTable>>>,
}

impl TableCache {
    /// Create an empty cache reading from `source`.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            tables: Mutex::new(HashMap::new()),
        }
    }

    /// Path of the source file this cache reads.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Return the table for `max_rows`, loading it on first request.
    ///
    /// Repeated calls with the same `max_rows` return the same `Arc` without
    /// touching the source; distinct values cache independently.
    pub fn load(&self, max_rows: usize) -> Result<Arc<CollisionTable>, LoadError> {
        let mut tables = self.tables.lock().expect("table cache poisoned");

        if let Some(table) = tables.get(&max_rows) {
            debug!("cache hit for max_rows={max_rows}");
            return Ok(Arc::clone(table));
        }

        debug!("cache miss for max_rows={max_rows}, loading {}", self.source.display());
        let table = Arc::new(load_file(&self.source, max_rows)?);
        tables.insert(max_rows, Arc::clone(&table));
        Ok(table)
    }

    /// Number of distinct row-count keys currently cached.
    pub fn len(&self) -> usize {
        self.tables.lock().expect("table cache poisoned").len()
    }

    /// Whether nothing has been loaded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn sample_csv(rows: usize) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "CRASH_DATE,CRASH_TIME,LATITUDE,LONGITUDE,INJURED_PERSONS").unwrap();
        for i in 0..rows {
            writeln!(file, "03/26/2019,12:{:02},40.7,-73.9,{}", i % 60, i % 5).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn repeated_loads_share_one_table() {
        let file = sample_csv(20);
        let cache = TableCache::new(file.path());

        let first = cache.load(10).unwrap();
        let second = cache.load(10).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_row_counts_cache_independently() {
        let file = sample_csv(20);
        let cache = TableCache::new(file.path());

        let small = cache.load(5).unwrap();
        let large = cache.load(15).unwrap();

        assert_eq!(small.len(), 5);
        assert_eq!(large.len(), 15);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn cached_table_survives_source_deletion() {
        let file = sample_csv(5);
        let cache = TableCache::new(file.path());
        let table = cache.load(5).unwrap();
        assert_eq!(table.len(), 5);

        // Source goes away; the cached table must still be served.
        drop(file);
        let again = cache.load(5).unwrap();
        assert!(Arc::ptr_eq(&table, &again));

        // A new key has to read the source and fails.
        assert!(cache.load(3).is_err());
    }

    #[test]
    fn failed_loads_are_not_cached() {
        let cache = TableCache::new("/nonexistent/collisions.csv");
        assert!(cache.load(10).is_err());
        assert!(cache.is_empty());
    }
}
