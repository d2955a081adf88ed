//! Table source trait and structured error types.
//!
//! The TableSource trait abstracts over where library tables come from (a
//! directory of exported Parquet/CSV files, tables held in memory) so the
//! dataset builders never know about connections or credentials.

use polars::prelude::DataFrame;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// A `library.table` pair, e.g. `compa.idxcst_his`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableRef {
    pub library: String,
    pub table: String,
}

impl TableRef {
    pub fn new(library: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.library, self.table)
    }
}

/// Structured error types for table fetches.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("table not found: {library}.{table}")]
    TableNotFound { library: String, table: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("failed to read {table}: {reason}")]
    Read { table: String, reason: String },
}

/// Trait for table sources.
///
/// Implementations handle the specifics of one backing store. Caching sits
/// above this trait in [`super::cache::TableCache`].
pub trait TableSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch a whole table.
    fn fetch_table(&self, library: &str, table: &str) -> Result<DataFrame, SourceError>;

    /// Tables this source can serve, sorted.
    fn list_tables(&self) -> Result<Vec<TableRef>, SourceError>;
}

impl<T: TableSource + ?Sized> TableSource for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_table(&self, library: &str, table: &str) -> Result<DataFrame, SourceError> {
        (**self).fetch_table(library, table)
    }

    fn list_tables(&self) -> Result<Vec<TableRef>, SourceError> {
        (**self).list_tables()
    }
}

/// Tables registered in memory. Counts fetches so callers can check caching.
#[derive(Debug, Default)]
pub struct MemoryTableSource {
    tables: HashMap<TableRef, DataFrame>,
    fetches: AtomicUsize,
}

impl MemoryTableSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a table.
    pub fn with_table(mut self, library: &str, table: &str, df: DataFrame) -> Self {
        self.insert(library, table, df);
        self
    }

    pub fn insert(&mut self, library: &str, table: &str, df: DataFrame) {
        self.tables.insert(TableRef::new(library, table), df);
    }

    /// Number of successful and failed fetches so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl TableSource for MemoryTableSource {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch_table(&self, library: &str, table: &str) -> Result<DataFrame, SourceError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.tables
            .get(&TableRef::new(library, table))
            .cloned()
            .ok_or_else(|| SourceError::TableNotFound {
                library: library.to_string(),
                table: table.to_string(),
            })
    }

    fn list_tables(&self) -> Result<Vec<TableRef>, SourceError> {
        let mut refs: Vec<TableRef> = self.tables.keys().cloned().collect();
        refs.sort();
        Ok(refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn memory_source_serves_registered_tables() {
        let source = MemoryTableSource::new()
            .with_table("compa", "names", df!("gvkey" => &["001078"]).unwrap());

        let df = source.fetch_table("compa", "names").unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(source.fetch_count(), 1);
    }

    #[test]
    fn memory_source_missing_table() {
        let source = MemoryTableSource::new();
        match source.fetch_table("compa", "company") {
            Err(SourceError::TableNotFound { library, table }) => {
                assert_eq!(library, "compa");
                assert_eq!(table, "company");
            }
            other => panic!("expected TableNotFound, got: {other:?}"),
        }
    }

    #[test]
    fn list_is_sorted() {
        let empty = DataFrame::empty();
        let source = MemoryTableSource::new()
            .with_table("compa", "names", empty.clone())
            .with_table("compa", "company", empty);
        let names: Vec<String> = source
            .list_tables()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, vec!["compa.company", "compa.names"]);
    }

    #[test]
    fn shared_source_delegates() {
        let source = Arc::new(MemoryTableSource::new());
        let shared: Arc<MemoryTableSource> = Arc::clone(&source);
        assert_eq!(shared.name(), "memory");
        let _ = shared.fetch_table("compa", "names");
        assert_eq!(source.fetch_count(), 1);
    }
}
