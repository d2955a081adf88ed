//! Fetch-once table cache.
//!
//! Each `library.table` is fetched from the source at most once; later
//! requests are served from memory. Frames are cheap to clone (columns are
//! reference counted), so callers get an owned `DataFrame`.

use super::provider::{SourceError, TableRef, TableSource};
use polars::prelude::DataFrame;
use std::collections::HashMap;

pub struct TableCache {
    source: Box<dyn TableSource>,
    tables: HashMap<TableRef, DataFrame>,
    fetches: usize,
}

impl TableCache {
    pub fn new(source: impl TableSource + 'static) -> Self {
        Self::from_boxed(Box::new(source))
    }

    pub fn from_boxed(source: Box<dyn TableSource>) -> Self {
        Self {
            source,
            tables: HashMap::new(),
            fetches: 0,
        }
    }

    /// Name of the underlying source.
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Get a table, fetching it on first use.
    ///
    /// A failed fetch is not cached; the next call tries the source again.
    pub fn get(&mut self, library: &str, table: &str) -> Result<DataFrame, SourceError> {
        let key = TableRef::new(library, table);
        if let Some(df) = self.tables.get(&key) {
            tracing::trace!(table = %key, "table cache hit");
            return Ok(df.clone());
        }

        self.fetches += 1;
        let df = self.source.fetch_table(library, table)?;
        tracing::info!(
            table = %key,
            source = self.source.name(),
            rows = df.height(),
            "fetched table"
        );
        self.tables.insert(key, df.clone());
        Ok(df)
    }

    pub fn is_cached(&self, library: &str, table: &str) -> bool {
        self.tables.contains_key(&TableRef::new(library, table))
    }

    /// Number of fetches issued to the source.
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }

    /// Drop every cached table.
    pub fn clear(&mut self) {
        self.tables.clear();
    }
}
