//! File-backed table source.
//!
//! Layout: `{root}/{library}/{table}.parquet`, or `{table}.csv` when no
//! Parquet file exists.
//!
//! Parquet files carry their own types. CSV files are read with every column
//! as a string so identifiers such as `gvkey = "000003"` keep their leading
//! zeros; configured date and integer columns are then typed explicitly.

use super::provider::{SourceError, TableRef, TableSource};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reads exported library tables from a directory tree.
pub struct FileTableSource {
    root: PathBuf,
    date_columns: Vec<String>,
    integer_columns: Vec<String>,
}

impl FileTableSource {
    /// Source with the Compustat column typing (`from`, `thru`, `ipodate`
    /// as dates, `year1`, `year2` as integers).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            date_columns: ["from", "thru", "ipodate"].map(String::from).to_vec(),
            integer_columns: ["year1", "year2"].map(String::from).to_vec(),
        }
    }

    fn table_path(&self, library: &str, table: &str, ext: &str) -> PathBuf {
        self.root.join(library).join(format!("{table}.{ext}"))
    }

    fn read_parquet(path: &Path, table: &TableRef) -> Result<DataFrame, SourceError> {
        let file = fs::File::open(path).map_err(|e| SourceError::Io(format!("open: {e}")))?;
        ParquetReader::new(file).finish().map_err(|e| SourceError::Read {
            table: table.to_string(),
            reason: e.to_string(),
        })
    }

    fn read_csv(&self, path: &Path, table: &TableRef) -> Result<DataFrame, SourceError> {
        let read_err = |e: PolarsError| SourceError::Read {
            table: table.to_string(),
            reason: e.to_string(),
        };

        let raw = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()
            .and_then(|lf| lf.collect())
            .map_err(read_err)?;

        let present = |name: &&String| raw.column(name.as_str()).is_ok();
        let mut typed: Vec<Expr> = self
            .date_columns
            .iter()
            .filter(present)
            .map(|name| {
                col(name.as_str()).str().to_date(StrptimeOptions {
                    format: Some(DATE_FORMAT.into()),
                    ..Default::default()
                })
            })
            .collect();
        typed.extend(
            self.integer_columns
                .iter()
                .filter(present)
                .map(|name| col(name.as_str()).cast(DataType::Int64)),
        );

        if typed.is_empty() {
            return Ok(raw);
        }
        raw.lazy().with_columns(typed).collect().map_err(read_err)
    }
}

impl TableSource for FileTableSource {
    fn name(&self) -> &str {
        "files"
    }

    fn fetch_table(&self, library: &str, table: &str) -> Result<DataFrame, SourceError> {
        let table_ref = TableRef::new(library, table);

        let parquet = self.table_path(library, table, "parquet");
        if parquet.exists() {
            tracing::debug!(table = %table_ref, path = %parquet.display(), "reading parquet table");
            return Self::read_parquet(&parquet, &table_ref);
        }

        let csv = self.table_path(library, table, "csv");
        if csv.exists() {
            tracing::debug!(table = %table_ref, path = %csv.display(), "reading csv table");
            return self.read_csv(&csv, &table_ref);
        }

        Err(SourceError::TableNotFound {
            library: library.to_string(),
            table: table.to_string(),
        })
    }

    fn list_tables(&self) -> Result<Vec<TableRef>, SourceError> {
        let mut refs = Vec::new();
        let libraries =
            fs::read_dir(&self.root).map_err(|e| SourceError::Io(format!("read dir: {e}")))?;

        for library in libraries {
            let library = library.map_err(|e| SourceError::Io(format!("dir entry: {e}")))?;
            if !library.path().is_dir() {
                continue;
            }
            let library_name = library.file_name().to_string_lossy().to_string();

            let tables = fs::read_dir(library.path())
                .map_err(|e| SourceError::Io(format!("read dir: {e}")))?;
            for entry in tables {
                let path = entry
                    .map_err(|e| SourceError::Io(format!("dir entry: {e}")))?
                    .path();
                let ext = path.extension().and_then(|e| e.to_str());
                if !matches!(ext, Some("parquet") | Some("csv")) {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    refs.push(TableRef::new(library_name.as_str(), stem));
                }
            }
        }

        refs.sort();
        refs.dedup();
        Ok(refs)
    }
}
