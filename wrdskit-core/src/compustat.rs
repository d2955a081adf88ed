//! Compustat dataset builder.
//!
//! [`CompustatSession`] owns a [`TableCache`] over some [`TableSource`] and an
//! observation window. `build_sp500` resolves index constituents from
//! `compa.idxcst_his`; the `add_*` operations left-join identifiers and
//! classifiers from `compa.names` and `compa.company` onto the held dataset.
//!
//! Every operation on the dataset fails with [`DatasetError::NoDataset`]
//! until one has been built.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{MembershipColumns, SchemaError, SourceError, TableCache, TableSource};
use crate::domain::ObservationWindow;
use crate::industry::{ClassificationSystem, ClassifierGroup};
use crate::resolver::{self, DuplicatePolicy, ResolveError};

pub const LIBRARY: &str = "compa";
pub const INDEX_CONSTITUENTS: &str = "idxcst_his";
pub const NAMES: &str = "names";
pub const COMPANY: &str = "company";

/// Global index key of the S&P 500 in `idxcst_his.gvkeyx`.
pub const SP500_INDEX_KEY: &str = "000003";

const KEY: &str = "gvkey";
const INDEX_KEY_COLUMN: &str = "gvkeyx";

/// How `build_sp500` shapes its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sp500Options {
    /// `gvkeyx` value selecting the index.
    pub index_key: String,
    /// Rename `from`/`thru` to `joined_sp500`/`left_sp500` when columns are kept.
    pub rename_columns: bool,
    /// Keep only the `gvkey` column.
    pub drop_uninformative: bool,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for Sp500Options {
    fn default() -> Self {
        Self {
            index_key: SP500_INDEX_KEY.to_string(),
            rename_columns: true,
            drop_uninformative: true,
            duplicate_policy: DuplicatePolicy::KeepLast,
        }
    }
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("no dataset downloaded yet: build one with build_sp500 first")]
    NoDataset,

    #[error("table {table} has no column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("frame error: {0}")]
    Frame(#[from] PolarsError),
}

fn require_columns(df: &DataFrame, table: &str, columns: &[&str]) -> Result<(), DatasetError> {
    match columns.iter().find(|name| df.column(name).is_err()) {
        Some(missing) => Err(DatasetError::MissingColumn {
            table: format!("{LIBRARY}.{table}"),
            column: missing.to_string(),
        }),
        None => Ok(()),
    }
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// A dataset under construction plus the tables it draws from.
pub struct CompustatSession {
    tables: TableCache,
    window: ObservationWindow,
    dataset: Option<DataFrame>,
}

impl CompustatSession {
    pub fn new(source: impl TableSource + 'static, window: ObservationWindow) -> Self {
        Self::with_cache(TableCache::new(source), window)
    }

    pub fn with_cache(tables: TableCache, window: ObservationWindow) -> Self {
        Self {
            tables,
            window,
            dataset: None,
        }
    }

    /// Set the observation period used by the next build.
    pub fn set_observation_period(&mut self, window: ObservationWindow) {
        self.window = window;
    }

    pub fn tables(&self) -> &TableCache {
        &self.tables
    }

    pub fn has_dataset(&self) -> bool {
        self.dataset.is_some()
    }

    /// The dataset built so far.
    pub fn dataset(&self) -> Result<&DataFrame, DatasetError> {
        self.dataset.as_ref().ok_or(DatasetError::NoDataset)
    }

    pub fn into_dataset(self) -> Result<DataFrame, DatasetError> {
        self.dataset.ok_or(DatasetError::NoDataset)
    }

    /// First `n` rows of the dataset.
    pub fn head(&self, n: usize) -> Result<DataFrame, DatasetError> {
        Ok(self.dataset()?.head(Some(n)))
    }

    /// Build the index constituent list for the current observation period.
    ///
    /// Constituents that left the index before the period or joined after it
    /// are dropped; entities that left and rejoined keep their last spell.
    pub fn build_sp500(&mut self, options: &Sp500Options) -> Result<&DataFrame, DatasetError> {
        let constituents = self.tables.get(LIBRARY, INDEX_CONSTITUENTS)?;
        require_columns(&constituents, INDEX_CONSTITUENTS, &[INDEX_KEY_COLUMN])?;

        let cols = MembershipColumns::compustat();
        let raw = constituents
            .lazy()
            .filter(col(INDEX_KEY_COLUMN).eq(lit(options.index_key.as_str())))
            .collect()?;
        cols.validate(&raw)?;
        let raw_rows = raw.height();

        if options.duplicate_policy == DuplicatePolicy::RejectDivergent {
            let events = cols.events_from_frame(&raw)?;
            resolver::resolve_with(&events, &self.window, options.duplicate_policy)?;
        }

        let resolved = resolver::resolve_frame(cols.normalize(raw.lazy()), &self.window, &cols);
        let shaped = if options.drop_uninformative {
            resolved.select([col(KEY)])
        } else if options.rename_columns {
            resolved.rename(["from", "thru"], ["joined_sp500", "left_sp500"], true)
        } else {
            resolved
        };
        let dataset = shaped.collect()?;

        tracing::info!(
            index_key = %options.index_key,
            window = %self.window,
            raw_rows,
            constituents = dataset.height(),
            "built index constituent list"
        );
        Ok(self.dataset.insert(dataset))
    }

    /// Left-join `(source, target)` columns of a lookup table onto the dataset.
    ///
    /// Target columns already present are skipped; if all are present the
    /// table is not fetched.
    fn join_lookup(
        &mut self,
        table: &str,
        columns: &[(&str, &str)],
        as_text: bool,
    ) -> Result<(), DatasetError> {
        let dataset = self.dataset()?.clone();
        let wanted: Vec<&(&str, &str)> = columns
            .iter()
            .filter(|(_, target)| !has_column(&dataset, target))
            .collect();
        if wanted.is_empty() {
            return Ok(());
        }

        let lookup = self.tables.get(LIBRARY, table)?;
        let mut required = vec![KEY];
        required.extend(wanted.iter().map(|(source, _)| *source));
        require_columns(&lookup, table, &required)?;

        let mut projection = vec![col(KEY)];
        projection.extend(wanted.iter().map(|(source, target)| {
            let column = col(*source);
            let column = if as_text { column.cast(DataType::String) } else { column };
            column.alias(*target)
        }));

        let joined = dataset
            .lazy()
            .join(
                lookup.lazy().select(projection),
                [col(KEY)],
                [col(KEY)],
                JoinArgs::new(JoinType::Left),
            )
            .collect()?;
        self.dataset = Some(joined);
        Ok(())
    }

    /// Company name (`conm`) as `name`.
    pub fn add_names(&mut self) -> Result<(), DatasetError> {
        self.join_lookup(NAMES, &[("conm", "name")], false)
    }

    /// Company names for any frame with a `gvkey` column. Does not touch the
    /// session dataset.
    pub fn names_for(&mut self, frame: DataFrame) -> Result<DataFrame, DatasetError> {
        if !has_column(&frame, KEY) {
            return Err(DatasetError::MissingColumn {
                table: "input frame".into(),
                column: KEY.into(),
            });
        }
        let names = self.tables.get(LIBRARY, NAMES)?;
        require_columns(&names, NAMES, &[KEY, "conm"])?;
        Ok(frame
            .lazy()
            .join(
                names.lazy().select([col(KEY), col("conm").alias("name")]),
                [col(KEY)],
                [col(KEY)],
                JoinArgs::new(JoinType::Left),
            )
            .collect()?)
    }

    /// Ticker symbol (`tic`) as `ticker`.
    pub fn add_ticker(&mut self) -> Result<(), DatasetError> {
        self.join_lookup(NAMES, &[("tic", "ticker")], false)
    }

    pub fn add_cusip(&mut self) -> Result<(), DatasetError> {
        self.join_lookup(NAMES, &[("cusip", "cusip")], false)
    }

    /// SEC Central Index Key (`cik`) as `CIK`.
    pub fn add_cik(&mut self) -> Result<(), DatasetError> {
        self.join_lookup(NAMES, &[("cik", "CIK")], false)
    }

    /// Exit year: `year2` is the last year with accounting data, so the
    /// company exited the year after.
    pub fn add_exit_year(&mut self) -> Result<(), DatasetError> {
        if has_column(self.dataset()?, "exit_year") {
            return Ok(());
        }
        self.join_lookup(NAMES, &[("year2", "exit_year")], false)?;
        let dataset = self.dataset()?.clone();
        let shifted = dataset
            .lazy()
            .with_column((col("exit_year") + lit(1)).alias("exit_year"))
            .collect()?;
        self.dataset = Some(shifted);
        Ok(())
    }

    /// IPO date (or date of the merger that listed the company) as `ipo_date`.
    pub fn add_ipo_date(&mut self) -> Result<(), DatasetError> {
        self.join_lookup(COMPANY, &[("ipodate", "ipo_date")], false)
    }

    /// Add SIC and NAICS codes, plus GICS and S&P classifiers on request.
    ///
    /// Codes are stored as text. Groups already on the dataset are left as is.
    pub fn add_industry_classifiers(&mut self, gics: bool, sp: bool) -> Result<(), DatasetError> {
        self.add_classifier_group(ClassifierGroup::SicNaics)?;
        if gics {
            self.add_classifier_group(ClassifierGroup::Gics)?;
        }
        if sp {
            self.add_classifier_group(ClassifierGroup::Sp)?;
        }
        Ok(())
    }

    fn add_classifier_group(&mut self, group: ClassifierGroup) -> Result<(), DatasetError> {
        let table = match group {
            ClassifierGroup::SicNaics => NAMES,
            ClassifierGroup::Gics | ClassifierGroup::Sp => COMPANY,
        };
        self.join_lookup(table, group.columns(), true)
    }

    /// Keep only companies whose `system` code is one of `codes`.
    ///
    /// The classifier group is joined first if the dataset lacks it.
    pub fn filter_by_industry<S: AsRef<str>>(
        &mut self,
        codes: &[S],
        system: ClassificationSystem,
    ) -> Result<(), DatasetError> {
        let column = system.column();
        if !has_column(self.dataset()?, column) {
            tracing::info!(group = ?system.group(), "adding industry classifiers for filtering");
            self.add_classifier_group(system.group())?;
        }

        let predicate = codes
            .iter()
            .map(|code| col(column).eq(lit(code.as_ref().to_string())))
            .reduce(|acc, expr| acc.or(expr))
            .unwrap_or_else(|| lit(false));

        let dataset = self.dataset()?.clone();
        let before = dataset.height();
        let filtered = dataset.lazy().filter(predicate).collect()?;
        tracing::info!(%system, before, after = filtered.height(), "filtered by industry");
        self.dataset = Some(filtered);
        Ok(())
    }
}
