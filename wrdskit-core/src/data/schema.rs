//! Column mapping between source tables and [`MembershipEvent`].
//!
//! Sources name the membership columns their own way (Compustat uses
//! `gvkey` / `from` / `thru`). Callers describe the mapping once with
//! [`MembershipColumns`] and validate the frame before resolving it.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::MembershipEvent;

/// Source column names for the three membership fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipColumns {
    pub entity_id: String,
    pub joined_date: String,
    pub left_date: String,
}

impl MembershipColumns {
    pub fn new(
        entity_id: impl Into<String>,
        joined_date: impl Into<String>,
        left_date: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            joined_date: joined_date.into(),
            left_date: left_date.into(),
        }
    }

    /// Compustat `idxcst_his` naming.
    pub fn compustat() -> Self {
        Self::new("gvkey", "from", "thru")
    }

    fn date_columns(&self) -> [&str; 2] {
        [self.joined_date.as_str(), self.left_date.as_str()]
    }

    /// Validate that `df` carries the membership columns with comparable types.
    ///
    /// The key must be a string. Dates must be `Date` or `Datetime`; an
    /// all-null column is accepted as well.
    pub fn validate(&self, df: &DataFrame) -> Result<(), SchemaError> {
        let schema = df.schema();

        let key_dtype = schema
            .get(self.entity_id.as_str())
            .ok_or_else(|| SchemaError::MissingColumn(self.entity_id.clone()))?;
        if key_dtype != &DataType::String {
            return Err(SchemaError::TypeMismatch {
                column: self.entity_id.clone(),
                expected: "String",
                actual: key_dtype.clone(),
            });
        }

        for name in self.date_columns() {
            let dtype = schema
                .get(name)
                .ok_or_else(|| SchemaError::MissingColumn(name.to_string()))?;
            if !matches!(dtype, DataType::Date | DataType::Datetime(_, _) | DataType::Null) {
                return Err(SchemaError::TypeMismatch {
                    column: name.to_string(),
                    expected: "Date",
                    actual: dtype.clone(),
                });
            }
        }

        Ok(())
    }

    /// Cast both date columns to `Date` so window literals compare cleanly.
    pub fn normalize(&self, lf: LazyFrame) -> LazyFrame {
        lf.with_columns(self.date_columns().map(|name| col(name).cast(DataType::Date)))
    }

    /// Read typed events out of a validated frame, in row order.
    pub fn events_from_frame(&self, df: &DataFrame) -> Result<Vec<MembershipEvent>, SchemaError> {
        self.validate(df)?;
        let frame_err = |e: PolarsError| SchemaError::Frame(e.to_string());

        let keys = df.column(self.entity_id.as_str()).map_err(frame_err)?;
        let key_ca = keys.str().map_err(frame_err)?;
        let joined = df
            .column(self.joined_date.as_str())
            .and_then(|c| c.cast(&DataType::Date))
            .map_err(frame_err)?;
        let left = df
            .column(self.left_date.as_str())
            .and_then(|c| c.cast(&DataType::Date))
            .map_err(frame_err)?;
        let joined_ca = joined.date().map_err(frame_err)?;
        let left_ca = left.date().map_err(frame_err)?;

        (0..df.height())
            .map(|row| -> Result<MembershipEvent, SchemaError> {
                let entity_id = key_ca
                    .get(row)
                    .ok_or(SchemaError::NullEntityId { row })?;
                Ok(MembershipEvent::new(
                    entity_id,
                    joined_ca.get(row).map(date_from_days),
                    left_ca.get(row).map(date_from_days),
                ))
            })
            .collect()
    }

    /// Build a three-column frame from typed events.
    pub fn events_to_frame(&self, events: &[MembershipEvent]) -> Result<DataFrame, SchemaError> {
        let frame_err = |e: PolarsError| SchemaError::Frame(e.to_string());
        let keys: Vec<&str> = events.iter().map(|e| e.entity_id.as_str()).collect();
        let joined: Vec<Option<i32>> = events
            .iter()
            .map(|e| e.joined_date.map(days_from_date))
            .collect();
        let left: Vec<Option<i32>> = events
            .iter()
            .map(|e| e.left_date.map(days_from_date))
            .collect();

        DataFrame::new(vec![
            Column::new(self.entity_id.as_str().into(), keys),
            Column::new(self.joined_date.as_str().into(), joined)
                .cast(&DataType::Date)
                .map_err(frame_err)?,
            Column::new(self.left_date.as_str().into(), left)
                .cast(&DataType::Date)
                .map_err(frame_err)?,
        ])
        .map_err(frame_err)
    }
}

impl Default for MembershipColumns {
    fn default() -> Self {
        Self::compustat()
    }
}

/// Polars stores `Date` as days since 1970-01-01.
fn date_from_days(days: i32) -> NaiveDate {
    NaiveDate::default() + chrono::Duration::days(days as i64)
}

fn days_from_date(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("type mismatch in column {column}: expected {expected}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        actual: DataType,
    },

    #[error("null entity key at row {row}")]
    NullEntityId { row: usize },

    #[error("frame error: {0}")]
    Frame(String),
}
