//! Industry classification systems available for Compustat companies.
//!
//! Classifiers come in three groups, each joined from one source table:
//! - SIC and NAICS from `compa.names`
//! - GICS group / industry / sector / sub-industry from `compa.company`
//! - S&P industry and sector codes from `compa.company`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Groups of classifiers that are added to a dataset together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassifierGroup {
    SicNaics,
    Gics,
    Sp,
}

impl ClassifierGroup {
    /// `(source column, dataset column)` pairs for this group.
    pub fn columns(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            ClassifierGroup::SicNaics => &[("sic", "SIC"), ("naics", "NAICS")],
            ClassifierGroup::Gics => &[
                ("ggroup", "GICS_group"),
                ("gind", "GICS_industry"),
                ("gsector", "GICS_sector"),
                ("gsubind", "GICS_subindustry"),
            ],
            ClassifierGroup::Sp => &[("spcindcd", "SP_industry"), ("spcseccd", "SP_sector")],
        }
    }
}

/// A single classification column a dataset can be filtered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassificationSystem {
    Sic,
    Naics,
    GicsGroup,
    GicsIndustry,
    GicsSector,
    GicsSubindustry,
    SpIndustry,
    SpSector,
}

impl ClassificationSystem {
    pub const ALL: [ClassificationSystem; 8] = [
        ClassificationSystem::Sic,
        ClassificationSystem::Naics,
        ClassificationSystem::GicsGroup,
        ClassificationSystem::GicsIndustry,
        ClassificationSystem::GicsSector,
        ClassificationSystem::GicsSubindustry,
        ClassificationSystem::SpIndustry,
        ClassificationSystem::SpSector,
    ];

    /// Column name in the dataset.
    pub fn column(&self) -> &'static str {
        match self {
            ClassificationSystem::Sic => "SIC",
            ClassificationSystem::Naics => "NAICS",
            ClassificationSystem::GicsGroup => "GICS_group",
            ClassificationSystem::GicsIndustry => "GICS_industry",
            ClassificationSystem::GicsSector => "GICS_sector",
            ClassificationSystem::GicsSubindustry => "GICS_subindustry",
            ClassificationSystem::SpIndustry => "SP_industry",
            ClassificationSystem::SpSector => "SP_sector",
        }
    }

    pub fn group(&self) -> ClassifierGroup {
        match self {
            ClassificationSystem::Sic | ClassificationSystem::Naics => ClassifierGroup::SicNaics,
            ClassificationSystem::GicsGroup
            | ClassificationSystem::GicsIndustry
            | ClassificationSystem::GicsSector
            | ClassificationSystem::GicsSubindustry => ClassifierGroup::Gics,
            ClassificationSystem::SpIndustry | ClassificationSystem::SpSector => {
                ClassifierGroup::Sp
            }
        }
    }
}

impl fmt::Display for ClassificationSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for ClassificationSystem {
    type Err = String;

    /// Accepts dataset column names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|system| system.column().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|s| s.column()).collect();
                format!("unknown classification system '{s}'. Valid: {}", valid.join(", "))
            })
    }
}
