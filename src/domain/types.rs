//! Shared domain types.
//!
//! These are the vocabulary of the pipeline: which sources exist, how regions
//! and years are represented, the chosen window, and the run configuration.

use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Calendar year of an observation.
pub type Year = i32;

/// Column holding the normalized region name in every regional table.
pub const REGION_COL: &str = "parish";
/// Column holding the observation year in every table.
pub const YEAR_COL: &str = "year";

/// Number of consecutive years in a panel window.
pub const WINDOW_YEARS: usize = 5;

/// The five raw sources, in the fixed order used for loading and merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Income,
    School,
    Crime,
    HomeValues,
    MortgageRates,
}

impl SourceKind {
    /// Region-keyed sources, in merge order.
    pub const REGIONAL: [SourceKind; 4] = [
        SourceKind::Income,
        SourceKind::School,
        SourceKind::Crime,
        SourceKind::HomeValues,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Income => "income",
            SourceKind::School => "school",
            SourceKind::Crime => "crime",
            SourceKind::HomeValues => "home_values",
            SourceKind::MortgageRates => "mortgage_rates",
        }
    }

    /// Whether the source is keyed by `(parish, year)` rather than `year` alone.
    pub fn is_regional(self) -> bool {
        !matches!(self, SourceKind::MortgageRates)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A normalized parish name, e.g. `"East Baton Rouge Parish"`.
///
/// Only `sources::normalize::normalize_region` builds these, so two sources
/// naming the same parish always produce equal values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Region(String);

impl Region {
    pub(crate) fn from_normalized(name: String) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// District performance letter grade from the school ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    /// Parse a grade cell such as `"B"`, `" a "` or `"C+"`.
    ///
    /// Placeholders (`nan`, `NR`, empty) yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let mut chars = trimmed.chars();
        let first = chars.next()?;
        if !chars.all(|c| c == '+' || c == '-') {
            return None;
        }
        match first.to_ascii_uppercase() {
            'A' => Some(LetterGrade::A),
            'B' => Some(LetterGrade::B),
            'C' => Some(LetterGrade::C),
            'D' => Some(LetterGrade::D),
            'F' => Some(LetterGrade::F),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        }
    }
}

/// How a window was obtained from the common years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    /// Five consecutive years with no gaps.
    Contiguous,
    /// No contiguous span existed; the last five common years were used and
    /// the range contains gaps.
    Fallback,
}

/// Inclusive year range selected for the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearWindow {
    pub start: Year,
    pub end: Year,
    pub kind: WindowKind,
}

impl YearWindow {
    pub fn bounds(&self) -> (Year, Year) {
        (self.start, self.end)
    }
}

impl fmt::Display for YearWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)?;
        if self.kind == WindowKind::Fallback {
            f.write_str(" (fallback, not contiguous)")?;
        }
        Ok(())
    }
}

/// Where the annual mortgage rate series comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    /// The `Home Mortgage Rates` workbook under the data directory.
    Workbook,
    /// The `MORTGAGE30US` series from the FRED API (needs `FRED_API_KEY`).
    Fred,
}

/// File locations of the five raw sources.
#[derive(Debug, Clone)]
pub struct DataLayout {
    /// Directory of `<year>.csv` median household income files.
    pub income_dir: PathBuf,
    /// Directory of `<year>.xlsx` school rating files.
    pub school_dir: PathBuf,
    pub crime_file: PathBuf,
    pub home_values_file: PathBuf,
    pub mortgage_rates_file: PathBuf,
}

impl DataLayout {
    /// Default file names under a data directory.
    pub fn under(data_dir: &Path) -> Self {
        Self {
            income_dir: data_dir.join("Median Household Income"),
            school_dir: data_dir.join("School Data Year"),
            crime_file: data_dir.join("Crime Data Month Year.csv"),
            home_values_file: data_dir.join("Home Values Month Year.csv"),
            mortgage_rates_file: data_dir.join("Home Mortgage Rates.xlsx"),
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// Derived from CLI flags (plus `.env` and defaults).
#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub layout: DataLayout,
    /// First and last year of the per-year income files (inclusive).
    pub income_years: (Year, Year),
    pub rate_source: RateSource,
}

impl PanelConfig {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            layout: DataLayout::under(data_dir),
            income_years: (2014, 2023),
            rate_source: RateSource::Workbook,
        }
    }
}
