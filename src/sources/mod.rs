//! Per-source loaders.
//!
//! Each loader reads one raw source, normalizes region and year labels,
//! reduces to annual granularity and returns a `LoadedSource` whose frame has
//! `parish` + `year` columns (or just `year` for mortgage rates).

pub mod crime;
pub mod home_values;
pub mod income;
pub mod mortgage;
pub mod normalize;
pub mod school;

pub use crime::load_crime_annual;
pub use home_values::load_home_values_annual;
pub use income::load_median_income;
pub use mortgage::{load_mortgage_rates_annual, load_mortgage_rates_from_fred};
pub use normalize::{normalize_region, year_from_period_label};
pub use school::load_school_ratings;

use crate::data::fred::FredClient;
use polars::prelude::DataFrame;

use crate::domain::{PanelConfig, RateSource, SourceKind};
use crate::error::PanelError;
use crate::io::ingest::LoadedSource;

/// All five sources, loaded.
#[derive(Debug, Clone)]
pub struct LoadedSources {
    /// Region-keyed sources in merge order: income, school, crime, home values.
    pub regional: Vec<LoadedSource>,
    pub rates: LoadedSource,
}

impl LoadedSources {
    /// Every source: the regional ones, then the rates.
    pub fn iter(&self) -> impl Iterator<Item = &LoadedSource> {
        self.regional.iter().chain(std::iter::once(&self.rates))
    }

    pub fn frames(&self) -> impl Iterator<Item = &DataFrame> {
        self.iter().map(|s| &s.frame)
    }

    pub fn regional_frames(&self) -> Vec<&DataFrame> {
        self.regional.iter().map(|s| &s.frame).collect()
    }
}

/// Load every source, stopping at the first failure.
pub fn load_sources(config: &PanelConfig) -> Result<LoadedSources, PanelError> {
    let regional = SourceKind::REGIONAL
        .iter()
        .map(|&kind| load_source(kind, config))
        .collect::<Result<Vec<_>, _>>()?;
    let rates = load_source(SourceKind::MortgageRates, config)?;

    let sources = LoadedSources { regional, rates };
    for source in sources.iter() {
        source.log_summary();
    }
    Ok(sources)
}

/// Load a single source as configured.
pub fn load_source(kind: SourceKind, config: &PanelConfig) -> Result<LoadedSource, PanelError> {
    let layout = &config.layout;
    match kind {
        SourceKind::Income => load_median_income(layout, config.income_years),
        SourceKind::School => load_school_ratings(layout),
        SourceKind::Crime => load_crime_annual(&layout.crime_file),
        SourceKind::HomeValues => load_home_values_annual(&layout.home_values_file),
        SourceKind::MortgageRates => match config.rate_source {
            RateSource::Workbook => load_mortgage_rates_annual(&layout.mortgage_rates_file),
            RateSource::Fred => load_mortgage_rates_from_fred(&FredClient::from_env()?),
        },
    }
}
