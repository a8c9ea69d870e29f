//! Shared "panel pipeline" logic used by every CLI command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load sources -> year sets -> common years -> window -> filter + merge
//!
//! The command handlers can then focus on presentation (printing vs exports).

use std::sync::OnceLock;

use polars::prelude::DataFrame;

use crate::align::{assemble_panel, choose_five_year_window, common_years, year_set};
use crate::domain::{PanelConfig, REGION_COL, SourceKind, Year, YearWindow};
use crate::error::PanelError;
use crate::io::ingest::LoadedSource;
use crate::sources::{LoadedSources, load_sources};

/// What one source contributed, for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCoverage {
    pub kind: SourceKind,
    pub files: usize,
    pub rows_read: usize,
    /// Annual rows after normalization and aggregation.
    pub rows: usize,
    /// Distinct parishes; `None` for the year-only rate series.
    pub regions: Option<usize>,
    pub issues: usize,
    pub years: Vec<Year>,
}

impl SourceCoverage {
    pub fn from_loaded(source: &LoadedSource) -> Result<Self, PanelError> {
        let years = year_set(&source.frame)?.into_iter().collect();
        let regions = if source.kind.is_regional() {
            let parishes = source
                .frame
                .column(REGION_COL)
                .map_err(|e| PanelError::frame(source.kind.label(), e))?;
            let distinct = parishes
                .as_materialized_series()
                .n_unique()
                .map_err(|e| PanelError::frame(source.kind.label(), e))?;
            Some(distinct)
        } else {
            None
        };
        Ok(Self {
            kind: source.kind,
            files: source.files.len(),
            rows_read: source.rows_read,
            rows: source.frame.height(),
            regions,
            issues: source.issues.len(),
            years,
        })
    }
}

/// All computed outputs of a single panel build.
#[derive(Debug, Clone)]
pub struct PanelBuild {
    pub panel: DataFrame,
    pub window: YearWindow,
    pub common_years: Vec<Year>,
    /// One entry per source: the regional ones in merge order, then the rates.
    pub coverage: Vec<SourceCoverage>,
}

impl PanelBuild {
    pub fn bounds(&self) -> (Year, Year) {
        self.window.bounds()
    }

    /// `(panel, start_year, end_year)`.
    pub fn into_parts(self) -> (DataFrame, Year, Year) {
        let (start, end) = self.window.bounds();
        (self.panel, start, end)
    }
}

/// Year availability across sources, without merging anything.
#[derive(Debug, Clone)]
pub struct YearSurvey {
    pub coverage: Vec<SourceCoverage>,
    pub common_years: Vec<Year>,
}

/// Load every source and build the five-year panel.
pub fn build_five_year_panel(config: &PanelConfig) -> Result<PanelBuild, PanelError> {
    let sources = load_sources(config)?;
    build_from_sources(&sources)
}

/// Build the panel from already loaded sources.
pub fn build_from_sources(sources: &LoadedSources) -> Result<PanelBuild, PanelError> {
    let survey = survey_sources(sources)?;

    let window = choose_five_year_window(&survey.common_years)?;
    log::info!("selected window: {window}");

    let panel = assemble_panel(&sources.regional_frames(), &sources.rates.frame, &window)?;
    log::info!(
        "panel: {} rows x {} columns ({})",
        panel.height(),
        panel.width(),
        window
    );
    if panel.height() == 0 {
        log::warn!("no parish has complete data in {window}; the panel is empty");
    }

    Ok(PanelBuild {
        panel,
        window,
        common_years: survey.common_years,
        coverage: survey.coverage,
    })
}

/// Load every source and report year availability.
pub fn survey_years(config: &PanelConfig) -> Result<YearSurvey, PanelError> {
    let sources = load_sources(config)?;
    survey_sources(&sources)
}

fn survey_sources(sources: &LoadedSources) -> Result<YearSurvey, PanelError> {
    let coverage = sources
        .iter()
        .map(SourceCoverage::from_loaded)
        .collect::<Result<Vec<_>, _>>()?;

    let common = common_years(sources.frames())?;
    log::info!("common years across {} sources: {:?}", coverage.len(), common);

    Ok(YearSurvey {
        coverage,
        common_years: common,
    })
}

static PANEL: OnceLock<PanelBuild> = OnceLock::new();

/// Build the panel once per process and hand out the shared result.
///
/// Only the first successful call's `config` is used; later calls return the
/// stored build. A failed build is not stored, so a later call tries again.
pub fn init_panel(config: &PanelConfig) -> Result<&'static PanelBuild, PanelError> {
    if let Some(build) = PANEL.get() {
        return Ok(build);
    }
    let build = build_five_year_panel(config)?;
    Ok(PANEL.get_or_init(|| build))
}
