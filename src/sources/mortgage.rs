//! Mortgage rates: a dated rate series collapsed to annual means.
//!
//! The series comes either from the FRED export workbook or straight from
//! the FRED API. Either way the output has no region column.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use crate::data::fred::{FredClient, FRED_ORIGIN, MORTGAGE_SERIES};
use crate::domain::frame::{Reduce, reduce_by};
use crate::domain::{SourceKind, YEAR_COL, Year};
use crate::error::PanelError;
use crate::io::ingest::{detect_schema, parse_date, parse_number, read_sheet, LoadedSource, SchemaVariant};

pub const RATE_COL: &str = "mortgage_rate_avg";

/// Accepted layouts of the rate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSchema {
    /// FRED download: `observation_date` + `MORTGAGE30US`.
    FredExport,
}

const VARIANTS: [SchemaVariant<RateSchema>; 1] = [SchemaVariant {
    tag: RateSchema::FredExport,
    required: &["observation_date", "MORTGAGE30US"],
}];

/// Load the rate workbook (or CSV) and average it per calendar year.
pub fn load_mortgage_rates_annual(path: &Path) -> Result<LoadedSource, PanelError> {
    let kind = SourceKind::MortgageRates;
    let sheet = read_sheet(kind, path)?;
    let schema = detect_schema(kind, &sheet, &VARIANTS)?;
    log::debug!("{}: {:?} layout", path.display(), schema);

    let date_idx = sheet.require_column(kind, "observation_date")?;
    let rate_idx = sheet.require_column(kind, "MORTGAGE30US")?;

    let mut observations = Vec::with_capacity(sheet.rows.len());
    let mut issues = sheet.issues.clone();

    for row in &sheet.rows {
        let Some(raw_date) = row.get(date_idx) else {
            issues.push(sheet.issue(row.line, "missing observation_date"));
            continue;
        };
        let date = match parse_date(raw_date) {
            Ok(d) => d,
            Err(e) => {
                issues.push(sheet.issue(row.line, e));
                continue;
            }
        };
        // FRED marks missing weeks with "." or a blank cell.
        let Some(raw_rate) = row.get(rate_idx).filter(|r| *r != ".") else {
            continue;
        };
        let Some(rate) = parse_number(raw_rate) else {
            issues.push(sheet.issue(row.line, format!("non-numeric rate {raw_rate:?}")));
            continue;
        };
        observations.push((date, rate));
    }

    Ok(LoadedSource {
        kind,
        frame: annual_mean_frame(&observations)?,
        files: vec![path.to_path_buf()],
        rows_read: sheet.rows.len(),
        issues,
    })
}

/// Fetch `MORTGAGE30US` from FRED and average it per calendar year.
pub fn load_mortgage_rates_from_fred(client: &FredClient) -> Result<LoadedSource, PanelError> {
    let observations = client.fetch_series(MORTGAGE_SERIES)?;
    Ok(LoadedSource {
        kind: SourceKind::MortgageRates,
        frame: annual_mean_frame(&observations)?,
        files: vec![PathBuf::from(format!("{FRED_ORIGIN}:{MORTGAGE_SERIES}"))],
        rows_read: observations.len(),
        issues: Vec::new(),
    })
}

/// `(year, mortgage_rate_avg)` table from dated observations, ascending by year.
pub fn annual_mean_frame(observations: &[(NaiveDate, f64)]) -> Result<DataFrame, PanelError> {
    let years: Vec<Year> = observations.iter().map(|(date, _)| date.year()).collect();
    let rates: Vec<f64> = observations.iter().map(|(_, rate)| *rate).collect();

    DataFrame::new(vec![
        Column::new(YEAR_COL.into(), years),
        Column::new(RATE_COL.into(), rates),
    ])
    .and_then(|weekly| reduce_by(weekly, &[YEAR_COL], RATE_COL, Reduce::Mean))
    .map_err(|e| PanelError::frame(SourceKind::MortgageRates.label(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::frame::{column_names, read};
    use std::fs;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn annual_means_per_calendar_year() {
        let frame = annual_mean_frame(&[
            (date(2020, 1, 2), 3.0),
            (date(2020, 12, 31), 4.0),
            (date(2021, 6, 1), 2.5),
        ])
        .unwrap();
        assert_eq!(column_names(&frame), ["year", RATE_COL]);
        assert_eq!(read::years(&frame), [2020, 2021]);
        assert_eq!(read::f64s(&frame, RATE_COL), [Some(3.5), Some(2.5)]);
    }

    #[test]
    fn loads_fred_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rates.csv");
        fs::write(
            &path,
            "observation_date,MORTGAGE30US\n2019-01-03,4.51\n2019-01-10,.\n2019-01-17,4.45\nbad-date,4.0\n",
        )
        .unwrap();

        let loaded = load_mortgage_rates_annual(&path).unwrap();
        assert_eq!(loaded.frame.height(), 1);
        let avg = read::f64s(&loaded.frame, RATE_COL)[0].unwrap();
        assert!((avg - 4.48).abs() < 1e-9);
        assert_eq!(loaded.rows_read, 4);
        assert_eq!(loaded.issues.len(), 1);
    }

    #[test]
    fn non_numeric_rate_text_is_a_row_issue() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rates.csv");
        fs::write(
            &path,
            "observation_date,MORTGAGE30US\n2020-01-02,3.72\n2020-01-09,n/a\n2020-01-16,\n2020-01-23,.\n",
        )
        .unwrap();

        let loaded = load_mortgage_rates_annual(&path).unwrap();
        assert_eq!(read::f64s(&loaded.frame, RATE_COL), [Some(3.72)]);
        assert_eq!(loaded.issues.len(), 1);
        assert_eq!(loaded.issues[0].line, 3);
        assert!(loaded.issues[0].message.contains("\"n/a\""));
    }

    #[test]
    fn no_observations_give_an_empty_table() {
        let frame = annual_mean_frame(&[]).unwrap();
        assert_eq!(frame.height(), 0);
        assert_eq!(column_names(&frame), ["year", RATE_COL]);
    }

    #[test]
    fn wrong_columns_are_a_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rates.csv");
        fs::write(&path, "DATE,RATE\n2019-01-03,4.51\n").unwrap();
        assert!(matches!(load_mortgage_rates_annual(&path), Err(PanelError::Schema { .. })));
    }
}
