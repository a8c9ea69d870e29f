//! Crime counts: one wide CSV with a column per month, summed per year.

use std::path::Path;

use crate::domain::frame::{Reduce, reduce_by, regional_frame};
use crate::domain::{REGION_COL, SourceKind, YEAR_COL, Year};
use crate::error::PanelError;
use crate::io::ingest::{detect_schema, parse_number, read_sheet, table_label, LoadedSource, SchemaVariant};
use crate::sources::normalize::{normalize_region, year_from_period_label};

pub const CRIME_COL: &str = "crime_total";

/// Accepted layouts of the crime export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrimeSchema {
    /// `Parish` plus one column per month (`Jan-15`, `Feb-15`, ...).
    MonthlyWide,
}

const VARIANTS: [SchemaVariant<CrimeSchema>; 1] = [SchemaVariant {
    tag: CrimeSchema::MonthlyWide,
    required: &["Parish"],
}];

/// Load the monthly crime file and collapse it to annual totals per parish.
///
/// Every non-blank column other than `Parish` is a month; a header without a
/// readable year is a schema error. Blank cells are skipped.
pub fn load_crime_annual(path: &Path) -> Result<LoadedSource, PanelError> {
    let kind = SourceKind::Crime;
    let sheet = read_sheet(kind, path)?;
    let schema = detect_schema(kind, &sheet, &VARIANTS)?;
    log::debug!("{}: {:?} layout", path.display(), schema);

    let parish_idx = sheet.require_column(kind, "Parish")?;

    let mut month_cols: Vec<(usize, Year)> = Vec::new();
    for (idx, header) in sheet.headers.iter().enumerate() {
        if idx == parish_idx || header.trim().is_empty() {
            continue;
        }
        let year = year_from_period_label(header)
            .map_err(|e| PanelError::schema(table_label(kind, path), e))?;
        month_cols.push((idx, year));
    }

    let (mut parishes, mut years, mut counts) = (Vec::new(), Vec::new(), Vec::new());
    let mut issues = sheet.issues.clone();

    for row in &sheet.rows {
        let Some(region) = row.get(parish_idx).and_then(normalize_region) else {
            issues.push(sheet.issue(row.line, "missing parish name"));
            continue;
        };

        for &(idx, year) in &month_cols {
            let Some(raw) = row.get(idx) else {
                continue;
            };
            match parse_number(raw) {
                Some(count) => {
                    parishes.push(region.as_str().to_string());
                    years.push(year);
                    counts.push(count);
                }
                None => issues.push(sheet.issue(
                    row.line,
                    format!("non-numeric count {raw:?} in `{}`", sheet.headers[idx]),
                )),
            }
        }
    }

    let frame = regional_frame(CRIME_COL, parishes, years, counts)
        .and_then(|monthly| reduce_by(monthly, &[REGION_COL, YEAR_COL], CRIME_COL, Reduce::Sum))
        .map_err(|e| PanelError::frame(table_label(kind, path), e))?;

    Ok(LoadedSource {
        kind,
        frame,
        files: vec![path.to_path_buf()],
        rows_read: sheet.rows.len(),
        issues,
    })
}
