//! Median household income: one ACS subject-table CSV per year.

use std::collections::HashSet;

use crate::domain::frame::regional_frame;
use crate::domain::{DataLayout, SourceKind, Year};
use crate::error::PanelError;
use crate::io::ingest::{detect_schema, parse_number, read_sheet, LoadedSource, SchemaVariant};
use crate::sources::normalize::normalize_region;

pub const INCOME_COL: &str = "median_income";

/// Accepted layouts of a yearly income file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomeSchema {
    /// ACS S1903 export: `NAME` + median household income estimate.
    AcsSubjectTable,
}

const VARIANTS: [SchemaVariant<IncomeSchema>; 1] = [SchemaVariant {
    tag: IncomeSchema::AcsSubjectTable,
    required: &["NAME", "S1903_C02_001E"],
}];

/// Load `<income_dir>/<year>.csv` for every year in `years` (inclusive).
///
/// Every file in the range must exist.
pub fn load_median_income(layout: &DataLayout, years: (Year, Year)) -> Result<LoadedSource, PanelError> {
    let kind = SourceKind::Income;
    let (mut parishes, mut row_years, mut incomes) = (Vec::new(), Vec::new(), Vec::new());
    let mut files = Vec::new();
    let mut issues = Vec::new();
    let mut rows_read = 0usize;

    for year in years.0..=years.1 {
        let path = layout.income_dir.join(format!("{year}.csv"));
        if !path.exists() {
            return Err(PanelError::read(kind, &path, "median income file not found"));
        }

        let sheet = read_sheet(kind, &path)?;
        let schema = detect_schema(kind, &sheet, &VARIANTS)?;
        log::debug!("{}: {:?} layout", path.display(), schema);

        let name_idx = sheet.require_column(kind, "NAME")?;
        let value_idx = sheet.require_column(kind, "S1903_C02_001E")?;

        issues.extend(sheet.issues.iter().cloned());
        let mut seen = HashSet::new();

        for row in &sheet.rows {
            rows_read += 1;

            let Some(region) = row.get(name_idx).and_then(normalize_region) else {
                issues.push(sheet.issue(row.line, "missing parish name"));
                continue;
            };
            // ACS exports carry a label row under the header; it fails here too.
            let Some(income) = row.get(value_idx).and_then(parse_number) else {
                issues.push(sheet.issue(row.line, format!("non-numeric median income for {region}")));
                continue;
            };
            if !seen.insert(region.clone()) {
                issues.push(sheet.issue(row.line, format!("duplicate row for {region}; keeping the first")));
                continue;
            }

            parishes.push(region.into_string());
            row_years.push(year);
            incomes.push(income);
        }

        files.push(path);
    }

    let frame = regional_frame(INCOME_COL, parishes, row_years, incomes)
        .map_err(|e| PanelError::frame(kind.label(), e))?;

    Ok(LoadedSource {
        kind,
        frame,
        files,
        rows_read,
        issues,
    })
}
