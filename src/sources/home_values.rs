//! Home values: one wide CSV with a column per month, averaged per year.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::frame::{Reduce, reduce_by, regional_frame};
use crate::domain::{REGION_COL, SourceKind, YEAR_COL, Year};
use crate::error::PanelError;
use crate::io::ingest::{detect_schema, parse_number, read_sheet, table_label, LoadedSource, SchemaVariant};
use crate::sources::normalize::{normalize_region, year_from_period_label};

pub const HOME_VALUE_COL: &str = "home_value_avg";

/// Month headers look like `Jan-15` or `2015-01`.
static MONTH_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^.*-[0-9]{2,4}$").expect("valid month regex"));

/// Accepted layouts of the home value export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeValueSchema {
    /// `RegionName` plus one column per month; other id columns are ignored.
    RegionMonthly,
}

const VARIANTS: [SchemaVariant<HomeValueSchema>; 1] = [SchemaVariant {
    tag: HomeValueSchema::RegionMonthly,
    required: &["RegionName"],
}];

/// Load the monthly home value file and collapse it to annual means per parish.
pub fn load_home_values_annual(path: &Path) -> Result<LoadedSource, PanelError> {
    let kind = SourceKind::HomeValues;
    let sheet = read_sheet(kind, path)?;
    let schema = detect_schema(kind, &sheet, &VARIANTS)?;
    log::debug!("{}: {:?} layout", path.display(), schema);

    let region_idx = sheet.require_column(kind, "RegionName")?;

    let mut month_cols: Vec<(usize, Year)> = Vec::new();
    for (idx, header) in sheet.headers.iter().enumerate() {
        let header = header.trim();
        if idx == region_idx || !MONTH_HEADER.is_match(header) {
            continue;
        }
        let year = year_from_period_label(header)
            .map_err(|e| PanelError::schema(table_label(kind, path), e))?;
        month_cols.push((idx, year));
    }
    if month_cols.is_empty() {
        return Err(PanelError::schema(
            table_label(kind, path),
            "no monthly columns found; expected headers like `Jan-15` or `2015-01`",
        ));
    }

    let (mut parishes, mut years, mut values) = (Vec::new(), Vec::new(), Vec::new());
    let mut issues = sheet.issues.clone();

    for row in &sheet.rows {
        let Some(region) = row.get(region_idx).and_then(normalize_region) else {
            issues.push(sheet.issue(row.line, "missing region name"));
            continue;
        };

        for &(idx, year) in &month_cols {
            let Some(raw) = row.get(idx) else {
                continue;
            };
            match parse_number(raw) {
                Some(value) => {
                    parishes.push(region.as_str().to_string());
                    years.push(year);
                    values.push(value);
                }
                None => issues.push(sheet.issue(
                    row.line,
                    format!("non-numeric home value {raw:?} in `{}`", sheet.headers[idx]),
                )),
            }
        }
    }

    let frame = regional_frame(HOME_VALUE_COL, parishes, years, values)
        .and_then(|monthly| reduce_by(monthly, &[REGION_COL, YEAR_COL], HOME_VALUE_COL, Reduce::Mean))
        .map_err(|e| PanelError::frame(table_label(kind, path), e))?;

    Ok(LoadedSource {
        kind,
        frame,
        files: vec![path.to_path_buf()],
        rows_read: sheet.rows.len(),
        issues,
    })
}
