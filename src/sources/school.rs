//! School district performance ratings: one spreadsheet per year.
//!
//! The file stem is the year (`2019.xlsx`). Older files name the location
//! column `District`, newer ones `School System` (or a variation), and the
//! letter grade column carries the year in its header.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::*;

use crate::domain::{DataLayout, LetterGrade, REGION_COL, SourceKind, YEAR_COL, Year};
use crate::error::PanelError;
use crate::io::ingest::{detect_schema, parse_number, read_sheet, LoadedSource, RawSheet, SchemaVariant};
use crate::sources::normalize::normalize_region;

pub const SCORE_COL: &str = "dps_score";
pub const LETTER_COL: &str = "dps_letter";

const SHEET_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "csv"];

/// Accepted layouts of a yearly ratings file, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchoolSchema {
    District,
    SchoolSystem,
    SchoolSystemName,
    SystemName,
}

impl SchoolSchema {
    pub fn location_column(self) -> &'static str {
        match self {
            SchoolSchema::District => "District",
            SchoolSchema::SchoolSystem => "School System",
            SchoolSchema::SchoolSystemName => "School System Name",
            SchoolSchema::SystemName => "System Name",
        }
    }
}

const VARIANTS: [SchemaVariant<SchoolSchema>; 4] = [
    SchemaVariant {
        tag: SchoolSchema::District,
        required: &["District", "DPS"],
    },
    SchemaVariant {
        tag: SchoolSchema::SchoolSystem,
        required: &["School System", "DPS"],
    },
    SchemaVariant {
        tag: SchoolSchema::SchoolSystemName,
        required: &["School System Name", "DPS"],
    },
    SchemaVariant {
        tag: SchoolSchema::SystemName,
        required: &["System Name", "DPS"],
    },
];

/// Load every `<year>.<ext>` ratings file under the school directory.
pub fn load_school_ratings(layout: &DataLayout) -> Result<LoadedSource, PanelError> {
    let kind = SourceKind::School;
    let year_files = discover_year_files(&layout.school_dir)?;
    if year_files.is_empty() {
        return Err(PanelError::read(
            kind,
            &layout.school_dir,
            "no yearly school rating spreadsheets found",
        ));
    }

    let mut parishes: Vec<String> = Vec::new();
    let mut row_years: Vec<Year> = Vec::new();
    let mut scores: Vec<Option<f64>> = Vec::new();
    let mut letters: Vec<Option<&'static str>> = Vec::new();
    let mut files = Vec::new();
    let mut issues = Vec::new();
    let mut rows_read = 0usize;

    for (year, path) in year_files {
        let sheet = read_sheet(kind, &path)?;
        let schema = detect_schema(kind, &sheet, &VARIANTS)?;
        log::debug!("{}: {:?} layout", path.display(), schema);

        let loc_idx = sheet.require_column(kind, schema.location_column())?;
        let dps_idx = sheet.require_column(kind, "DPS")?;
        let letter_idx = letter_grade_column(&sheet, year);

        issues.extend(sheet.issues.iter().cloned());
        let mut seen = HashSet::new();

        for row in &sheet.rows {
            rows_read += 1;

            let Some(region) = row.get(loc_idx).and_then(normalize_region) else {
                issues.push(sheet.issue(row.line, "missing school system name"));
                continue;
            };
            if !seen.insert(region.clone()) {
                issues.push(sheet.issue(row.line, format!("duplicate row for {region}; keeping the first")));
                continue;
            }

            let score = row.get(dps_idx).and_then(parse_number);
            let letter = letter_idx
                .and_then(|idx| row.get(idx))
                .and_then(LetterGrade::parse)
                .map(LetterGrade::as_str);

            parishes.push(region.into_string());
            row_years.push(year);
            scores.push(score);
            letters.push(letter);
        }

        files.push(path);
    }

    let frame = DataFrame::new(vec![
        Column::new(REGION_COL.into(), parishes),
        Column::new(YEAR_COL.into(), row_years),
        Column::new(SCORE_COL.into(), scores),
        Column::new(LETTER_COL.into(), letters),
    ])
    .map_err(|e| PanelError::frame(kind.label(), e))?;

    Ok(LoadedSource {
        kind,
        frame,
        files,
        rows_read,
        issues,
    })
}

/// Files whose stem is a year, sorted by year.
///
/// When a year has several files (e.g. `2019.xlsx` and `2019.csv`) the
/// first extension in `SHEET_EXTENSIONS` wins.
fn discover_year_files(dir: &Path) -> Result<Vec<(Year, PathBuf)>, PanelError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        PanelError::read(SourceKind::School, dir, format!("failed to list directory: {e}"))
    })?;

    let mut found: Vec<(Year, usize, PathBuf)> = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| PanelError::read(SourceKind::School, dir, format!("failed to list directory: {e}")))?
            .path();

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem.is_empty() || !stem.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let Ok(year) = stem.parse::<Year>() else {
            continue;
        };
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let Some(rank) = SHEET_EXTENSIONS.iter().position(|e| *e == ext) else {
            continue;
        };
        found.push((year, rank, path));
    }

    found.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    found.dedup_by_key(|(year, _, _)| *year);
    Ok(found.into_iter().map(|(year, _, path)| (year, path)).collect())
}

/// First header mentioning both the file year and "Letter Grade".
fn letter_grade_column(sheet: &RawSheet, year: Year) -> Option<usize> {
    let year = year.to_string();
    sheet.headers.iter().position(|h| {
        let lower = h.to_ascii_lowercase();
        lower.contains(&year) && lower.contains("letter grade")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::frame::read;

    fn layout(dir: &Path) -> DataLayout {
        let mut layout = DataLayout::under(dir);
        layout.school_dir = dir.to_path_buf();
        layout
    }

    #[test]
    fn handles_both_location_layouts_and_letter_grades() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("2017.csv"),
            "District,DPS,2017 Letter Grade\nAcadia Parish,85.2,B\nCADDO,70.1,C\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("2018.csv"),
            "School System,DPS,Letter Grade 2016\nAcadia Parish,86.0,A\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.csv"), "ignored\n").unwrap();

        let loaded = load_school_ratings(&layout(dir.path())).unwrap();
        assert_eq!(loaded.files.len(), 2);
        assert_eq!(loaded.frame.height(), 3);

        let parishes = read::strs(&loaded.frame, "parish");
        let letters = read::strs(&loaded.frame, LETTER_COL);
        assert_eq!(parishes[1].as_deref(), Some("Caddo Parish"));
        assert_eq!(letters[1].as_deref(), Some("C"));
        // 2018's grade column is labelled with another year, so no grade.
        assert_eq!(read::years(&loaded.frame), [2017, 2017, 2018]);
        assert_eq!(read::f64s(&loaded.frame, SCORE_COL)[2], Some(86.0));
        assert_eq!(letters[2], None);
    }

    #[test]
    fn duplicate_system_rows_keep_the_first() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("2019.csv"),
            "System Name,DPS\nAcadia,80\nAcadia Parish,10\n",
        )
        .unwrap();

        let loaded = load_school_ratings(&layout(dir.path())).unwrap();
        assert_eq!(loaded.frame.height(), 1);
        assert_eq!(read::f64s(&loaded.frame, SCORE_COL), [Some(80.0)]);
        assert_eq!(loaded.issues.len(), 1);
    }

    #[test]
    fn non_numeric_score_keeps_the_row_as_null() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2019.csv"), "District,DPS\nAcadia,NR\nCaddo,71.5\n").unwrap();

        let loaded = load_school_ratings(&layout(dir.path())).unwrap();
        assert_eq!(loaded.frame.height(), 2);
        assert_eq!(read::f64s(&loaded.frame, SCORE_COL), [None, Some(71.5)]);
        assert_eq!(loaded.frame.column(LETTER_COL).unwrap().null_count(), 2);
    }

    #[test]
    fn empty_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_school_ratings(&layout(dir.path())),
            Err(PanelError::Read { kind: SourceKind::School, .. })
        ));
    }

    #[test]
    fn unknown_layout_is_a_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2019.csv"), "Parish,Score\nAcadia,80\n").unwrap();
        assert!(matches!(
            load_school_ratings(&layout(dir.path())),
            Err(PanelError::Schema { .. })
        ));
    }
}
