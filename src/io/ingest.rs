//! Raw sheet ingest shared by the source loaders.
//!
//! This module is responsible for turning a CSV file or the first worksheet of
//! an Excel workbook into a uniform grid of trimmed text cells, plus the
//! helpers loaders need to validate it.
//!
//! Design goals:
//! - **Explicit schemas**: each source declares its accepted layouts up front
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (first matching layout wins, file order is sorted)
//! - **Separation of concerns**: no per-source semantics here

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Days, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use polars::prelude::DataFrame;

use crate::domain::SourceKind;
use crate::error::PanelError;

/// A row-level problem encountered during ingest. The row is skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct RowIssue {
    pub origin: PathBuf,
    pub line: usize,
    pub message: String,
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.origin.display(), self.line, self.message)
    }
}

/// Loader output: the normalized annual table + what it took to build it.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub kind: SourceKind,
    pub frame: DataFrame,
    /// Files (or remote series) read, in load order.
    pub files: Vec<PathBuf>,
    /// Raw data rows seen before validation and aggregation.
    pub rows_read: usize,
    pub issues: Vec<RowIssue>,
}

impl LoadedSource {
    pub(crate) fn log_summary(&self) {
        log::debug!(
            "{}: {} file(s), {} raw rows -> {} annual rows",
            self.kind,
            self.files.len(),
            self.rows_read,
            self.frame.height()
        );
        if !self.issues.is_empty() {
            log::warn!("{}: skipped {} row(s) during ingest", self.kind, self.issues.len());
            for issue in &self.issues {
                log::debug!("{}: {issue}", self.kind);
            }
        }
    }
}

/// One data row of a sheet with its 1-based line number in the source file.
#[derive(Debug, Clone)]
pub struct SheetRow {
    pub line: usize,
    pub cells: Vec<String>,
}

/// A sheet read as text: raw headers, normalized header lookup, data rows.
#[derive(Debug, Clone)]
pub struct RawSheet {
    pub origin: PathBuf,
    pub headers: Vec<String>,
    header_map: HashMap<String, usize>,
    pub rows: Vec<SheetRow>,
    /// Rows the reader itself could not parse.
    pub issues: Vec<RowIssue>,
}

impl RawSheet {
    pub fn new(origin: &Path, headers: Vec<String>, rows: Vec<SheetRow>) -> Self {
        let header_map = build_header_map(&headers);
        Self {
            origin: origin.to_path_buf(),
            headers,
            header_map,
            rows,
            issues: Vec::new(),
        }
    }

    /// Column index by case-insensitive header name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header_map.get(&normalize_header_name(name)).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Index of a column that a matched schema guarantees.
    pub fn require_column(&self, kind: SourceKind, name: &str) -> Result<usize, PanelError> {
        self.column(name).ok_or_else(|| {
            PanelError::schema(
                table_label(kind, &self.origin),
                format!("missing required column `{name}`"),
            )
        })
    }

    pub fn issue(&self, line: usize, message: impl Into<String>) -> RowIssue {
        RowIssue {
            origin: self.origin.clone(),
            line,
            message: message.into(),
        }
    }
}

impl SheetRow {
    /// Trimmed, non-empty cell at `idx`.
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.cells.get(idx).map(|s| s.trim()).filter(|s| !s.is_empty())
    }
}

/// One accepted layout of a source file.
#[derive(Debug, Clone, Copy)]
pub struct SchemaVariant<T> {
    pub tag: T,
    /// Header names (case-insensitive) that must all be present.
    pub required: &'static [&'static str],
}

/// Return the tag of the first variant whose required columns are all present.
pub fn detect_schema<T: Copy + fmt::Debug>(
    kind: SourceKind,
    sheet: &RawSheet,
    variants: &[SchemaVariant<T>],
) -> Result<T, PanelError> {
    if let Some(variant) = variants
        .iter()
        .find(|v| v.required.iter().all(|col| sheet.has_column(col)))
    {
        return Ok(variant.tag);
    }

    let tried: Vec<String> = variants
        .iter()
        .map(|v| format!("{:?} [{}]", v.tag, v.required.join(", ")))
        .collect();
    Err(PanelError::schema(
        table_label(kind, &sheet.origin),
        format!(
            "no accepted layout matched; tried {}; found columns [{}]",
            tried.join(" | "),
            sheet.headers.join(", ")
        ),
    ))
}

/// Read a CSV file or the first worksheet of a workbook, by extension.
pub fn read_sheet(kind: SourceKind, path: &Path) -> Result<RawSheet, PanelError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => read_csv(kind, path),
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_workbook(kind, path),
        other => Err(PanelError::read(kind, path, format!("unsupported file extension `.{other}`"))),
    }
}

fn read_csv(kind: SourceKind, path: &Path) -> Result<RawSheet, PanelError> {
    let file = File::open(path).map_err(|e| PanelError::read(kind, path, format!("failed to open: {e}")))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PanelError::read(kind, path, format!("failed to read CSV headers: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    let mut issues = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line, and lines are 1-based.
        let line = idx + 2;
        match result {
            Ok(record) => rows.push(SheetRow {
                line,
                cells: record_cells(&record),
            }),
            Err(e) => issues.push(RowIssue {
                origin: path.to_path_buf(),
                line,
                message: format!("CSV parse error: {e}"),
            }),
        }
    }

    let mut sheet = RawSheet::new(path, headers, rows);
    sheet.issues = issues;
    Ok(sheet)
}

fn record_cells(record: &StringRecord) -> Vec<String> {
    record.iter().map(str::to_string).collect()
}

fn read_workbook(kind: SourceKind, path: &Path) -> Result<RawSheet, PanelError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| PanelError::read(kind, path, format!("failed to open workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PanelError::read(kind, path, "workbook has no worksheets"))?
        .map_err(|e| PanelError::read(kind, path, format!("failed to read first worksheet: {e}")))?;

    let mut grid = range.rows();
    let headers: Vec<String> = grid
        .next()
        .map(|cells| cells.iter().map(cell_text).collect())
        .unwrap_or_default();

    let rows = grid
        .enumerate()
        .map(|(idx, cells)| SheetRow {
            line: idx + 2,
            cells: cells.iter().map(cell_text).collect(),
        })
        .collect();

    Ok(RawSheet::new(path, headers, rows))
}

/// Render a workbook cell as the text a CSV export would contain.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) => s.clone(),
        _ => String::new(),
    }
}

/// Convert an Excel serial day number (1900 date system) to a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    // Day 0 is 1899-12-30 once Excel's phantom 1900-02-29 is accounted for.
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

fn build_header_map(headers: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::with_capacity(headers.len());
    for (idx, name) in headers.iter().enumerate() {
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema detection misses that column.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

/// Label used in schema errors: source kind plus file.
pub fn table_label(kind: SourceKind, origin: &Path) -> String {
    format!("{kind} ({})", origin.display())
}

/// Parse a numeric cell. Thousands separators are tolerated; `.` (the FRED
/// missing-value marker), text and non-finite values yield `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed == "." || trimmed.is_empty() {
        return None;
    }
    let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
    let v = cleaned.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Parse an observation date cell.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%b-%Y"];
    let s = s.trim();
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.date());
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, MM/DD/YYYY, YYYY/MM/DD, DD-Mon-YYYY."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Layout {
        Old,
        New,
    }

    const LAYOUTS: [SchemaVariant<Layout>; 2] = [
        SchemaVariant {
            tag: Layout::Old,
            required: &["District", "DPS"],
        },
        SchemaVariant {
            tag: Layout::New,
            required: &["School System", "DPS"],
        },
    ];

    fn sheet(headers: &[&str]) -> RawSheet {
        RawSheet::new(
            Path::new("test.csv"),
            headers.iter().map(|h| h.to_string()).collect(),
            Vec::new(),
        )
    }

    #[test]
    fn detect_schema_returns_first_matching_variant() {
        assert_eq!(detect_schema(SourceKind::School, &sheet(&["district", "DPS"]), &LAYOUTS).unwrap(), Layout::Old);
        assert_eq!(
            detect_schema(SourceKind::School, &sheet(&["School System", "dps", "District"]), &LAYOUTS).unwrap(),
            Layout::Old
        );
        assert_eq!(
            detect_schema(SourceKind::School, &sheet(&["School System", "DPS"]), &LAYOUTS).unwrap(),
            Layout::New
        );
    }

    #[test]
    fn detect_schema_reports_variants_tried() {
        let err = detect_schema(SourceKind::School, &sheet(&["Name", "Score"]), &LAYOUTS).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Old [District, DPS]"));
        assert!(msg.contains("found columns [Name, Score]"));
    }

    #[test]
    fn header_lookup_strips_bom_and_case() {
        let s = sheet(&["\u{feff}Parish", " Jan-15 "]);
        assert_eq!(s.column("parish"), Some(0));
        assert_eq!(s.column("JAN-15"), Some(1));
    }

    #[test]
    fn read_csv_keeps_line_numbers() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Parish,Jan-15").unwrap();
        writeln!(file, "Acadia, 12").unwrap();
        writeln!(file, "Caddo,").unwrap();
        file.flush().unwrap();

        let sheet = read_sheet(SourceKind::Crime, file.path()).unwrap();
        assert_eq!(sheet.headers, vec!["Parish", "Jan-15"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].line, 2);
        assert_eq!(sheet.rows[0].get(1), Some("12"));
        assert_eq!(sheet.rows[1].get(1), None);
    }

    #[test]
    fn read_sheet_rejects_unknown_extension() {
        let err = read_sheet(SourceKind::Crime, Path::new("crime.txt")).unwrap_err();
        assert!(matches!(err, PanelError::Read { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = read_sheet(SourceKind::Crime, Path::new("/nonexistent/crime.csv")).unwrap_err();
        assert!(matches!(err, PanelError::Read { kind: SourceKind::Crime, .. }));
    }

    #[test]
    fn excel_serials_map_to_dates() {
        assert_eq!(excel_serial_to_date(1.0), NaiveDate::from_ymd_opt(1899, 12, 31));
        assert_eq!(excel_serial_to_date(43831.0), NaiveDate::from_ymd_opt(2020, 1, 1));
        assert_eq!(excel_serial_to_date(-1.0), None);
    }

    #[test]
    fn number_parsing() {
        assert_eq!(parse_number(" 52,300 "), Some(52300.0));
        assert_eq!(parse_number("6.78"), Some(6.78));
        assert_eq!(parse_number("."), None);
        assert_eq!(parse_number("Estimate!!Median income"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn date_parsing() {
        let d = NaiveDate::from_ymd_opt(2019, 3, 7).unwrap();
        assert_eq!(parse_date("2019-03-07").unwrap(), d);
        assert_eq!(parse_date("03/07/2019").unwrap(), d);
        assert_eq!(parse_date("2019-03-07 00:00:00").unwrap(), d);
        assert!(parse_date("March 7th").is_err());
    }
}
