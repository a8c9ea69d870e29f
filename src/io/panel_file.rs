//! Read/write panel JSON files.
//!
//! Panel JSON is the "portable" representation of a built panel:
//! - the selected window and whether it was a fallback
//! - column names in merge order
//! - the rows themselves, cells as plain JSON scalars
//!
//! `panel show` reads these back without touching the raw sources.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::frame::column_names;
use crate::domain::{WindowKind, YEAR_COL, Year, YearWindow};
use crate::error::{AppError, PanelError};

pub const TOOL_NAME: &str = "panel";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelFile {
    pub tool: String,
    pub start_year: Year,
    pub end_year: Year,
    pub window_kind: WindowKind,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl PanelFile {
    pub fn new(panel: &DataFrame, window: &YearWindow) -> Self {
        let rows = (0..panel.height())
            .map(|row| {
                panel
                    .get_columns()
                    .iter()
                    .map(|c| c.get(row).map(|v| cell_to_json(&v)).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self {
            tool: TOOL_NAME.to_string(),
            start_year: window.start,
            end_year: window.end,
            window_kind: window.kind,
            columns: column_names(panel),
            rows,
        }
    }

    pub fn window(&self) -> YearWindow {
        YearWindow {
            start: self.start_year,
            end: self.end_year,
            kind: self.window_kind,
        }
    }

    /// Rebuild the in-memory panel, checking row widths and per-column cell types.
    pub fn to_frame(&self) -> Result<DataFrame, PanelError> {
        if let Some((i, row)) = self
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.columns.len())
        {
            return Err(PanelError::schema(
                PANEL_TABLE,
                format!("row {i} has {} cells, expected {}", row.len(), self.columns.len()),
            ));
        }

        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let cells: Vec<&Value> = self.rows.iter().map(|row| &row[idx]).collect();
                json_column(name, &cells)
            })
            .collect::<Result<Vec<_>, _>>()?;

        DataFrame::new(columns).map_err(|e| PanelError::frame(PANEL_TABLE, e))
    }
}

const PANEL_TABLE: &str = "panel";

fn cell_to_json(v: &AnyValue) -> Value {
    match v {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::from(*b),
        AnyValue::Int32(x) => Value::from(*x),
        AnyValue::Int64(x) => Value::from(*x),
        AnyValue::UInt32(x) => Value::from(*x),
        AnyValue::UInt64(x) => Value::from(*x),
        AnyValue::Float32(x) => Value::from(f64::from(*x)),
        AnyValue::Float64(x) => Value::from(*x),
        AnyValue::String(s) => Value::from(*s),
        AnyValue::StringOwned(s) => Value::from(s.as_str()),
        other => Value::from(other.to_string()),
    }
}

/// One column from JSON cells: integers, floats (integers widen), or text.
fn json_column(name: &str, cells: &[&Value]) -> Result<Column, PanelError> {
    let present: Vec<&Value> = cells.iter().copied().filter(|v| !v.is_null()).collect();
    let mismatch = |what: &str| PanelError::schema(PANEL_TABLE, format!("column `{name}` mixes {what}"));

    if !present.is_empty() && present.iter().all(|v| v.is_i64()) {
        let ints: Vec<Option<i64>> = cells.iter().map(|v| v.as_i64()).collect();
        let column = Column::new(name.into(), ints);
        if name == YEAR_COL {
            return column
                .cast(&DataType::Int32)
                .map_err(|e| PanelError::frame(PANEL_TABLE, e));
        }
        return Ok(column);
    }
    if present.iter().any(|v| v.is_number()) {
        if !present.iter().all(|v| v.is_number()) {
            return Err(mismatch("numbers and non-numbers"));
        }
        let floats: Vec<Option<f64>> = cells.iter().map(|v| v.as_f64()).collect();
        return Ok(Column::new(name.into(), floats));
    }
    if !present.iter().all(|v| v.is_string()) {
        return Err(mismatch("text and non-text"));
    }
    let text: Vec<Option<&str>> = cells.iter().map(|v| v.as_str()).collect();
    Ok(Column::new(name.into(), text))
}

/// Write a panel JSON file.
pub fn write_panel_json(path: &Path, panel: &DataFrame, window: &YearWindow) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create panel JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(BufWriter::new(file), &PanelFile::new(panel, window))
        .map_err(|e| AppError::new(2, format!("Failed to write panel JSON: {e}")))?;

    Ok(())
}

/// Read a panel JSON file.
pub fn read_panel_json(path: &Path) -> Result<PanelFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open panel JSON '{}': {e}", path.display())))?;
    let panel: PanelFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid panel JSON: {e}")))?;
    Ok(panel)
}
