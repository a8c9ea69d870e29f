//! Export the assembled panel to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! modeling scripts: one header row, one line per `(parish, year)`, nulls as
//! empty cells.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::error::AppError;

/// Write a panel (or any frame) to a CSV file.
pub fn write_panel_csv(path: &Path, panel: &DataFrame) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    let mut panel = panel.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut panel)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV '{}': {e}", path.display())))?;
    Ok(())
}
