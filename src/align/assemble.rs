//! Panel assembly: filter every source to the window, then inner-join.
//!
//! Regional tables are joined on `(parish, year)` in the order given; the
//! rate table is joined last on `year` alone. A region-year missing from any
//! source is dropped, never imputed.

use polars::prelude::*;

use crate::align::window::filter_to_year_range;
use crate::domain::frame::{column_names, describe, ensure_unique, key_exprs};
use crate::domain::{REGION_COL, YEAR_COL, YearWindow};
use crate::error::PanelError;

const PANEL: &str = "panel";

/// Join the per-region tables and the year-only rate table over `window`.
///
/// The result is sorted by parish, then year.
pub fn assemble_panel(
    regional: &[&DataFrame],
    rates: &DataFrame,
    window: &YearWindow,
) -> Result<DataFrame, PanelError> {
    let (first, rest) = regional
        .split_first()
        .ok_or_else(|| PanelError::schema(PANEL, "no region-keyed tables to merge"))?;

    let region_keys = [REGION_COL, YEAR_COL];
    let mut panel = restrict(first, window, &region_keys)?;
    for df in rest {
        let filtered = restrict(df, window, &region_keys)?;
        panel = inner_join(panel, filtered, &region_keys)?;
        log::debug!("joined {}: {} rows", describe(df), panel.height());
    }

    let rates = restrict(rates, window, &[YEAR_COL])?;
    let panel = inner_join(panel, rates, &[YEAR_COL])?;

    panel
        .lazy()
        .sort_by_exprs(key_exprs(&region_keys), SortMultipleOptions::default())
        .collect()
        .map_err(|e| PanelError::frame(PANEL, e))
}

fn restrict(df: &DataFrame, window: &YearWindow, keys: &[&str]) -> Result<DataFrame, PanelError> {
    let table = describe(df);
    for key in keys {
        if df.column(key).is_err() {
            return Err(PanelError::schema(&table, format!("missing column `{key}`")));
        }
    }
    ensure_unique(df, keys, &table)?;
    let filtered = filter_to_year_range(df, window.start, window.end)?;
    // Join keys must agree in dtype across tables.
    filtered
        .lazy()
        .with_column(col(YEAR_COL).cast(DataType::Int32))
        .collect()
        .map_err(|e| PanelError::frame(&table, e))
}

fn inner_join(left: DataFrame, right: DataFrame, keys: &[&str]) -> Result<DataFrame, PanelError> {
    let left_cols = column_names(&left);
    if let Some(clash) = column_names(&right)
        .into_iter()
        .find(|c| !keys.contains(&c.as_str()) && left_cols.contains(c))
    {
        return Err(PanelError::schema(
            PANEL,
            format!("column `{clash}` exists on both sides of the join"),
        ));
    }

    left.lazy()
        .join(
            right.lazy(),
            key_exprs(keys),
            key_exprs(keys),
            JoinArgs::new(JoinType::Inner),
        )
        .collect()
        .map_err(|e| PanelError::frame(PANEL, e))
}
