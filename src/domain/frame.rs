//! Polars helpers shared by the loaders and the aligner.
//!
//! Every loaded table is a polars `DataFrame` with an integer `year` column
//! and, for regional sources, a `parish` string column. The helpers here
//! build those frames and run the key-based reductions on them.

use polars::prelude::*;

use crate::domain::{REGION_COL, YEAR_COL, Year};
use crate::error::PanelError;

/// How several observations of one key collapse to a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduce {
    Sum,
    Mean,
}

impl Reduce {
    fn expr(self, metric: &str) -> Expr {
        match self {
            Reduce::Sum => col(metric).sum(),
            Reduce::Mean => col(metric).mean(),
        }
    }
}

pub fn key_exprs(keys: &[&str]) -> Vec<Expr> {
    keys.iter().map(|k| col(*k)).collect()
}

/// `(parish, year, metric)` observations as a frame.
pub fn regional_frame(
    metric: &str,
    parishes: Vec<String>,
    years: Vec<Year>,
    values: Vec<f64>,
) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(REGION_COL.into(), parishes),
        Column::new(YEAR_COL.into(), years),
        Column::new(metric.into(), values),
    ])
}

/// Collapse `metric` to one row per distinct `keys`, sorted by `keys`.
pub fn reduce_by(df: DataFrame, keys: &[&str], metric: &str, how: Reduce) -> PolarsResult<DataFrame> {
    df.lazy()
        .group_by(key_exprs(keys))
        .agg([how.expr(metric)])
        .sort_by_exprs(key_exprs(keys), SortMultipleOptions::default())
        .collect()
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|c| c.to_string()).collect()
}

/// Label for error messages when a frame has no better name.
pub fn describe(df: &DataFrame) -> String {
    format!("table [{}]", column_names(df).join(", "))
}

/// Fail when two rows share the same values in `keys`.
pub fn ensure_unique(df: &DataFrame, keys: &[&str], table: &str) -> Result<(), PanelError> {
    let duplicates = df
        .clone()
        .lazy()
        .group_by(key_exprs(keys))
        .agg([len().alias("rows")])
        .filter(col("rows").gt(lit(1)))
        .sort_by_exprs(key_exprs(keys), SortMultipleOptions::default())
        .limit(1)
        .collect()
        .map_err(|e| PanelError::frame(table, e))?;

    if let Some(first) = duplicates.get(0) {
        let key: Vec<String> = keys
            .iter()
            .zip(&first)
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        return Err(PanelError::schema(
            table,
            format!("duplicate key ({}) appears {} times", key.join(", "), first[keys.len()]),
        ));
    }
    Ok(())
}

/// Column readers for tests.
#[cfg(test)]
pub(crate) mod read {
    use super::*;

    pub fn f64s(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name).unwrap().f64().unwrap().into_iter().collect()
    }

    pub fn strs(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        df.column(name)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    pub fn years(df: &DataFrame) -> Vec<Year> {
        let col = df.column(YEAR_COL).unwrap().cast(&DataType::Int32).unwrap();
        col.i32().unwrap().into_iter().map(|y| y.unwrap()).collect()
    }
}
