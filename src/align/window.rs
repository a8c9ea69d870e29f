//! Year coverage and window selection.
//!
//! Selection rules:
//! 1. Require at least five distinct common years
//! 2. Prefer the most recent run of five consecutive years
//! 3. With no such run, fall back to the last five common years (gaps allowed)

use std::collections::BTreeSet;

use polars::prelude::*;

use crate::domain::frame::describe;
use crate::domain::{WINDOW_YEARS, WindowKind, YEAR_COL, Year, YearWindow};
use crate::error::PanelError;

/// Distinct years present in a table.
///
/// The `year` column must exist, hold an integer dtype and contain no nulls.
pub fn year_set(df: &DataFrame) -> Result<BTreeSet<Year>, PanelError> {
    let table = describe(df);
    let column = df
        .column(YEAR_COL)
        .map_err(|_| PanelError::schema(&table, format!("missing column `{YEAR_COL}`")))?;
    if !column.dtype().is_integer() {
        return Err(PanelError::schema(
            &table,
            format!("column `{YEAR_COL}` must be integer, found {}", column.dtype()),
        ));
    }
    if column.null_count() > 0 {
        return Err(PanelError::schema(&table, format!("null in column `{YEAR_COL}`")));
    }

    let years = column
        .cast(&DataType::Int32)
        .map_err(|e| PanelError::frame(&table, e))?;
    let years = years.i32().map_err(|e| PanelError::frame(&table, e))?;
    Ok(years.into_iter().flatten().collect())
}

/// Years present in every table, ascending.
///
/// An empty input yields an empty list.
pub fn common_years<'a>(frames: impl IntoIterator<Item = &'a DataFrame>) -> Result<Vec<Year>, PanelError> {
    let mut common: Option<BTreeSet<Year>> = None;
    for df in frames {
        let years = year_set(df)?;
        common = Some(match common {
            None => years,
            Some(mut set) => {
                set.retain(|y| years.contains(y));
                set
            }
        });
    }
    Ok(common.map(|set| set.into_iter().collect()).unwrap_or_default())
}

/// Pick the five-year window from a list of candidate years.
pub fn choose_five_year_window(years: &[Year]) -> Result<YearWindow, PanelError> {
    let mut years = years.to_vec();
    years.sort_unstable();
    years.dedup();

    if years.len() < WINDOW_YEARS {
        return Err(PanelError::InsufficientData {
            needed: WINDOW_YEARS,
            years,
        });
    }

    let span = WINDOW_YEARS as Year - 1;
    for start in (0..=years.len() - WINDOW_YEARS).rev() {
        let window = &years[start..start + WINDOW_YEARS];
        if window[WINDOW_YEARS - 1] - window[0] == span {
            return Ok(YearWindow {
                start: window[0],
                end: window[WINDOW_YEARS - 1],
                kind: WindowKind::Contiguous,
            });
        }
    }

    let tail = &years[years.len() - WINDOW_YEARS..];
    log::warn!(
        "no contiguous {WINDOW_YEARS}-year span in common years {years:?}; falling back to {}-{}",
        tail[0],
        tail[WINDOW_YEARS - 1]
    );
    Ok(YearWindow {
        start: tail[0],
        end: tail[WINDOW_YEARS - 1],
        kind: WindowKind::Fallback,
    })
}

/// Rows whose year lies in `start..=end`, as a new table.
pub fn filter_to_year_range(df: &DataFrame, start: Year, end: Year) -> Result<DataFrame, PanelError> {
    // Validates the year column before filtering on it.
    year_set(df)?;
    df.clone()
        .lazy()
        .filter(col(YEAR_COL).gt_eq(lit(start)).and(col(YEAR_COL).lt_eq(lit(end))))
        .collect()
        .map_err(|e| PanelError::frame(describe(df), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn years_frame(years: &[Year]) -> DataFrame {
        let metric: Vec<f64> = years.iter().map(|&y| f64::from(y) / 10.0).collect();
        DataFrame::new(vec![
            Column::new("year".into(), years.to_vec()),
            Column::new("metric".into(), metric),
        ])
        .unwrap()
    }

    #[test]
    fn year_set_requires_year_column() {
        let df = DataFrame::new(vec![
            Column::new("parish".into(), ["A Parish"]),
            Column::new("metric".into(), [1.0]),
        ])
        .unwrap();
        let err = year_set(&df).unwrap_err();
        assert!(matches!(err, PanelError::Schema { .. }));
        assert!(err.to_string().contains("missing column `year`"));
    }

    #[test]
    fn year_set_rejects_non_integer_years() {
        let text = DataFrame::new(vec![Column::new("year".into(), ["2020"])]).unwrap();
        assert!(matches!(year_set(&text), Err(PanelError::Schema { .. })));

        let float = DataFrame::new(vec![Column::new("year".into(), [2020.0])]).unwrap();
        assert!(year_set(&float).is_err());

        let null = DataFrame::new(vec![Column::new("year".into(), [Some(2020), None])]).unwrap();
        assert!(year_set(&null).is_err());
    }

    #[test]
    fn year_set_accepts_wider_integer_dtypes() {
        let df = DataFrame::new(vec![Column::new("year".into(), [2021i64, 2020])]).unwrap();
        assert_eq!(year_set(&df).unwrap().into_iter().collect::<Vec<_>>(), vec![2020, 2021]);
    }

    #[test]
    fn year_set_is_distinct() {
        let df = years_frame(&[2020, 2020, 2019]);
        let set = year_set(&df).unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![2019, 2020]);
    }

    #[test]
    fn common_years_is_exact_intersection() {
        let a = years_frame(&[2015, 2016, 2017, 2018, 2019, 2020]);
        let b = years_frame(&[2017, 2018, 2019, 2021]);
        let c = years_frame(&[2016, 2017, 2019, 2020, 2021]);

        let common = common_years([&a, &b, &c]).unwrap();
        assert_eq!(common, vec![2017, 2019]);

        for df in [&a, &b, &c] {
            let set = year_set(df).unwrap();
            assert!(common.iter().all(|y| set.contains(y)));
        }
    }

    #[test]
    fn common_years_of_single_table_is_its_years_sorted() {
        let a = years_frame(&[2021, 2019, 2020]);
        assert_eq!(common_years([&a]).unwrap(), vec![2019, 2020, 2021]);
    }

    #[test]
    fn common_years_of_nothing_is_empty() {
        let none: [&DataFrame; 0] = [];
        assert!(common_years(none).unwrap().is_empty());
    }

    #[test]
    fn window_prefers_most_recent_contiguous_span() {
        let w = choose_five_year_window(&[2018, 2019, 2020, 2021, 2022, 2023]).unwrap();
        assert_eq!(w.bounds(), (2019, 2023));
        assert_eq!(w.kind, WindowKind::Contiguous);
    }

    #[test]
    fn window_accepts_unsorted_input() {
        let w = choose_five_year_window(&[2023, 2019, 2021, 2018, 2022, 2020]).unwrap();
        assert_eq!(w.bounds(), (2019, 2023));
    }

    #[test]
    fn window_skips_recent_gap_for_older_contiguous_span() {
        // 2016-2020 is contiguous; anything touching 2022 has a gap at 2021.
        let w = choose_five_year_window(&[2016, 2017, 2018, 2019, 2020, 2022, 2023]).unwrap();
        assert_eq!(w.bounds(), (2016, 2020));
        assert_eq!(w.kind, WindowKind::Contiguous);
    }

    #[test]
    fn window_falls_back_to_last_five_when_gapped() {
        let w = choose_five_year_window(&[2014, 2015, 2016, 2018, 2019, 2020, 2021]).unwrap();
        assert_eq!(w.bounds(), (2016, 2021));
        assert_eq!(w.kind, WindowKind::Fallback);
    }

    #[test]
    fn window_needs_five_distinct_years() {
        let err = choose_five_year_window(&[2019, 2020, 2021, 2022]).unwrap_err();
        assert!(matches!(err, PanelError::InsufficientData { needed: 5, .. }));

        let err = choose_five_year_window(&[2019, 2020, 2020, 2021, 2022]).unwrap_err();
        match err {
            PanelError::InsufficientData { years, .. } => assert_eq!(years, vec![2019, 2020, 2021, 2022]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn window_of_exactly_five_contiguous_years() {
        let w = choose_five_year_window(&[2010, 2011, 2012, 2013, 2014]).unwrap();
        assert_eq!(w.bounds(), (2010, 2014));
    }

    #[test]
    fn filter_keeps_inclusive_range_without_touching_input() {
        let df = years_frame(&[2017, 2018, 2019, 2020, 2021, 2022]);
        let before = df.clone();

        let filtered = filter_to_year_range(&df, 2019, 2021).unwrap();
        assert_eq!(year_set(&filtered).unwrap().into_iter().collect::<Vec<_>>(), vec![2019, 2020, 2021]);
        assert_eq!(filtered.get_column_names(), df.get_column_names());
        assert!(df.equals(&before));
    }

    #[test]
    fn filter_composes() {
        let df = years_frame(&[2017, 2018, 2019, 2020, 2021, 2022]);
        let twice = filter_to_year_range(&filter_to_year_range(&df, 2019, 2021).unwrap(), 2020, 2021).unwrap();
        let once = filter_to_year_range(&df, 2020, 2021).unwrap();
        assert!(twice.equals(&once));
    }

    #[test]
    fn filter_outside_coverage_is_empty_with_same_columns() {
        let df = years_frame(&[2017, 2018]);
        let filtered = filter_to_year_range(&df, 2020, 2024).unwrap();
        assert_eq!(filtered.height(), 0);
        assert_eq!(filtered.width(), 2);
    }

    #[test]
    fn filter_requires_year_column() {
        let df = DataFrame::new(vec![Column::new("parish".into(), ["A Parish"])]).unwrap();
        assert!(filter_to_year_range(&df, 2019, 2023).is_err());
    }
}
