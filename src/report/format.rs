//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the alignment code stays free of presentation concerns
//! - output changes are localized

use polars::prelude::{AnyValue, DataFrame};

use crate::app::pipeline::{PanelBuild, SourceCoverage, YearSurvey};
use crate::domain::frame::column_names;
use crate::domain::{REGION_COL, WindowKind, Year, YearWindow};

const MAX_CELL: usize = 26;

/// Format the full build summary (source coverage + window + panel shape).
pub fn format_panel_summary(build: &PanelBuild) -> String {
    let mut out = String::new();

    out.push_str("=== panel - Parish Five-Year Panel ===\n");
    out.push_str(&format_source_coverage(&build.coverage));
    out.push('\n');
    out.push_str(&format!("Common years: {}\n", fmt_years(&build.common_years)));
    out.push_str(&format_window(&build.window));
    out.push_str(&format!(
        "Panel: {} rows x {} columns | parishes={}\n",
        build.panel.height(),
        build.panel.width(),
        distinct_parishes(&build.panel),
    ));

    out
}

/// Format the `years` command output: per-source years, the intersection and
/// the window it would produce.
pub fn format_year_survey(survey: &YearSurvey, window: Option<&YearWindow>) -> String {
    let mut out = String::new();

    out.push_str(&format_source_coverage(&survey.coverage));
    out.push('\n');
    out.push_str(&format!("Common years: {}\n", fmt_years(&survey.common_years)));
    match window {
        Some(w) => out.push_str(&format_window(w)),
        None => out.push_str("Window: none (fewer than 5 common years)\n"),
    }

    out
}

/// One line for the window, plus a warning line when it is a fallback.
pub fn format_window(window: &YearWindow) -> String {
    let mut out = format!("Window: {}-{}\n", window.start, window.end);
    if window.kind == WindowKind::Fallback {
        out.push_str(
            "  warning: no 5 consecutive common years; using the last 5 common years, \
             so the panel has gaps\n",
        );
    }
    out
}

/// Format the per-source coverage table.
pub fn format_source_coverage(coverage: &[SourceCoverage]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<15} {:>5} {:>9} {:>7} {:>8} {:>6}  {}\n",
            "source", "files", "rows_read", "annual", "parishes", "issues", "years"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<15} {:-<5} {:-<9} {:-<7} {:-<8} {:-<6}  {:-<5}\n",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for c in coverage {
        out.push_str(
            format!(
                "{:<15} {:>5} {:>9} {:>7} {:>8} {:>6}  {}\n",
                c.kind.label(),
                c.files,
                c.rows_read,
                c.rows,
                c.regions.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string()),
                c.issues,
                fmt_years(&c.years),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// First `n` rows of a panel as an aligned text table.
pub fn format_panel_head(panel: &DataFrame, n: usize) -> String {
    let shown = n.min(panel.height());
    let names = column_names(panel);
    let numeric: Vec<bool> = panel
        .get_columns()
        .iter()
        .map(|c| c.dtype().is_integer() || c.dtype().is_float())
        .collect();
    let cells: Vec<Vec<String>> = (0..shown)
        .map(|row| {
            panel
                .get_columns()
                .iter()
                .map(|c| truncate(&fmt_cell(&c.get(row).unwrap_or(AnyValue::Null)), MAX_CELL))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(name.chars().count().min(MAX_CELL)))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header: Vec<String> = names
        .iter()
        .zip(&widths)
        .map(|(name, &w)| format!("{:<w$}", truncate(name, MAX_CELL)))
        .collect();
    out.push_str(header.join(" ").trim_end());
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join(" "));
    out.push('\n');

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&numeric)
            .zip(&widths)
            .map(|((cell, &is_number), &w)| {
                if is_number {
                    format!("{cell:>w$}")
                } else {
                    format!("{cell:<w$}")
                }
            })
            .collect();
        out.push_str(line.join(" ").trim_end());
        out.push('\n');
    }

    if panel.height() > shown {
        out.push_str(&format!("... {} more rows\n", panel.height() - shown));
    }

    out
}

fn fmt_cell(v: &AnyValue) -> String {
    match v {
        AnyValue::Float64(x) => format!("{x:.2}"),
        AnyValue::Float32(x) => format!("{x:.2}"),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Compress a sorted year list into ranges: `2014-2016, 2018, 2020-2021`.
fn fmt_years(years: &[Year]) -> String {
    if years.is_empty() {
        return "(none)".to_string();
    }
    let mut parts = Vec::new();
    let mut start = years[0];
    let mut prev = years[0];
    for &y in &years[1..] {
        if y == prev + 1 {
            prev = y;
            continue;
        }
        parts.push(fmt_span(start, prev));
        start = y;
        prev = y;
    }
    parts.push(fmt_span(start, prev));
    parts.join(", ")
}

fn fmt_span(start: Year, end: Year) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}-{end}")
    }
}

fn distinct_parishes(panel: &DataFrame) -> usize {
    panel
        .column(REGION_COL)
        .ok()
        .and_then(|c| c.as_materialized_series().n_unique().ok())
        .unwrap_or(0)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceKind;
    use polars::prelude::Column;

    fn panel() -> DataFrame {
        DataFrame::new(vec![
            Column::new("parish".into(), ["Acadia Parish", "Acadia Parish", "East Baton Rouge Parish"]),
            Column::new("year".into(), [2019i32, 2020, 2019]),
            Column::new("dps_letter".into(), [Some("B"), None, Some("C")]),
            Column::new("home_value_avg".into(), [150000.0, 151234.567, 9.5]),
        ])
        .unwrap()
    }

    #[test]
    fn years_are_compressed_into_ranges() {
        assert_eq!(fmt_years(&[2014, 2015, 2016, 2018, 2020, 2021]), "2014-2016, 2018, 2020-2021");
        assert_eq!(fmt_years(&[2019]), "2019");
        assert_eq!(fmt_years(&[]), "(none)");
    }

    #[test]
    fn fallback_window_carries_a_warning() {
        let contiguous = YearWindow {
            start: 2019,
            end: 2023,
            kind: WindowKind::Contiguous,
        };
        let fallback = YearWindow {
            kind: WindowKind::Fallback,
            start: 2016,
            end: 2021,
        };
        assert_eq!(format_window(&contiguous), "Window: 2019-2023\n");
        assert!(format_window(&fallback).contains("warning"));
    }

    #[test]
    fn panel_head_aligns_and_counts_hidden_rows() {
        let text = format_panel_head(&panel(), 2);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("parish"));
        assert!(lines[2].contains("150000.00"));
        assert!(lines[3].contains(" - "));
        assert_eq!(lines[4], "... 1 more rows");
        assert_eq!(lines[0].find("year"), lines[2].find("2019"));
        assert!(!lines[2].contains('"'));
    }

    #[test]
    fn panel_head_shorter_than_n_has_no_footer() {
        let text = format_panel_head(&panel(), 10);
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("East Baton Rouge Parish"));
    }

    #[test]
    fn coverage_table_lists_every_source() {
        let coverage = vec![
            SourceCoverage {
                kind: SourceKind::Crime,
                files: 1,
                rows_read: 64,
                rows: 640,
                regions: Some(64),
                issues: 0,
                years: vec![2015, 2016, 2017],
            },
            SourceCoverage {
                kind: SourceKind::MortgageRates,
                files: 1,
                rows_read: 520,
                rows: 10,
                regions: None,
                issues: 2,
                years: vec![2014, 2023],
            },
        ];
        let text = format_source_coverage(&coverage);
        assert!(text.contains("crime"));
        assert!(text.contains("2015-2017"));
        assert!(text.lines().any(|l| l.starts_with("mortgage_rates") && l.contains("2014, 2023")));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("East Baton Rouge Parish", 10), "East Bato.");
        assert_eq!(truncate("Acadia", 10), "Acadia");
    }

    #[test]
    fn distinct_parishes_counts_names() {
        assert_eq!(distinct_parishes(&panel()), 2);
    }
}
