//! Region and period label normalization shared by every loader.
//!
//! Every source spells parishes differently (`"Acadia Parish, Louisiana"`,
//! `"DE SOTO"`, `"East Baton Rouge Parish"`). They must all land on the same
//! string or the inner joins silently drop rows, so there is exactly one
//! normalization function and every loader calls it.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{Region, Year};

const REGION_SUFFIX: &str = "Parish";

// ASCII only: `\d` also matches other scripts' digits, which `parse` rejects
// and which are wider than one byte.
static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid digit regex"));

/// Normalize a raw location label to a `Region`.
///
/// Steps: keep the text before the first comma, collapse whitespace,
/// title-case each alphabetic run, append `" Parish"` when missing.
/// Blank labels yield `None`.
pub fn normalize_region(raw: &str) -> Option<Region> {
    let head = raw.split(',').next().unwrap_or("");
    let words: Vec<String> = head.split_whitespace().map(title_case).collect();
    if words.is_empty() {
        return None;
    }

    let mut name = words.join(" ");
    if words.last().map(String::as_str) != Some(REGION_SUFFIX) {
        name.push(' ');
        name.push_str(REGION_SUFFIX);
    }
    Some(Region::from_normalized(name))
}

/// Uppercase the first letter of each alphabetic run, lowercase the rest.
///
/// `"DE"` -> `"De"`, `"st."` -> `"St."`, `"o'neil"` -> `"O'Neil"`.
fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev_alpha = false;
    for ch in word.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Parse the year out of a period label such as `Jan-15`, `2015-01` or `201506`.
///
/// The first run of four or more digits gives its leading four digits.
/// Otherwise a trailing two-digit run `NN` is read as `20NN`.
pub fn year_from_period_label(label: &str) -> Result<Year, String> {
    let token = label.trim();
    if token.is_empty() {
        return Err(format!("empty period label {label:?}"));
    }

    let runs: Vec<&str> = DIGIT_RUN.find_iter(token).map(|m| m.as_str()).collect();

    if let Some(long) = runs.iter().find(|r| r.len() >= 4) {
        return long[..4]
            .parse::<Year>()
            .map_err(|e| format!("cannot parse year from {label:?}: {e}"));
    }

    match runs.last() {
        Some(suffix) if suffix.len() == 2 => suffix
            .parse::<Year>()
            .map(|yy| 2000 + yy)
            .map_err(|e| format!("cannot parse year from {label:?}: {e}")),
        _ => Err(format!("cannot parse year from period label {label:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(raw: &str) -> Option<String> {
        normalize_region(raw).map(Region::into_string)
    }

    #[test]
    fn region_spellings_converge() {
        let expected = Some("East Baton Rouge Parish".to_string());
        assert_eq!(region("East Baton Rouge Parish, Louisiana"), expected);
        assert_eq!(region("EAST BATON ROUGE"), expected);
        assert_eq!(region("  east  baton rouge parish "), expected);
        assert_eq!(region("East Baton Rouge Parish"), expected);
    }

    #[test]
    fn region_title_cases_like_the_crime_export() {
        assert_eq!(region("DE SOTO"), Some("De Soto Parish".to_string()));
        assert_eq!(region("ST. JOHN THE BAPTIST"), Some("St. John The Baptist Parish".to_string()));
    }

    #[test]
    fn blank_region_is_none() {
        assert_eq!(region(""), None);
        assert_eq!(region("   "), None);
        assert_eq!(region(", Louisiana"), None);
    }

    #[test]
    fn period_labels() {
        assert_eq!(year_from_period_label("Jan-15"), Ok(2015));
        assert_eq!(year_from_period_label("2015-01"), Ok(2015));
        assert_eq!(year_from_period_label("201506"), Ok(2015));
        assert_eq!(year_from_period_label("Dec-09"), Ok(2009));
        assert_eq!(year_from_period_label("1/31/2000"), Ok(2000));
    }

    #[test]
    fn unparseable_period_labels() {
        assert!(year_from_period_label("").is_err());
        assert!(year_from_period_label("SizeRank").is_err());
        assert!(year_from_period_label("Q3").is_err());
    }

    #[test]
    fn non_ascii_digits_are_an_error_not_a_panic() {
        assert!(year_from_period_label("Jan-२०१५").is_err());
        assert!(year_from_period_label("٢٠١٥-01").is_err());
        assert!(year_from_period_label("２０１５-01").is_err());
        // ASCII digits next to non-ASCII ones still count.
        assert_eq!(year_from_period_label("Jan-١٥ 2016"), Ok(2016));
    }
}
