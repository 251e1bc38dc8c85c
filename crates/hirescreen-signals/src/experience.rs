//! Years-of-experience parsing.

use std::sync::LazyLock;

use regex::Regex;

use crate::scan::{parse_cjk_number, parse_integer_part};

const NO_EXPERIENCE_MARKERS: &[&str] = &[
    "应届",
    "應屆",
    "无经验",
    "無經驗",
    "无工作经验",
    "在校",
    "no experience",
    "fresh graduate",
    "new grad",
    "entry level",
];

/// Anything longer is a calendar year or noise, not a career length.
const MAX_YEARS: u32 = 60;

const NUMBER: &str = r"(\d+(?:\.\d+)?|[零一二两三四五六七八九十]{1,3})";

static YEARS_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"{NUMBER}\s*(?:(?:-|~|～|至|到|—|–)\s*{NUMBER})?\s*(?:\+|以上|多)?\s*(?:年|years?|yrs?)"
    );
    Regex::new(&pattern).expect("valid regex")
});

/// Parses a years-of-experience statement.
///
/// - `"应届"` / `"no experience"` -> `Some(0)`
/// - `"5年"`, `"5 years"`, `"五年以上"` -> `Some(5)`
/// - `"3-5年"` -> `Some(5)` (upper bound of a range)
/// - a bare integer such as `"7"` -> `Some(7)`
/// - values above 60, such as the `2019` in `"2019年毕业"`, are skipped
/// - anything else, including `"若干"` -> `None`
#[must_use]
pub fn parse_experience_years(text: &str) -> Option<u32> {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    if NO_EXPERIENCE_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(0);
    }

    let stated = YEARS_RE.captures_iter(&lower).find_map(|caps| {
        let upper = caps.get(2).or_else(|| caps.get(1))?;
        parse_number(upper.as_str()).filter(|y| *y <= MAX_YEARS)
    });
    if stated.is_some() {
        return stated;
    }

    if lower.chars().all(|c| c.is_ascii_digit()) {
        return lower.parse::<u32>().ok().filter(|y| *y <= MAX_YEARS);
    }

    None
}

fn parse_number(s: &str) -> Option<u32> {
    if s.starts_with(|c: char| c.is_ascii_digit()) {
        parse_integer_part(s)
    } else {
        parse_cjk_number(s)
    }
}
