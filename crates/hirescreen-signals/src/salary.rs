//! Expected-salary parsing.

use std::sync::LazyLock;

use hirescreen_core::SalaryRange;
use regex::Regex;

const NEGOTIABLE_MARKERS: &[&str] = &["面议", "面談", "面谈", "negotiable", "议价"];

static SALARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d+(?:\.\d+)?)\s*(k|千|万|w)?\s*(?:(?:-|~|～|至|到|—|–)\s*(\d+(?:\.\d+)?)\s*(k|千|万|w)?)?",
    )
    .expect("valid regex")
});

/// Parses a salary statement into a monthly range.
///
/// `k`/`千` multiply by 1 000 and `万`/`w` by 10 000; a unit written only on
/// the upper bound applies to both. Single values give `min == max`.
/// Negotiable markers and unparseable text give `None`.
#[must_use]
pub fn parse_salary_range(text: &str) -> Option<SalaryRange> {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() || NEGOTIABLE_MARKERS.iter().any(|m| lower.contains(m)) {
        return None;
    }

    let caps = SALARY_RE.captures(&lower)?;
    let low_raw: f64 = caps.get(1)?.as_str().parse().ok()?;
    let low_unit = caps.get(2).map(|m| m.as_str());
    let high_raw: Option<f64> = caps.get(3).and_then(|m| m.as_str().parse().ok());
    let high_unit = caps.get(4).map(|m| m.as_str());

    let (min, max) = match high_raw {
        Some(high_raw) => {
            let high_mult = multiplier(high_unit.or(low_unit));
            let low_mult = multiplier(low_unit.or(high_unit));
            (to_amount(low_raw * low_mult)?, to_amount(high_raw * high_mult)?)
        }
        None => {
            let amount = to_amount(low_raw * multiplier(low_unit))?;
            (amount, amount)
        }
    };

    if max == 0 {
        return None;
    }

    Some(if min > max {
        SalaryRange { min: max, max: min }
    } else {
        SalaryRange { min, max }
    })
}

fn multiplier(unit: Option<&str>) -> f64 {
    match unit {
        Some("k" | "千") => 1_000.0,
        Some("万" | "w") => 10_000.0,
        _ => 1.0,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_amount(value: f64) -> Option<u32> {
    if value.is_finite() && (0.0..=f64::from(u32::MAX)).contains(&value) {
        Some(value.round() as u32)
    } else {
        None
    }
}
