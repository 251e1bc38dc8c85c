//! Strict-but-forgiving parsing of collaborator replies.
//!
//! Accepted noise: markdown code fences, prose around the JSON object,
//! trailing commas, numbers sent as strings. Rejected: no JSON object, a
//! missing or out-of-range score, an unknown recommendation label, or a
//! breakdown that is malformed or does not add up to the score.

use std::sync::LazyLock;

use chrono::Utc;
use hirescreen_core::{MatchResult, Recommendation, ScoreComponent, ScoreSource};
use regex::Regex;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::CollaboratorError;

static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("valid regex"));

/// Breakdown component used when the reply has no breakdown at all.
pub const OVERALL_COMPONENT: &str = "overall";

fn unparseable(reason: impl Into<String>) -> CollaboratorError {
    CollaboratorError::Unparseable(reason.into())
}

/// Pulls the JSON candidate out of a reply: the first fenced block if there
/// is one, else the outermost `{...}` span.
fn extract_json_block(raw: &str) -> Option<&str> {
    if let Some(start) = raw.find("```") {
        let after_fence = &raw[start + 3..];
        // Skip an optional language tag such as `json`.
        let body_start = after_fence.find('\n').map_or(0, |i| i + 1);
        let body = &after_fence[body_start..];
        let body = body.find("```").map_or(body, |end| &body[..end]);
        if body.contains('{') {
            return outer_braces(body);
        }
    }
    outer_braces(raw)
}

fn outer_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// A finite number, or a string holding one (a trailing `%` is allowed).
fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_points(value: f64) -> u32 {
    value.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

fn parse_score(object: &Map<String, Value>) -> Result<u32, CollaboratorError> {
    let raw = ["score", "total_score", "match_score"]
        .iter()
        .find_map(|k| object.get(*k))
        .ok_or_else(|| unparseable("missing score"))?;
    let score = as_number(raw).ok_or_else(|| unparseable(format!("score is not a number: {raw}")))?;
    if !(0.0..=100.0).contains(&score) {
        return Err(unparseable(format!("score out of range: {score}")));
    }
    Ok(to_points(score))
}

fn parse_recommendation(label: &str) -> Option<Recommendation> {
    let normalized: String = label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect();
    match normalized.as_str() {
        "strong_match" | "strongly_recommended" => Some(Recommendation::StrongMatch),
        "match" | "recommended" => Some(Recommendation::Match),
        "weak_match" | "maybe" => Some(Recommendation::WeakMatch),
        "no_match" | "not_recommended" => Some(Recommendation::NoMatch),
        _ => None,
    }
}

fn parse_component(name: &str, value: &Value) -> Result<ScoreComponent, CollaboratorError> {
    let points = as_number(value)
        .filter(|p| *p >= 0.0)
        .ok_or_else(|| unparseable(format!("breakdown '{name}' is not a non-negative number")))?;
    Ok(ScoreComponent::new(name, to_points(points)))
}

fn parse_breakdown(value: &Value) -> Result<Vec<ScoreComponent>, CollaboratorError> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(name, points)| parse_component(name, points))
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                let name = item
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| unparseable("breakdown entry without a name"))?;
                let points = item
                    .get("points")
                    .or_else(|| item.get("score"))
                    .ok_or_else(|| unparseable(format!("breakdown '{name}' has no points")))?;
                parse_component(name, points)
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(unparseable("breakdown must be an object or an array")),
    }
}

fn string_list(object: &Map<String, Value>, key: &str) -> Vec<String> {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parses a collaborator reply into a [`MatchResult`] for `candidate_id`
/// under `scope_key`.
///
/// A missing recommendation is derived from the score. A missing or empty
/// breakdown becomes a single [`OVERALL_COMPONENT`] carrying the score.
///
/// # Errors
///
/// Returns [`CollaboratorError::Unparseable`] when the reply cannot be
/// trusted.
pub fn parse_analysis_response(
    raw: &str,
    candidate_id: Uuid,
    scope_key: &str,
) -> Result<MatchResult, CollaboratorError> {
    let block = extract_json_block(raw).ok_or_else(|| unparseable("no JSON object in reply"))?;
    let cleaned = TRAILING_COMMA_RE.replace_all(block, "$1");
    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|e| unparseable(format!("invalid JSON: {e}")))?;
    let Value::Object(object) = value else {
        return Err(unparseable("reply is not a JSON object"));
    };

    let score = parse_score(&object)?;

    let recommendation = match object.get("recommendation") {
        None | Some(Value::Null) => Recommendation::from_score(score),
        Some(Value::String(label)) => parse_recommendation(label)
            .ok_or_else(|| unparseable(format!("unknown recommendation '{label}'")))?,
        Some(other) => return Err(unparseable(format!("recommendation is not a string: {other}"))),
    };

    let mut breakdown = match object.get("breakdown") {
        Some(value) => parse_breakdown(value)?,
        None => Vec::new(),
    };
    if breakdown.is_empty() {
        breakdown = vec![ScoreComponent::new(OVERALL_COMPONENT, score)];
    } else {
        let total = MatchResult::breakdown_total(&breakdown);
        if total != score {
            return Err(unparseable(format!(
                "breakdown adds up to {total}, score is {score}"
            )));
        }
    }

    let summary = ["summary", "reason", "analysis"]
        .iter()
        .find_map(|k| object.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(MatchResult {
        resume_id: candidate_id,
        job_requirement_id: scope_key.to_string(),
        score,
        recommendation,
        breakdown,
        matched_skills: string_list(&object, "matched_skills"),
        matched_companies: string_list(&object, "matched_companies"),
        source: ScoreSource::Ai,
        summary,
        scored_at: Utc::now(),
    })
}
