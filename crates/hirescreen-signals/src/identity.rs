//! Stable identity keys for scraped candidates.
//!
//! Precedence, highest first: normalised profile URL, explicit resume id,
//! platform user id, then the source-assigned external id. Keys carry a
//! short prefix (`url:`, `resume:`, `user:`, `ext:`) so values from different
//! tiers never collide.

use hirescreen_core::CandidateContent;
use url::Url;

/// Query-parameter prefixes that carry tracking noise rather than identity.
const TRACKING_PARAM_PREFIXES: &[&str] = &["utm_", "spm", "track", "ref", "from", "_"];

/// Links that look present but point nowhere.
const PLACEHOLDER_LINKS: &[&str] = &[
    "#",
    "about:blank",
    "null",
    "undefined",
    "none",
    "n/a",
    "-",
    "/",
];

/// Derives the canonical identity key for a candidate, or `None` when the
/// record carries nothing identifying: no usable URL, resume or user id, and
/// a blank external id.
#[must_use]
pub fn derive_identity_key(content: &CandidateContent, external_id: &str) -> Option<String> {
    if let Some(url) = content.profile_url.as_deref().and_then(normalize_profile_url) {
        return Some(format!("url:{url}"));
    }
    if let Some(id) = content.resume_id.as_deref().and_then(normalize_id) {
        return Some(format!("resume:{id}"));
    }
    if let Some(id) = content.platform_user_id.as_deref().and_then(normalize_id) {
        return Some(format!("user:{id}"));
    }
    let external_id = external_id.trim();
    (!external_id.is_empty()).then(|| format!("ext:{external_id}"))
}

/// Normalises a profile URL for identity comparison, or `None` for
/// placeholder links.
///
/// Lower-cases the host, drops an `http`/`https` scheme, collapses trailing
/// slashes, removes tracking parameters, sorts the rest by key then value and
/// drops the fragment. Strings the URL parser rejects are stripped on a
/// best-effort basis instead.
#[must_use]
pub fn normalize_profile_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if is_placeholder(trimmed) {
        return None;
    }

    let parsed = Url::parse(trimmed)
        .ok()
        .filter(|u| u.has_host())
        .or_else(|| {
            if trimmed.contains("://") {
                None
            } else {
                Url::parse(&format!("https://{trimmed}"))
                    .ok()
                    .filter(|u| u.has_host())
            }
        });

    let normalized = match parsed {
        Some(url) => normalize_parsed(&url),
        None => normalize_fallback(trimmed),
    };

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn normalize_parsed(url: &Url) -> String {
    let mut out = String::new();
    if !matches!(url.scheme(), "http" | "https") {
        out.push_str(url.scheme());
        out.push_str("://");
    }
    out.push_str(&url.host_str().unwrap_or_default().to_lowercase());
    if let Some(port) = url.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }
    out.push_str(url.path().trim_end_matches('/'));

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !params.is_empty() {
        params.sort();
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter())
            .finish();
        out.push('?');
        out.push_str(&query);
    }
    out
}

/// String-level stripping for links the parser cannot handle.
fn normalize_fallback(raw: &str) -> String {
    let without_fragment = raw.split('#').next().unwrap_or_default();
    let without_scheme = without_fragment
        .strip_prefix("https://")
        .or_else(|| without_fragment.strip_prefix("http://"))
        .or_else(|| without_fragment.strip_prefix("//"))
        .unwrap_or(without_fragment);

    let (location, query) = match without_scheme.split_once('?') {
        Some((loc, q)) => (loc, Some(q)),
        None => (without_scheme, None),
    };

    let (host, path) = match location.split_once('/') {
        Some((host, path)) => (host, format!("/{path}")),
        None => (location, String::new()),
    };

    let mut out = host.to_lowercase();
    out.push_str(path.trim_end_matches('/'));

    if let Some(query) = query {
        let mut params: Vec<&str> = query
            .split('&')
            .filter(|p| !p.is_empty())
            .filter(|p| !is_tracking_param(p.split('=').next().unwrap_or_default()))
            .collect();
        if !params.is_empty() {
            params.sort_unstable();
            out.push('?');
            out.push_str(&params.join("&"));
        }
    }
    out
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_lowercase();
    TRACKING_PARAM_PREFIXES.iter().any(|p| key.starts_with(p))
}

fn is_placeholder(link: &str) -> bool {
    let lower = link.to_lowercase();
    lower.is_empty()
        || PLACEHOLDER_LINKS.contains(&lower.as_str())
        || lower.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.contains("void(0)")
}

fn normalize_id(raw: &str) -> Option<String> {
    let id = raw.trim().to_lowercase();
    if id.is_empty() || PLACEHOLDER_LINKS.contains(&id.as_str()) {
        None
    } else {
        Some(id)
    }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
