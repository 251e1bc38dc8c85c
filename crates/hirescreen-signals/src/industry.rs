//! Vocabulary-driven multi-label industry tagging.

use std::collections::{BTreeMap, BTreeSet};

use regex::{Regex, RegexBuilder};

#[derive(Debug)]
enum TermMatcher {
    Substring(String),
    Pattern(Regex),
}

impl TermMatcher {
    fn matches(&self, lower: &str) -> bool {
        match self {
            TermMatcher::Substring(term) => lower.contains(term.as_str()),
            TermMatcher::Pattern(re) => re.is_match(lower),
        }
    }
}

/// Compiled industry term sets.
///
/// A term prefixed with `re:` or containing `|` is compiled as a
/// case-insensitive pattern; anything else is a plain substring. Invalid
/// patterns are logged and skipped.
#[derive(Debug, Default)]
pub struct IndustryClassifier {
    tags: Vec<(String, Vec<TermMatcher>)>,
}

impl IndustryClassifier {
    #[must_use]
    pub fn new(industries: &BTreeMap<String, Vec<String>>) -> Self {
        let tags = industries
            .iter()
            .map(|(tag, terms)| {
                let matchers = terms
                    .iter()
                    .filter_map(|term| compile_term(tag, term))
                    .collect();
                (tag.clone(), matchers)
            })
            .collect();
        Self { tags }
    }

    /// Every tag with at least one matching term.
    #[must_use]
    pub fn classify(&self, text: &str) -> BTreeSet<String> {
        let lower = text.to_lowercase();
        self.tags
            .iter()
            .filter(|(_, matchers)| matchers.iter().any(|m| m.matches(&lower)))
            .map(|(tag, _)| tag.clone())
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

fn compile_term(tag: &str, term: &str) -> Option<TermMatcher> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }

    let pattern = if let Some(rest) = term.strip_prefix("re:") {
        rest
    } else if term.contains('|') {
        term
    } else {
        return Some(TermMatcher::Substring(term.to_lowercase()));
    };

    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(TermMatcher::Pattern(re)),
        Err(e) => {
            tracing::warn!(tag, pattern, error = %e, "skipping invalid industry pattern");
            None
        }
    }
}
