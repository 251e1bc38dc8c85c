//! Skill and company token extraction.

use std::collections::HashSet;

use hirescreen_core::CandidateContent;

use crate::scan::is_cjk;

pub const MAX_SKILLS: usize = 50;
pub const MAX_COMPANIES: usize = 20;

/// CJK runs longer than this are sentences, not skills.
const MAX_CJK_TOKEN_CHARS: usize = 8;

/// Function characters that split a CJK run into phrases.
const CJK_BREAKS: &[char] = &['的', '和', '与', '與', '及', '或', '在'];

const LATIN_STOPWORDS: &[&str] = &[
    "and", "the", "with", "for", "of", "in", "to", "on", "at", "by", "as", "an", "or", "is",
    "was", "from", "years", "year",
];

/// Extracts skill tokens from the intention statement and work-history
/// titles and descriptions.
///
/// Known vocabulary skills found in the text come first, followed by raw
/// tokens in order of appearance. Deduplicated case-insensitively and capped
/// at [`MAX_SKILLS`].
#[must_use]
pub fn extract_skills(content: &CandidateContent, known_skills: &[String]) -> Vec<String> {
    let mut source = String::new();
    for part in [content.intention.as_deref(), content.self_intro.as_deref()]
        .into_iter()
        .flatten()
    {
        source.push_str(part);
        source.push(' ');
    }
    for entry in &content.work_history {
        for part in [entry.title.as_deref(), entry.description.as_deref()]
            .into_iter()
            .flatten()
        {
            source.push_str(part);
            source.push(' ');
        }
    }
    let lower = source.to_lowercase();

    let vocab_hits = known_skills
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty() && lower.contains(s.as_str()));

    dedup_capped(vocab_hits.chain(tokenize(&lower)), MAX_SKILLS)
}

/// Company names from the work history, trimmed, deduplicated and capped at
/// [`MAX_COMPANIES`].
#[must_use]
pub fn extract_companies(content: &CandidateContent) -> Vec<String> {
    let names = content
        .work_history
        .iter()
        .filter_map(|entry| entry.company.as_deref())
        .map(|c| c.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|c| !c.is_empty());
    dedup_capped(names, MAX_COMPANIES)
}

/// Splits pre-lowercased text into CJK phrases and Latin words.
///
/// Latin tokens keep `+`, `#` and `.` so `c++`, `c#` and `node.js` survive.
pub(crate) fn tokenize(lower: &str) -> Vec<String> {
    #[derive(PartialEq)]
    enum Run {
        None,
        Cjk,
        Latin,
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut run = Run::None;

    let mut flush = |current: &mut String, run: &Run| {
        let token = current.trim_end_matches('.').to_string();
        current.clear();
        match run {
            Run::Cjk => {
                let len = token.chars().count();
                if (2..=MAX_CJK_TOKEN_CHARS).contains(&len) {
                    tokens.push(token);
                }
            }
            Run::Latin => {
                if token.chars().count() >= 2 && !LATIN_STOPWORDS.contains(&token.as_str()) {
                    tokens.push(token);
                }
            }
            Run::None => {}
        }
    };

    for c in lower.chars() {
        let next = if is_cjk(c) && !CJK_BREAKS.contains(&c) {
            Run::Cjk
        } else if c.is_ascii_alphanumeric() || (run == Run::Latin && matches!(c, '+' | '#' | '.')) {
            Run::Latin
        } else {
            Run::None
        };

        if next != run {
            flush(&mut current, &run);
            run = next;
        }
        if run != Run::None {
            current.push(c);
        }
    }
    flush(&mut current, &run);

    tokens
}

fn dedup_capped(items: impl Iterator<Item = String>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if out.len() >= cap {
            break;
        }
        if seen.insert(item.to_lowercase()) {
            out.push(item);
        }
    }
    out
}
