//! Search-text normalisation.

use hirescreen_core::CandidateContent;

/// Lower-cases and collapses all whitespace runs to a single space.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Builds the normalised blob that keyword and location matching run against.
///
/// Includes every free-text field except the name and profile link.
#[must_use]
pub fn build_search_text(content: &CandidateContent) -> String {
    let mut parts: Vec<&str> = [
        content.intention.as_deref(),
        content.self_intro.as_deref(),
        content.education.as_deref(),
        content.location.as_deref(),
        content.expected_salary.as_deref(),
        content.experience.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect();

    for entry in &content.work_history {
        parts.extend(
            [
                entry.company.as_deref(),
                entry.title.as_deref(),
                entry.period.as_deref(),
                entry.description.as_deref(),
            ]
            .into_iter()
            .flatten(),
        );
    }

    normalize_text(&parts.join(" "))
}

#[cfg(test)]
mod tests {
    use hirescreen_core::WorkHistoryEntry;

    use super::*;

    #[test]
    fn normalize_collapses_and_lowercases() {
        assert_eq!(normalize_text("  Rust \n\t Engineer "), "rust engineer");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn search_text_covers_work_history() {
        let content = CandidateContent {
            name: Some("Zhang San".into()),
            intention: Some("销售经理".into()),
            location: Some("上海".into()),
            work_history: vec![WorkHistoryEntry {
                company: Some("Acme Corp".into()),
                title: Some("Sales Lead".into()),
                ..WorkHistoryEntry::default()
            }],
            ..CandidateContent::default()
        };
        let text = build_search_text(&content);
        assert_eq!(text, "销售经理 上海 acme corp sales lead");
        assert!(!text.contains("zhang"));
    }

    #[test]
    fn empty_content_gives_empty_text() {
        assert_eq!(build_search_text(&CandidateContent::default()), "");
    }
}
