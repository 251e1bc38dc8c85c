//! Education-level classification.

use hirescreen_core::EducationLevel;

use crate::scan::contains_word;

/// Keyword table, checked highest level first so "本科及以上, 硕士优先"
/// resolves to the strongest credential mentioned.
///
/// `substrings` match anywhere (CJK and multi-word phrases); `words` are
/// Latin abbreviations that must stand alone.
struct LevelKeywords {
    level: EducationLevel,
    substrings: &'static [&'static str],
    words: &'static [&'static str],
}

const LEVELS: &[LevelKeywords] = &[
    LevelKeywords {
        level: EducationLevel::Phd,
        substrings: &["博士", "doctorate", "doctoral", "ph.d"],
        words: &["phd", "dphil"],
    },
    LevelKeywords {
        level: EducationLevel::Master,
        substrings: &["硕士", "碩士", "研究生", "master"],
        words: &["mba", "msc", "m.s.", "m.sc", "meng", "mphil"],
    },
    LevelKeywords {
        level: EducationLevel::Bachelor,
        substrings: &["本科", "学士", "學士", "bachelor", "undergraduate"],
        words: &["ba", "bs", "bsc", "b.s.", "b.a.", "b.sc", "beng"],
    },
    LevelKeywords {
        level: EducationLevel::Associate,
        substrings: &["大专", "大專", "专科", "專科", "高职", "高職", "associate degree"],
        words: &["associate"],
    },
    LevelKeywords {
        level: EducationLevel::HighSchool,
        substrings: &[
            "高中",
            "中专",
            "中專",
            "职高",
            "職高",
            "技校",
            "high school",
            "secondary school",
        ],
        words: &["ged"],
    },
];

/// Maps free-text education to the five-level scale. Unrecognised text is
/// `None`; there is no guessed default.
#[must_use]
pub fn parse_education_level(text: &str) -> Option<EducationLevel> {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    LEVELS
        .iter()
        .find(|entry| {
            entry.substrings.iter().any(|s| lower.contains(s))
                || entry.words.iter().any(|w| contains_word(&lower, w))
        })
        .map(|entry| entry.level)
}
