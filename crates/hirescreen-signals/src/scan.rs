//! Shared character-level helpers.
//!
//! All functions expect pre-lowercased input unless stated otherwise.

/// Returns `true` for characters in the CJK unified ideograph blocks.
pub(crate) fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}')
}

/// Finds `word` in `lower` where neither neighbour is an ASCII alphanumeric.
///
/// Used for short Latin abbreviations (`"ba"`, `"phd"`) that would otherwise
/// match inside unrelated words.
pub(crate) fn contains_word(lower: &str, word: &str) -> bool {
    let mut search_from = 0usize;
    while let Some(rel) = lower[search_from..].find(word) {
        let start = search_from + rel;
        let end = start + word.len();

        let before_ok = !lower[..start]
            .chars()
            .last()
            .is_some_and(|c| c.is_ascii_alphanumeric());
        let after_ok = !lower[end..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric());

        if before_ok && after_ok {
            return true;
        }
        search_from = start + word.chars().next().map_or(1, char::len_utf8);
    }
    false
}

/// Parses a Chinese numeral up to 99 (`"五"`, `"十"`, `"十五"`, `"二十"`, `"两"`).
pub(crate) fn parse_cjk_number(s: &str) -> Option<u32> {
    fn digit(c: char) -> Option<u32> {
        match c {
            '零' => Some(0),
            '一' => Some(1),
            '二' | '两' => Some(2),
            '三' => Some(3),
            '四' => Some(4),
            '五' => Some(5),
            '六' => Some(6),
            '七' => Some(7),
            '八' => Some(8),
            '九' => Some(9),
            _ => None,
        }
    }

    let chars: Vec<char> = s.chars().collect();
    match chars.as_slice() {
        [] => None,
        [c] if *c == '十' => Some(10),
        [c] => digit(*c),
        ['十', ones] => digit(*ones).map(|d| 10 + d),
        [tens, '十'] => digit(*tens).map(|d| d * 10),
        [tens, '十', ones] => Some(digit(*tens)? * 10 + digit(*ones)?),
        _ => None,
    }
}

/// Parses the integer part of an ASCII decimal (`"3.5"` -> 3).
pub(crate) fn parse_integer_part(s: &str) -> Option<u32> {
    s.split('.').next()?.parse::<u32>().ok()
}
