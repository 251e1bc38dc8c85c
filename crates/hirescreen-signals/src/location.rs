//! City extraction from free-text locations.

const SEPARATORS: &[char] = &[
    '-', '－', '—', '·', '/', '|', ',', '，', '、', ' ', '\t', '>', '＞',
];

/// Province-level qualifiers that precede the city in "省-市" style strings.
const REGION_NAMES: &[&str] = &[
    "中国", "河北", "山西", "辽宁", "吉林", "黑龙江", "江苏", "浙江", "安徽", "福建", "江西",
    "山东", "河南", "湖北", "湖南", "广东", "海南", "四川", "贵州", "云南", "陕西", "甘肃",
    "青海", "台湾", "内蒙古", "广西", "西藏", "宁夏", "新疆", "china",
];

const REGION_SUFFIXES: &[&str] = &["省", "自治区", "特别行政区"];

/// Extracts a normalised city token from a location string.
///
/// With a non-empty `known_locations`, the longest known location contained
/// in the text wins. Otherwise the text is split on separators: the last
/// segment is used when the first looks like a province or region, else the
/// first segment. A trailing `市` is dropped.
#[must_use]
pub fn parse_location_city(text: &str, known_locations: &[String]) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(known) = longest_known_match(trimmed, known_locations) {
        return Some(known);
    }

    let segments: Vec<&str> = trimmed
        .split(SEPARATORS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let chosen = match segments.as_slice() {
        [] => return None,
        [only] => *only,
        [first, .., last] if looks_like_region(first) => *last,
        [first, ..] => *first,
    };

    let city = strip_city_suffix(chosen);
    if city.is_empty() {
        None
    } else {
        Some(city.to_lowercase())
    }
}

fn longest_known_match(text: &str, known_locations: &[String]) -> Option<String> {
    let lower = text.to_lowercase();
    let mut candidates: Vec<&String> = known_locations
        .iter()
        .filter(|loc| !loc.trim().is_empty())
        .collect();
    candidates.sort_by(|a, b| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.cmp(b))
    });

    candidates
        .into_iter()
        .find(|loc| lower.contains(&loc.trim().to_lowercase()))
        .map(|loc| strip_city_suffix(loc.trim()).to_lowercase())
}

fn looks_like_region(segment: &str) -> bool {
    let lower = segment.to_lowercase();
    REGION_SUFFIXES.iter().any(|s| lower.ends_with(s))
        || REGION_NAMES.iter().any(|name| lower == *name)
}

fn strip_city_suffix(segment: &str) -> &str {
    match segment.strip_suffix('市') {
        Some(rest) if !rest.is_empty() => rest,
        _ => segment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn plain_city() {
        assert_eq!(parse_location_city("上海", &[]), Some("上海".into()));
        assert_eq!(parse_location_city("上海市", &[]), Some("上海".into()));
    }

    #[test]
    fn province_prefix_takes_last_segment() {
        assert_eq!(parse_location_city("广东省-深圳市", &[]), Some("深圳".into()));
        assert_eq!(parse_location_city("浙江·杭州", &[]), Some("杭州".into()));
        assert_eq!(
            parse_location_city("广东省 / 广州 / 天河区", &[]),
            Some("天河区".into())
        );
    }

    #[test]
    fn city_first_takes_first_segment() {
        assert_eq!(parse_location_city("北京-朝阳区", &[]), Some("北京".into()));
        assert_eq!(parse_location_city("Beijing, Haidian", &[]), Some("beijing".into()));
    }

    #[test]
    fn known_locations_longest_match_first() {
        let vocab = known(&["广州", "州", "深圳"]);
        assert_eq!(
            parse_location_city("期望工作地：广州天河", &vocab),
            Some("广州".into())
        );
    }

    #[test]
    fn known_locations_fall_back_to_splitting() {
        let vocab = known(&["成都"]);
        assert_eq!(parse_location_city("湖北省-武汉市", &vocab), Some("武汉".into()));
    }

    #[test]
    fn empty_is_unknown() {
        assert_eq!(parse_location_city("", &[]), None);
        assert_eq!(parse_location_city(" - / ", &[]), None);
    }

    #[test]
    fn lone_shi_is_kept() {
        assert_eq!(parse_location_city("市", &[]), Some("市".into()));
    }
}
