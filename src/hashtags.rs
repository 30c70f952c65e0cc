use chrono::{Datelike, NaiveDate, Weekday};

pub const MAX_TAGS: usize = 7;

/// Three fixed sets, rotated by weekday so followers don't see the same
/// tag line every day.
const SET_ONE: [&str; 5] = [
    "#日本株",
    "#株式投資",
    "#ストップ高",
    "#ストップ安",
    "#デイトレ",
];
const SET_TWO: [&str; 5] = [
    "#日本株",
    "#投資",
    "#ストップ高",
    "#ストップ安",
    "#株クラ",
];
const SET_THREE: [&str; 5] = [
    "#日本株",
    "#個別株",
    "#ストップ高",
    "#ストップ安",
    "#相場",
];

/// Pick the day's hashtags: set 1 on Mon/Thu, set 2 on Tue/Fri, set 3
/// otherwise. An explicit override (1-3) wins over the date. Extra tags are
/// appended, then the list is capped at MAX_TAGS. Pure function of its
/// inputs.
pub fn select_tags(
    date: NaiveDate,
    override_set: Option<u8>,
    extra: Option<&str>,
) -> Vec<String> {
    let base: &[&str] = match override_set {
        Some(1) => &SET_ONE,
        Some(2) => &SET_TWO,
        Some(3) => &SET_THREE,
        _ => match date.weekday() {
            Weekday::Mon | Weekday::Thu => &SET_ONE,
            Weekday::Tue | Weekday::Fri => &SET_TWO,
            _ => &SET_THREE,
        },
    };

    let mut tags: Vec<String> = base.iter().map(|t| t.to_string()).collect();
    if let Some(extra) = extra {
        for tag in extra.split_whitespace() {
            let tag = if tag.starts_with('#') {
                tag.to_string()
            } else {
                format!("#{}", tag)
            };
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags.truncate(MAX_TAGS);
    tags
}
