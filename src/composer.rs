use crate::config::Session;
use crate::extractor::StopItem;
use chrono::NaiveDate;

/// Hard ceiling on the post, in Unicode scalar values, never bytes.
pub const MAX_POST_CHARS: usize = 280;

/// How many stocks each list shows before any shrinking.
const MAX_VISIBLE: usize = 10;

/// Tag count for the reduced-hashtag fallback step.
const REDUCED_TAG_COUNT: usize = 5;

/// Render the post, degrading step by step until it fits:
/// shrink the limit-up list one item at a time, then the limit-down list,
/// then drop to the first five hashtags, and as a last resort hard-truncate.
/// The stock lists carry the information, so they shrink before the tags;
/// truncation exists only to make the length invariant unconditional.
pub fn compose_post(
    session: Session,
    date: NaiveDate,
    ups: &[StopItem],
    downs: &[StopItem],
    title: &str,
    url: &str,
    tags: &[String],
) -> String {
    for (up_count, down_count) in shrink_steps() {
        let text = render(session, date, ups, downs, title, url, tags, up_count, down_count);
        if char_len(&text) <= MAX_POST_CHARS {
            return text;
        }
    }

    let reduced: Vec<String> = tags.iter().take(REDUCED_TAG_COUNT).cloned().collect();
    let text = render(session, date, ups, downs, title, url, &reduced, 1, 1);
    if char_len(&text) <= MAX_POST_CHARS {
        return text;
    }
    text.chars().take(MAX_POST_CHARS).collect()
}

/// The ordered degradation schedule: (10,10), (9,10) .. (1,10), (1,9) ..
/// (1,1).
fn shrink_steps() -> impl Iterator<Item = (usize, usize)> {
    let shrink_up = (1..=MAX_VISIBLE).rev().map(|n| (n, MAX_VISIBLE));
    let shrink_down = (1..MAX_VISIBLE).rev().map(|n| (1, n));
    shrink_up.chain(shrink_down)
}

#[allow(clippy::too_many_arguments)]
fn render(
    session: Session,
    date: NaiveDate,
    ups: &[StopItem],
    downs: &[StopItem],
    title: &str,
    url: &str,
    tags: &[String],
    up_count: usize,
    down_count: usize,
) -> String {
    format!(
        "【{}のストップ高/安 {}】\nS高: {}\nS安: {}\n出典: 株探（{}）\n{}\n詳細: {}",
        session,
        date.format("%Y-%m-%d"),
        format_items(ups, up_count),
        format_items(downs, down_count),
        title,
        tags.join(" "),
        url,
    )
}

fn format_items(items: &[StopItem], visible: usize) -> String {
    if items.is_empty() {
        return "なし".to_string();
    }
    items
        .iter()
        .take(visible)
        .map(|item| format!("{} {}", item.code, item.name))
        .collect::<Vec<_>>()
        .join(" / ")
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 28).unwrap()
    }

    fn tags() -> Vec<String> {
        crate::hashtags::select_tags(date(), None, None)
    }

    fn items(count: usize, name: &str) -> Vec<StopItem> {
        (0..count)
            .map(|i| StopItem {
                code: format!("{:04}", 1000 + i),
                name: name.to_string(),
            })
            .collect()
    }

    fn stock_line<'a>(text: &'a str, prefix: &str) -> &'a str {
        text.lines()
            .find(|line| line.starts_with(prefix))
            .unwrap_or("")
    }

    fn visible_count(text: &str, prefix: &str) -> usize {
        let line = stock_line(text, prefix);
        if line.ends_with("なし") {
            return 0;
        }
        line.matches(" / ").count() + 1
    }

    const TITLE: &str = "本日の【ストップ高／ストップ安】　前場";
    const URL: &str = "https://kabutan.jp/news/marketnews/?b=n202508280123";

    #[test]
    fn test_short_lists_render_in_full() {
        let text = compose_post(
            Session::Morning,
            date(),
            &items(2, "トヨタ自動車"),
            &items(1, "ソニーグループ"),
            TITLE,
            URL,
            &tags(),
        );
        assert!(text.starts_with("【前場のストップ高/安 2025-08-28】"));
        assert_eq!(visible_count(&text, "S高:"), 2);
        assert_eq!(visible_count(&text, "S安:"), 1);
        assert!(text.contains("出典: 株探（"));
        assert!(text.contains("詳細: https://kabutan.jp"));
    }

    #[test]
    fn test_empty_lists_render_none_marker() {
        let text = compose_post(
            Session::Afternoon,
            date(),
            &[],
            &items(1, "ソニーグループ"),
            TITLE,
            URL,
            &tags(),
        );
        assert!(text.contains("S高: なし"));
        assert!(!text.contains("S安: なし"));
    }

    #[test]
    fn test_length_invariant_with_full_lists() {
        // 20 items per section with long names, the extraction cap.
        let long = "長い会社名の長い会社名の長い会社名ホールディングス";
        let text = compose_post(
            Session::Morning,
            date(),
            &items(20, long),
            &items(20, long),
            TITLE,
            URL,
            &tags(),
        );
        assert!(text.chars().count() <= MAX_POST_CHARS);
    }

    #[test]
    fn test_limit_up_list_shrinks_first() {
        // Names sized so that 10+10 overflows but a reduced up list fits.
        let name = "株式会社テスト銘柄ホールディングス";
        let text = compose_post(
            Session::Morning,
            date(),
            &items(10, name),
            &items(10, name),
            TITLE,
            URL,
            &tags(),
        );
        assert!(text.chars().count() <= MAX_POST_CHARS);
        let up = visible_count(&text, "S高:");
        let down = visible_count(&text, "S安:");
        assert!(up < 10, "limit-up list should have been reduced, got {}", up);
        // The down list only shrinks after the up list bottoms out.
        if down < 10 {
            assert_eq!(up, 1);
        }
    }

    #[test]
    fn test_composition_is_deterministic() {
        let ups = items(10, "トヨタ自動車");
        let downs = items(4, "ソニーグループ");
        let t = tags();
        let a = compose_post(Session::Morning, date(), &ups, &downs, TITLE, URL, &t);
        let b = compose_post(Session::Morning, date(), &ups, &downs, TITLE, URL, &t);
        assert_eq!(a, b);
    }

    #[test]
    fn test_hard_truncation_is_last_resort() {
        // A pathological title forces truncation to exactly the cap.
        let title: String = "長".repeat(400);
        let text = compose_post(
            Session::Morning,
            date(),
            &items(1, "トヨタ自動車"),
            &[],
            &title,
            URL,
            &tags(),
        );
        assert_eq!(text.chars().count(), MAX_POST_CHARS);
    }

    #[test]
    fn test_shrink_schedule_order() {
        let steps: Vec<(usize, usize)> = shrink_steps().collect();
        assert_eq!(steps.first(), Some(&(10, 10)));
        assert_eq!(steps[1], (9, 10));
        assert_eq!(steps[10], (1, 9));
        assert_eq!(steps.last(), Some(&(1, 1)));
        assert_eq!(steps.len(), 19);
    }
}
