use crate::http;
use anyhow::Result;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// One stock that hit its price limit: 4-5 digit ticker code plus name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopItem {
    pub code: String,
    pub name: String,
}

pub const MAX_ITEMS_PER_SECTION: usize = 20;

/// How many sibling elements to walk past a section heading before giving
/// up. Bounds the scan on pages where the closing boundary never appears.
const SIBLING_LOOKAHEAD: usize = 150;

const UP_MARKER: &str = "ストップ高の銘柄一覧";
const DOWN_MARKER: &str = "ストップ安の銘柄一覧";
const UP_KEYWORD: &str = "ストップ高";
const DOWN_KEYWORD: &str = "ストップ安";
const LIST_SYMBOL: char = '●';

/// Fetch the report article and extract both stop lists.
pub async fn extract_stops(
    client: &reqwest::Client,
    article_url: &str,
) -> Result<(Vec<StopItem>, Vec<StopItem>)> {
    let html = http::fetch_text(client, article_url).await?;
    Ok(parse_stops(&html))
}

/// Extract the (limit-up, limit-down) stock lists from article HTML.
/// A missing section yields an empty list, never an error; both lists empty
/// usually means the article template changed, and is the caller's problem.
pub fn parse_stops(html: &str) -> (Vec<StopItem>, Vec<StopItem>) {
    let document = Html::parse_document(html);
    let ups = extract_section(&document, UP_MARKER, UP_KEYWORD);
    let downs = extract_section(&document, DOWN_MARKER, DOWN_KEYWORD);
    (ups, downs)
}

fn extract_section(document: &Html, marker: &str, keyword: &str) -> Vec<StopItem> {
    let headings =
        Selector::parse("h1, h2, h3, h4, p, dt, strong, b").expect("static selector");
    let Some(heading) = document
        .select(&headings)
        .find(|el| element_text(el).contains(marker))
    else {
        return Vec::new();
    };

    let mut items = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut visited = 0usize;

    'walk: for node in heading.next_siblings() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        visited += 1;
        if visited > SIBLING_LOOKAHEAD {
            break;
        }

        let collect = is_block(element.value().name());
        for raw in element_text(&element).lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            // A list-marker line for the *other* section bounds the scan;
            // the article has no closing delimiter of its own.
            if line.contains(LIST_SYMBOL)
                && (line.contains(UP_KEYWORD) || line.contains(DOWN_KEYWORD))
                && !line.contains(keyword)
            {
                break 'walk;
            }
            if !collect {
                continue;
            }

            let Some(code) = bracket_code(line).or_else(|| bare_code(line)) else {
                continue;
            };
            let name = trim_name(&strip_code_brackets(line));
            if name.is_empty() || seen.contains(&code) {
                continue;
            }
            seen.insert(code.clone());
            items.push(StopItem { code, name });
        }
    }

    items.truncate(MAX_ITEMS_PER_SECTION);
    items
}

fn is_block(name: &str) -> bool {
    // Containers are included so entries nested in a sibling <ul> or
    // <table> still surface through element_text.
    matches!(
        name,
        "p" | "li" | "div" | "dd" | "td" | "ul" | "ol" | "dl" | "table"
    )
}

/// Element text with one line per text node, mirroring how the article
/// separates entries with <br> tags.
fn element_text(element: &ElementRef) -> String {
    element.text().collect::<Vec<_>>().join("\n")
}

/// A 4-5 digit code in wide or ASCII brackets, e.g. ＜7203＞. Five digits
/// covers the newer TSE code ranges; alphanumeric codes such as ＜285A＞
/// are deliberately not matched.
fn bracket_code(line: &str) -> Option<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '＜' || chars[i] == '<' {
            let mut j = i + 1;
            let mut digits = String::new();
            while j < chars.len() && chars[j].is_ascii_digit() {
                digits.push(chars[j]);
                j += 1;
            }
            if j < chars.len()
                && (chars[j] == '＞' || chars[j] == '>')
                && (4..=5).contains(&digits.len())
            {
                return Some(digits);
            }
            i = j;
        }
        i += 1;
    }
    None
}

/// Fallback: the first bare 4-5 digit run bounded by non-digits.
fn bare_code(line: &str) -> Option<String> {
    let mut run = String::new();
    for c in line.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_digit() {
            run.push(c);
        } else {
            if (4..=5).contains(&run.len()) {
                return Some(run);
            }
            run.clear();
        }
    }
    None
}

/// Drop every bracketed segment (the ticker code) from the line.
fn strip_code_brackets(line: &str) -> String {
    let mut out = String::new();
    let mut in_bracket = false;
    for c in line.chars() {
        match c {
            '＜' | '<' => in_bracket = true,
            '＞' | '>' => in_bracket = false,
            _ if !in_bracket => out.push(c),
            _ => {}
        }
    }
    out
}

/// Strip trailing separators the article appends after names.
fn trim_name(s: &str) -> String {
    s.trim()
        .trim_end_matches(|c: char| {
            c.is_whitespace() || matches!(c, '/' | '・' | ',' | ':' | '：' | '-')
        })
        .trim()
        .to_string()
}
