use crate::config::Session;
use crate::http;
use anyhow::Result;
use scraper::{Html, Selector};

/// Today's report article, as located on the market-news listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRef {
    pub title: String,
    pub url: String,
}

const LISTING_PATH: &str = "/news/marketnews/";
const REPORT_TITLE_PREFIX: &str = "本日の【ストップ高／ストップ安】";

/// Fetch the market-news listing and locate today's report for the given
/// session. Network failures are fatal; "no matching article" is not, and
/// comes back as `Ok(None)` for the caller to branch on.
pub async fn locate_article(
    client: &reqwest::Client,
    base_url: &str,
    session: Session,
) -> Result<Option<ArticleRef>> {
    let listing_url = format!("{}{}", base_url, LISTING_PATH);
    let html = http::fetch_text(client, &listing_url).await?;
    Ok(find_report_link(&html, base_url, session))
}

/// Scan every anchor on the listing page for today's report title. The
/// listing accumulates many similarly worded articles, so the match is
/// anchored: the whole anchor text must be the title template plus the
/// session label, and the link must point back into the news section.
pub fn find_report_link(html: &str, base_url: &str, session: Session) -> Option<ArticleRef> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a").expect("static selector");

    for anchor in document.select(&anchors) {
        let text: String = anchor.text().collect::<Vec<_>>().join("");
        let text = text.trim();
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if title_matches(text, session) && href.starts_with(LISTING_PATH) {
            return Some(ArticleRef {
                title: text.to_string(),
                url: format!("{}{}", base_url, href),
            });
        }
    }
    None
}

fn title_matches(text: &str, session: Session) -> bool {
    let Some(rest) = text.strip_prefix(REPORT_TITLE_PREFIX) else {
        return false;
    };
    rest.trim_start_matches(char::is_whitespace) == session.label()
}
