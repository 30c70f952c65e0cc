use crate::composer;
use crate::config::Config;
use crate::error::RunError;
use crate::extractor;
use crate::hashtags;
use crate::holiday::HolidayCalendar;
use crate::http;
use crate::locator;
use crate::publisher::Publisher;
use chrono::NaiveDate;
use chrono_tz::Asia::Tokyo;
use tracing::{info, warn};

/// How a run ended when nothing went wrong.
#[derive(Debug)]
pub enum RunOutcome {
    /// Weekend or public holiday: nothing to report.
    HolidaySkip,
    /// Article found but no stocks extracted from either section; posting
    /// is skipped but the run still succeeds.
    EmptyExtraction,
    /// Composed and printed, publishing deliberately skipped.
    DryRun { text: String },
    Posted { text: String },
}

pub fn today_jst() -> NaiveDate {
    chrono::Utc::now().with_timezone(&Tokyo).date_naive()
}

/// One end-to-end run: holiday check, locate article, extract, compose,
/// publish. `publisher` is `None` when credentials are incomplete; that only
/// matters once the flow actually reaches the publish step.
pub async fn run(
    config: &Config,
    today: NaiveDate,
    calendar: &dyn HolidayCalendar,
    publisher: Option<&dyn Publisher>,
) -> Result<RunOutcome, RunError> {
    if calendar.is_holiday(today).await {
        info!("{} is a weekend or holiday, skipping", today);
        return Ok(RunOutcome::HolidaySkip);
    }

    let client = http::new_client();
    let article = locator::locate_article(&client, &config.base_url, config.session)
        .await
        .map_err(RunError::Fetch)?;
    let Some(article) = article else {
        return Err(RunError::NoArticle);
    };
    info!("located report article: {}", article.title);

    let (ups, downs) = extractor::extract_stops(&client, &article.url)
        .await
        .map_err(RunError::Fetch)?;
    if ups.is_empty() && downs.is_empty() {
        warn!(
            "no stocks extracted from {}; the article format may have changed",
            article.url
        );
        return Ok(RunOutcome::EmptyExtraction);
    }
    info!("extracted {} limit-up, {} limit-down", ups.len(), downs.len());

    let tags = hashtags::select_tags(today, config.hashtag_set, config.extra_tags.as_deref());
    let text = composer::compose_post(
        config.session,
        today,
        &ups,
        &downs,
        &article.title,
        &article.url,
        &tags,
    );

    // Operational contract: the post and its length always reach stdout
    // before any publish attempt.
    println!("{}", text);
    println!("({} 文字)", text.chars().count());

    if config.dry_run {
        return Ok(RunOutcome::DryRun { text });
    }
    let Some(publisher) = publisher else {
        let missing = config.credentials().err().unwrap_or_default();
        return Err(RunError::MissingCredentials(missing));
    };
    publisher.publish(&text).await?;
    Ok(RunOutcome::Posted { text })
}
