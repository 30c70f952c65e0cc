use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashMap;
use tracing::warn;

/// Date-to-boolean market-closed lookup. The run controller only ever asks
/// one question, so the capability stays this small.
#[async_trait]
pub trait HolidayCalendar: Send + Sync {
    async fn is_holiday(&self, date: NaiveDate) -> bool;
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Fallback calendar: weekends only.
pub struct WeekendOnly;

#[async_trait]
impl HolidayCalendar for WeekendOnly {
    async fn is_holiday(&self, date: NaiveDate) -> bool {
        is_weekend(date)
    }
}

const HOLIDAYS_JP_URL: &str = "https://holidays-jp.github.io/api/v1/date.json";

/// Japanese public holidays from the holidays-jp dataset, on top of the
/// weekend rule. If the dataset cannot be fetched the calendar degrades to
/// weekend-only behavior with a warning instead of failing the run.
pub struct HolidaysJpApi {
    client: reqwest::Client,
    url: String,
}

impl HolidaysJpApi {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: HOLIDAYS_JP_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_url(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }

    /// The dataset maps "YYYY-MM-DD" to the holiday's name.
    async fn fetch_holidays(&self) -> anyhow::Result<HashMap<String, String>> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("holiday dataset returned HTTP {}", response.status());
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl HolidayCalendar for HolidaysJpApi {
    async fn is_holiday(&self, date: NaiveDate) -> bool {
        if is_weekend(date) {
            return true;
        }
        match self.fetch_holidays().await {
            Ok(holidays) => holidays.contains_key(&date.format("%Y-%m-%d").to_string()),
            Err(e) => {
                warn!(
                    "holiday calendar unavailable, falling back to weekend-only: {:#}",
                    e
                );
                false
            }
        }
    }
}
