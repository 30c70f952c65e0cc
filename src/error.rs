use crate::publisher::PublishError;
use thiserror::Error;

/// Process exit statuses, one per failure class, so operational alerting
/// can tell them apart.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const FETCH_FAILED: i32 = 1;
    pub const NO_ARTICLE: i32 = 2;
    pub const MISSING_CREDENTIALS: i32 = 3;
    pub const PUBLISH_FAILED: i32 = 4;
}

/// Terminal failures of a single run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Network or HTTP failure on the listing/article fetch path, after the
    /// retry budget is exhausted.
    #[error("fetch failed: {0:#}")]
    Fetch(#[source] anyhow::Error),

    /// No anchor on the listing page matched today's report title.
    #[error("該当記事が見つかりませんでした。時間をあけて再実行してください。")]
    NoArticle,

    /// One or more of the four posting credentials is unset.
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Fetch(_) => exit_code::FETCH_FAILED,
            RunError::NoArticle => exit_code::NO_ARTICLE,
            RunError::MissingCredentials(_) => exit_code::MISSING_CREDENTIALS,
            RunError::Publish(_) => exit_code::PUBLISH_FAILED,
        }
    }
}
