use crate::publisher::XCredentials;
use anyhow::{anyhow, Result};
use clap::Parser;
use std::env;
use std::fmt;
use tracing::warn;

/// Which half of the trading day today's report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    Morning,
    Afternoon,
}

impl Session {
    /// The label as it appears in Kabutan article titles.
    pub fn label(&self) -> &'static str {
        match self {
            Session::Morning => "前場",
            Session::Afternoon => "後場",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "前場" => Ok(Session::Morning),
            "後場" => Ok(Session::Afternoon),
            other => Err(anyhow!(
                "invalid session {:?}: expected 前場 or 後場",
                other
            )),
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Parser, Debug, Default)]
#[command(
    name = "kabustop",
    version,
    about = "Posts Kabutan's daily limit-up/limit-down stock lists to X"
)]
pub struct Cli {
    #[arg(long, help = "Trading session, 前場 or 後場 (overrides SESSION)")]
    pub session: Option<String>,

    #[arg(long, help = "Compose and print the post without publishing (overrides DRY_RUN)")]
    pub dry_run: bool,

    #[arg(long, help = "Hashtag set override, 1-3 (overrides HASHTAG_SET)")]
    pub hashtag_set: Option<String>,

    #[arg(long, help = "Extra space-separated hashtags (overrides EXTRA_TAGS)")]
    pub extra_tags: Option<String>,
}

/// All configuration, resolved once at startup. Nothing else in the crate
/// reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub session: Session,
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub access_token: Option<String>,
    pub access_secret: Option<String>,
    pub hashtag_set: Option<u8>,
    pub extra_tags: Option<String>,
    pub dry_run: bool,
}

pub const KABUTAN_BASE: &str = "https://kabutan.jp";

const CREDENTIAL_VARS: [&str; 4] = [
    "TW_API_KEY",
    "TW_API_SECRET",
    "TW_ACCESS_TOKEN",
    "TW_ACCESS_SECRET",
];

impl Config {
    pub fn load(cli: &Cli) -> Result<Self> {
        Self::from_lookup(cli, |key| env::var(key).ok())
    }

    /// Resolution with an injectable environment, so tests never mutate
    /// process-global state. CLI flags win over environment variables.
    fn from_lookup(cli: &Cli, get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let session_raw = cli
            .session
            .clone()
            .or_else(|| get("SESSION"))
            .unwrap_or_else(|| Session::Morning.label().to_string());
        let session = Session::parse(&session_raw)?;

        let hashtag_raw = cli.hashtag_set.clone().or_else(|| get("HASHTAG_SET"));
        let hashtag_set = match hashtag_raw.as_deref() {
            None => None,
            Some(raw) => match raw.parse::<u8>() {
                Ok(n @ 1..=3) => Some(n),
                _ => {
                    warn!("ignoring invalid hashtag set {:?}, expected 1-3", raw);
                    None
                }
            },
        };

        let dry_run = cli.dry_run
            || get("DRY_RUN")
                .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE"))
                .unwrap_or(false);

        Ok(Config {
            session,
            base_url: KABUTAN_BASE.to_string(),
            api_key: get("TW_API_KEY"),
            api_secret: get("TW_API_SECRET"),
            access_token: get("TW_ACCESS_TOKEN"),
            access_secret: get("TW_ACCESS_SECRET"),
            hashtag_set,
            extra_tags: cli.extra_tags.clone().or_else(|| get("EXTRA_TAGS")),
            dry_run,
        })
    }

    /// The four posting credentials, or the comma-joined names of the ones
    /// that are missing.
    pub fn credentials(&self) -> Result<XCredentials, String> {
        let values = [
            &self.api_key,
            &self.api_secret,
            &self.access_token,
            &self.access_secret,
        ];
        let missing: Vec<&str> = CREDENTIAL_VARS
            .iter()
            .zip(values.iter())
            .filter(|(_, v)| v.as_deref().map_or(true, |s| s.is_empty()))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(missing.join(", "));
        }
        Ok(XCredentials {
            api_key: self.api_key.clone().unwrap_or_default(),
            api_secret: self.api_secret.clone().unwrap_or_default(),
            access_token: self.access_token.clone().unwrap_or_default(),
            access_secret: self.access_secret.clone().unwrap_or_default(),
        })
    }
}
