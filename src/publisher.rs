use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use sha1::Sha1;
use thiserror::Error;
use tracing::debug;

type HmacSha1 = Hmac<Sha1>;

pub const X_STATUS_UPDATE_URL: &str = "https://api.twitter.com/1.1/statuses/update.json";

const NONCE_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("publish rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// The four OAuth 1.0a credential values for the posting account.
#[derive(Debug, Clone)]
pub struct XCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

/// v1.1 rejection payload: `{"errors":[{"code":187,"message":"..."}]}`.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorItem {
    code: i64,
    message: String,
}

/// Pull the first API error out of a rejection body; anything that isn't
/// the documented JSON shape passes through untouched.
fn rejection_detail(body: String) -> String {
    serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.errors.into_iter().next())
        .map(|e| format!("{} (code {})", e.message, e.code))
        .unwrap_or(body)
}

/// Sends one composed post. A failed publish is terminal for the run; it is
/// never auto-retried.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, text: &str) -> Result<(), PublishError>;
}

/// Posts to the X v1.1 status-update endpoint with an OAuth 1.0a
/// HMAC-SHA1 signed Authorization header.
pub struct XPublisher {
    credentials: XCredentials,
    client: reqwest::Client,
    endpoint: String,
}

impl XPublisher {
    pub fn new(credentials: XCredentials, client: reqwest::Client) -> Self {
        Self {
            credentials,
            client,
            endpoint: X_STATUS_UPDATE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_endpoint(credentials: XCredentials, client: reqwest::Client, endpoint: String) -> Self {
        Self {
            credentials,
            client,
            endpoint,
        }
    }

    /// Build the OAuth 1.0a header for a POST with a single `status` body
    /// parameter: RFC 3986 encoding throughout, parameters sorted by
    /// encoded key, base string `POST&enc(url)&enc(params)`, signing key
    /// `enc(consumer_secret)&enc(token_secret)`.
    fn authorization_header(&self, status: &str, nonce: &str, timestamp: i64) -> String {
        let timestamp = timestamp.to_string();
        let oauth_params: [(&str, &str); 6] = [
            ("oauth_consumer_key", &self.credentials.api_key),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", &timestamp),
            ("oauth_token", &self.credentials.access_token),
            ("oauth_version", "1.0"),
        ];

        let mut pairs: Vec<(String, String)> = oauth_params
            .iter()
            .map(|(k, v)| (percent_encode(k), percent_encode(v)))
            .collect();
        pairs.push(("status".to_string(), percent_encode(status)));
        pairs.sort();

        let param_string = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let base_string = format!(
            "POST&{}&{}",
            percent_encode(&self.endpoint),
            percent_encode(&param_string)
        );
        let signing_key = format!(
            "{}&{}",
            percent_encode(&self.credentials.api_secret),
            percent_encode(&self.credentials.access_secret)
        );

        let mut mac =
            HmacSha1::new_from_slice(signing_key.as_bytes()).expect("HMAC accepts any key length");
        mac.update(base_string.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        let mut header_params: Vec<(String, String)> = oauth_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        header_params.push(("oauth_signature".to_string(), signature));
        header_params.sort();

        let fields = header_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {}", fields)
    }
}

fn percent_encode(s: &str) -> String {
    // urlencoding leaves exactly the RFC 3986 unreserved set alone, which
    // is what OAuth 1.0a requires.
    urlencoding::encode(s).into_owned()
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

#[async_trait]
impl Publisher for XPublisher {
    async fn publish(&self, text: &str) -> Result<(), PublishError> {
        let authorization = self.authorization_header(text, &nonce(), Utc::now().timestamp());
        debug!("posting {} chars to {}", text.chars().count(), self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", authorization)
            .form(&[("status", text)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body: rejection_detail(body),
            });
        }
        Ok(())
    }
}
