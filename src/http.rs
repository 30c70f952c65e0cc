use anyhow::{anyhow, Result};
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; KabuStopBot/1.0)";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const FETCH_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 500;

/// Statuses worth retrying on the fetch path: rate limiting and transient
/// server errors. Everything else fails immediately.
const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

pub fn new_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// GET a page as text, with a small retry budget and exponential backoff.
/// Only the listing/article fetches go through here; the publish call is
/// never auto-retried.
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let mut delay = Duration::from_millis(BACKOFF_BASE_MS);
    let mut last_err = None;

    for attempt in 1..=FETCH_ATTEMPTS {
        match client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response.text().await?);
                }
                let err = anyhow!("GET {} returned HTTP {}", url, status);
                if !RETRYABLE_STATUSES.contains(&status.as_u16()) {
                    return Err(err);
                }
                last_err = Some(err);
            }
            Err(e) => last_err = Some(anyhow!(e).context(format!("GET {} failed", url))),
        }

        if attempt < FETCH_ATTEMPTS {
            debug!(
                "retrying {} in {:?} (attempt {}/{})",
                url, delay, attempt, FETCH_ATTEMPTS
            );
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("GET {} failed", url)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response per connection, in order. mockito
    /// cannot vary the status across hits of one route, and the retry loop
    /// needs exactly that.
    async fn serve_sequence(responses: Vec<&'static str>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        (url, hits)
    }

    const FAIL_500: &str =
        "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
    const OK_200: &str =
        "HTTP/1.1 200 OK\r\ncontent-length: 5\r\nconnection: close\r\n\r\nhello";

    #[tokio::test]
    async fn test_fetch_text_recovers_after_transient_errors() {
        // Two 500s, then a 200: the retry loop must come back with the body
        // and have issued exactly three requests.
        let (url, hits) = serve_sequence(vec![FAIL_500, FAIL_500, OK_200]).await;

        let client = new_client();
        let body = fetch_text(&client, &url).await.unwrap();
        assert_eq!(body, "hello");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_text_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .with_status(200)
            .with_body("hello")
            .create_async()
            .await;

        let client = new_client();
        let body = fetch_text(&client, &format!("{}/page", server.url()))
            .await
            .unwrap();
        assert_eq!(body, "hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_text_404_fails_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let client = new_client();
        let err = fetch_text(&client, &format!("{}/missing", server.url()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_text_retries_server_errors_until_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = new_client();
        let err = fetch_text(&client, &format!("{}/flaky", server.url()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
        mock.assert_async().await;
    }
}
