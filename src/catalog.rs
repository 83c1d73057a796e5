use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{DeckError, DeckResult};
use crate::settings::Settings;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_secs(2);
/// Longest single wait; a longer `Retry-After` ends the batch instead.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How `get_json` reacts to 429 and 5xx responses.
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_retries: u32,
    base_backoff: Duration,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_backoff: BASE_BACKOFF,
            max_backoff: MAX_BACKOFF,
        }
    }
}

/// The slice of the remote catalog the pipeline talks to.
///
/// Responses are handed back as raw JSON; shape checking is the fetcher's job
/// so a malformed page can end a run without failing it.
#[allow(async_fn_in_trait)]
pub trait CatalogApi {
    /// One page of playlist entries: `{ items: [{ track: {..} }], next: url|null }`.
    async fn playlist_items(&self, playlist_id: &str, limit: usize, offset: usize)
        -> DeckResult<Value>;

    /// A single track object.
    async fn track(&self, track_id: &str) -> DeckResult<Value>;

    async fn playlist_name(&self, playlist_id: &str) -> DeckResult<String>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct PlaylistName {
    name: String,
}

/// Authenticated Web API client. Built once per run and passed by reference.
pub struct SpotifyClient {
    http: Client,
    api_base: String,
    token: String,
    retry: RetryPolicy,
}

impl SpotifyClient {
    /// Exchange client credentials for a bearer token.
    pub async fn connect(settings: &Settings) -> DeckResult<Self> {
        let (client_id, client_secret) = settings.credentials()?;
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(DeckError::upstream)?;

        info!("Fetching access token from {}", settings.token_url);
        let token = http
            .post(&settings.token_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(DeckError::upstream)?
            .json::<TokenResponse>()
            .await
            .map_err(DeckError::upstream)?
            .access_token;

        Ok(Self {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            token,
            retry: RetryPolicy::default(),
        })
    }

    /// Cheap authenticated call to confirm the token works.
    pub async fn ping(&self) -> DeckResult<()> {
        self.get_json(
            "/search",
            &[("q", "test".into()), ("type", "track".into()), ("limit", "1".into())],
        )
        .await?;
        Ok(())
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> DeckResult<Value> {
        let url = format!("{}{}", self.api_base, path);
        let mut attempt = 0;
        loop {
            let response = self
                .http
                .get(&url)
                .bearer_auth(&self.token)
                .query(query)
                .send()
                .await
                .map_err(DeckError::upstream)?;

            let status = response.status();
            if status.is_success() {
                return response.json::<Value>().await.map_err(DeckError::upstream);
            }

            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if !retryable || attempt == self.retry.max_retries {
                return Err(DeckError::upstream(format!("GET {path} returned {status}")));
            }

            let backoff = match retry_after(response.headers()) {
                Some(wait) if wait > self.retry.max_backoff => {
                    return Err(DeckError::upstream(format!(
                        "GET {path} returned {status} with Retry-After {}s",
                        wait.as_secs()
                    )));
                }
                Some(wait) => wait,
                None => (self.retry.base_backoff * 2u32.pow(attempt)).min(self.retry.max_backoff),
            };
            warn!(
                "{} on {} (attempt {}/{}), backing off {:.1}s",
                status,
                path,
                attempt + 1,
                self.retry.max_retries,
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}

impl CatalogApi for SpotifyClient {
    async fn playlist_items(
        &self,
        playlist_id: &str,
        limit: usize,
        offset: usize,
    ) -> DeckResult<Value> {
        self.get_json(
            &format!("/playlists/{playlist_id}/tracks"),
            &[("limit", limit.to_string()), ("offset", offset.to_string())],
        )
        .await
    }

    async fn track(&self, track_id: &str) -> DeckResult<Value> {
        self.get_json(&format!("/tracks/{track_id}"), &[]).await
    }

    async fn playlist_name(&self, playlist_id: &str) -> DeckResult<String> {
        let value = self
            .get_json(&format!("/playlists/{playlist_id}"), &[("fields", "name".into())])
            .await?;
        let PlaylistName { name } = serde_json::from_value(value).map_err(DeckError::upstream)?;
        Ok(name)
    }
}

/// `Retry-After` in delay-seconds form; HTTP-date values are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use reqwest::header::HeaderValue;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    const OK_PAGE: &str = r#"{"items":[],"next":null}"#;

    fn status_line(status: u16) -> &'static str {
        match status {
            200 => "200 OK",
            404 => "404 Not Found",
            429 => "429 Too Many Requests",
            _ => "503 Service Unavailable",
        }
    }

    /// Serves `responses` in order, one per connection, repeating the last one.
    /// Returns the base URL and a counter of requests seen.
    async fn serve(responses: Vec<(u16, Option<u64>)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, wait) = responses[n.min(responses.len() - 1)];

                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(read) => request.extend_from_slice(&buf[..read]),
                    }
                }

                let body = if status == 200 { OK_PAGE } else { "" };
                let retry = wait
                    .map(|secs| format!("Retry-After: {secs}\r\n"))
                    .unwrap_or_default();
                let response = format!(
                    "HTTP/1.1 {}\r\n{retry}Content-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    status_line(status),
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (format!("http://{addr}"), hits)
    }

    fn client(api_base: String) -> SpotifyClient {
        SpotifyClient {
            http: Client::builder().timeout(REQUEST_TIMEOUT).build().unwrap(),
            api_base,
            token: "test-token".into(),
            retry: RetryPolicy {
                max_retries: 2,
                base_backoff: Duration::from_millis(10),
                max_backoff: Duration::from_secs(1),
            },
        }
    }

    #[test]
    fn retry_after_reads_delay_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 7 "));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }

    #[tokio::test]
    async fn long_retry_after_gives_up_at_once() {
        let (base, hits) = serve(vec![(429, Some(86_400))]).await;
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            client(base).playlist_items("p", 100, 0),
        )
        .await
        .expect("request should not wait out the Retry-After");

        assert!(matches!(result, Err(DeckError::UpstreamUnavailable(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rate_limit_then_success() {
        let (base, hits) = serve(vec![(429, Some(0)), (200, None)]).await;
        let page = client(base).playlist_items("p", 100, 0).await.unwrap();

        assert_eq!(page["items"], serde_json::json!([]));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn server_errors_exhaust_retries() {
        let (base, hits) = serve(vec![(503, None)]).await;
        let err = client(base).track("t").await.unwrap_err();

        assert!(err.to_string().contains("503"));
        assert!(matches!(err, DeckError::UpstreamUnavailable(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (base, hits) = serve(vec![(404, None)]).await;
        let err = client(base).track("missing").await.unwrap_err();

        assert!(matches!(err, DeckError::UpstreamUnavailable(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
