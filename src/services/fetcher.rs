use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{redirect, Client, StatusCode};
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1",
];

const MAX_REDIRECTS: usize = 10;

/// A successfully fetched page. `url` is the final URL after redirects.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub url: String,
    pub body: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GETs `url`. Anything but `200 OK` after the retry policy is an error.
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// When and how long to wait before repeating a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each one after.
    pub backoff: Duration,
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
            retry_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            ..Self::default()
        }
    }

    /// `status` is `None` for transport failures, which are always retryable.
    pub fn should_retry(&self, attempt: u32, status: Option<u16>) -> bool {
        attempt < self.max_attempts
            && status.map_or(true, |code| self.retry_statuses.contains(&code))
    }

    /// Wait before attempt `attempt + 1`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff.saturating_mul(factor)
    }
}

/// Browser-like header set with a user agent drawn from the pool.
pub fn random_headers() -> HeaderMap {
    let user_agent = USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0]);

    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(user_agent));
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        header::REFERER,
        HeaderValue::from_static("https://www.google.com/"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers
}

/// `reqwest`-backed fetcher with a cookie jar shared by every request.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self { client, retry })
    }

    /// Visits the board's home page so later requests carry its cookies.
    /// Failure is logged and otherwise ignored.
    pub async fn warm_up(&self, base_url: &str) -> bool {
        match self.fetch(base_url).await {
            Ok(_) => {
                info!(url = %base_url, "Session initialized");
                true
            }
            Err(err) => {
                warn!(url = %base_url, error = %err, "Failed to initialize session");
                false
            }
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let mut attempt = 1;
        loop {
            let outcome = self
                .client
                .get(url)
                .headers(random_headers())
                .send()
                .await;

            let retry_status = match outcome {
                Ok(response) if response.status() == StatusCode::OK => {
                    let final_url = response.url().to_string();
                    let body = response.text().await?;
                    return Ok(FetchedPage {
                        url: final_url,
                        body,
                    });
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    if !self.retry.should_retry(attempt, Some(status)) {
                        return Err(Error::UnexpectedStatus {
                            url: url.to_string(),
                            status,
                        });
                    }
                    Some(status)
                }
                Err(err) => {
                    let transient = err.is_timeout() || err.is_connect() || err.is_request();
                    if !transient || !self.retry.should_retry(attempt, None) {
                        return Err(err.into());
                    }
                    None
                }
            };

            let delay = self.retry.delay_after(attempt);
            debug!(attempt, ?retry_status, ?delay, "Retrying request");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
