use crate::retry::{status_error, RetryPolicy};
use crate::types::{FetchConfig, Result};
use reqwest::{Client, Response};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

/// Shared HTTP client for feed and article downloads.
///
/// Every request is bounded by the client timeout, so a stalled server counts
/// as a failure instead of blocking the run.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        let retry = RetryPolicy::new(config.max_retries, Duration::from_millis(config.retry_delay_ms));

        Ok(Self { client, config, retry })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// GET `url` as text, retrying transient failures.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        Url::parse(url)?;
        let start_time = Instant::now();

        let content = self
            .retry
            .run(url, || async move {
                let response = self.get(url).await?;
                Ok(response.text().await?)
            })
            .await?;

        info!(
            "Fetched {} ({} bytes in {}ms)",
            url,
            content.len(),
            start_time.elapsed().as_millis()
        );
        Ok(content)
    }

    /// Single-attempt GET used for article pages.
    pub async fn fetch_full_content(&self, url: &str) -> Result<String> {
        debug!("Fetching full content from: {}", url);
        Url::parse(url)?;
        let response = self.get(url).await?;
        Ok(response.text().await?)
    }

    async fn get(&self, url: &str) -> Result<Response> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(status_error(url, response).await);
        }
        Ok(response)
    }
}
