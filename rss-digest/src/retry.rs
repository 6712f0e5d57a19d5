use crate::types::{DigestError, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self { max_retries, initial_delay }
    }

    fn backoff(&self) -> ExponentialBackoff<backoff::SystemClock> {
        ExponentialBackoff {
            current_interval: self.initial_delay,
            initial_interval: self.initial_delay,
            max_interval: self.initial_delay * 32,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or the retries run out.
    ///
    /// Only errors for which [`DigestError::is_transient`] holds are retried.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = self.backoff();
        let mut attempt = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = backoff.next_backoff().unwrap_or(self.initial_delay);
                    attempt += 1;
                    warn!("Attempt {} failed for {}: {}, retrying in {:?}", attempt, label, e, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(500))
    }
}

/// Consumes a non-2xx response, keeping the server's error text for the diagnostic.
pub(crate) async fn status_error(url: &str, response: reqwest::Response) -> DigestError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    DigestError::Status {
        url: url.to_string(),
        status,
        detail: body_detail(&body),
    }
}

/// `code`/`msg` from a JSON error body. Other bodies are not kept.
fn body_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let code = value.get("code").and_then(Value::as_i64);
    let msg = value
        .get("msg")
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty());

    match (code, msg) {
        (Some(code), Some(msg)) => Some(format!("code {}: {}", code, msg)),
        (None, Some(msg)) => Some(msg.to_string()),
        (Some(code), None) => Some(format!("code {}", code)),
        (None, None) => None,
    }
}
