use reqwest::{Client, Response};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::limiter::RequestSpacer;
use crate::retry::RetryPolicy;

/// Transport failure after the retry budget was spent. Non-2xx responses
/// are not errors here: the engine maps them to `HTTP_<code>` itself.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed after {attempts} attempts: {source}")]
    Network {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
}

/// Polite HTTP GET client: configured User-Agent, redirects followed,
/// split connect/read timeouts, retry with backoff on throttling and
/// transient server errors, and a global minimum spacing between the
/// start of any two requests.
pub struct Fetcher {
    client: Client,
    retry: RetryPolicy,
    spacer: RequestSpacer,
}

impl Fetcher {
    pub fn new(
        user_agent: &str,
        connect_timeout: Duration,
        read_timeout: Duration,
        retry: RetryPolicy,
        spacer: RequestSpacer,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client, retry, spacer })
    }

    /// Fetches `url`, retrying per policy. A retryable status with the
    /// budget exhausted returns the final response so the caller can
    /// record its code; only transport errors become [`FetchError`].
    ///
    /// Bodies are not read here. Callers stream or buffer as appropriate,
    /// so large PDF/media payloads never have to fit in memory.
    pub async fn get(&self, url: &str) -> Result<Response, FetchError> {
        let mut retries_used = 0u32;
        loop {
            self.spacer.wait().await;
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if self.retry.should_retry(status) && retries_used < self.retry.total {
                        retries_used += 1;
                        let backoff = self.retry.backoff_duration(retries_used);
                        debug!(
                            url = %url,
                            status = status,
                            retry = retries_used,
                            backoff_ms = backoff.as_millis() as u64,
                            "retryable status, backing off"
                        );
                        sleep(backoff).await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(source) => {
                    if retries_used < self.retry.total {
                        retries_used += 1;
                        let backoff = self.retry.backoff_duration(retries_used);
                        warn!(
                            url = %url,
                            error = %source,
                            retry = retries_used,
                            backoff_ms = backoff.as_millis() as u64,
                            "request failed, backing off"
                        );
                        sleep(backoff).await;
                        continue;
                    }
                    return Err(FetchError::Network {
                        url: url.to_string(),
                        attempts: retries_used + 1,
                        source,
                    });
                }
            }
        }
    }
}
