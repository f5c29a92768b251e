use crate::errors::UpstreamError;
use reqwest::Client;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// HTTP client with a per-request timeout and optional retry with backoff
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration, max_retries: u32) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Build(e.to_string()))?;

        Ok(Self {
            client,
            max_retries,
            timeout,
        })
    }

    /// Fetch JSON from `url`. Query parameters are kept out of the logs since
    /// they may carry credentials.
    #[instrument(skip(self, query), fields(url = %url))]
    pub async fn get_json<T>(&self, url: &str, query: &[(&str, &str)]) -> Result<T, UpstreamError>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut attempt = 0;

        loop {
            match self.fetch_with_timeout(url, query).await {
                Ok(response) => {
                    info!(attempt = attempt + 1, "Request successful");
                    return Ok(response);
                }
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    let backoff = backoff_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis(),
                        error = %e,
                        "Request failed, retrying with exponential backoff"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(attempts = attempt + 1, error = %e, "Request failed");
                    return Err(e);
                }
            }
        }
    }

    async fn fetch_with_timeout<T>(&self, url: &str, query: &[(&str, &str)]) -> Result<T, UpstreamError>
    where
        T: serde::de::DeserializeOwned,
    {
        let target = reqwest::Url::parse_with_params(url, query)
            .map_err(|e| UpstreamError::InvalidUrl(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.get(target).send())
            .await
            .map_err(|_| UpstreamError::Timeout(url.to_string()))?
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout(url.to_string())
                } else {
                    UpstreamError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let json: T = serde_json::from_str(&text)?;

        Ok(json)
    }
}

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// 100 ms doubling per attempt, capped at `MAX_BACKOFF`
fn backoff_for(attempt: u32) -> Duration {
    let millis = 2_u64.saturating_pow(attempt).saturating_mul(100);
    Duration::from_millis(millis).min(MAX_BACKOFF)
}

/// Client errors and malformed payloads will not improve on a second attempt.
fn is_retryable(err: &UpstreamError) -> bool {
    match err {
        UpstreamError::Status { status } => *status >= 500 || *status == 429,
        UpstreamError::Timeout(_) | UpstreamError::Network(_) => true,
        UpstreamError::Parse(_) | UpstreamError::InvalidUrl(_) | UpstreamError::Build(_) => false,
    }
}
