//! Authenticated request executor shared by the row and blob stores.

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_runtime::config::RemoteEndpoint;
use core_runtime::logging::redact_url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{RemoteError, Result};

/// Attempts made for rate-limited or failing requests
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes requests against the hosted backend with its API key attached.
#[derive(Clone)]
pub struct RestClient {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    api_key: String,
    max_attempts: u32,
    base_backoff: Duration,
}

impl RestClient {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(100),
        }
    }

    pub fn from_endpoint(http_client: Arc<dyn HttpClient>, endpoint: &RemoteEndpoint) -> Self {
        Self::new(http_client, &endpoint.base_url, &endpoint.api_key)
    }

    /// Override retry attempts and the first backoff delay
    pub fn with_retry(mut self, max_attempts: u32, base_backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.base_backoff = base_backoff;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path under the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Request for `path` carrying the API key headers
    pub fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest::new(method, self.url(path))
            .header("apikey", self.api_key.clone())
            .bearer_token(self.api_key.clone())
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
    }

    /// Request with a JSON body
    pub fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &T,
    ) -> Result<HttpRequest> {
        Ok(self.request(method, path).json(body)?)
    }

    /// Execute a request, retrying 429 and 5xx responses with exponential
    /// backoff. Other non-2xx statuses fail immediately.
    #[instrument(skip(self, request), fields(method = ?request.method, url = %redact_url(&request.url)))]
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.http_client.execute(request.clone()).await {
                Ok(response) if response.is_success() => {
                    debug!(status = response.status, "Remote request succeeded");
                    return Ok(response);
                }
                Ok(response) if is_retryable(response.status) => {
                    if attempt >= self.max_attempts {
                        warn!(
                            "Remote request failed after {} attempts: status={}",
                            attempt, response.status
                        );
                        return Err(RemoteError::RetriesExhausted {
                            attempts: attempt,
                            status_code: response.status,
                        });
                    }

                    let backoff = self.backoff(attempt);
                    warn!(
                        "Remote request failed (attempt {}/{}): status={}, retrying in {:?}",
                        attempt, self.max_attempts, response.status, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Ok(response) => {
                    warn!("Remote request failed: status={}", response.status);
                    return Err(RemoteError::Api {
                        status_code: response.status,
                        message: String::from_utf8_lossy(&response.body).to_string(),
                    });
                }
                Err(e) => {
                    if attempt >= self.max_attempts {
                        warn!("Remote request failed after {} attempts: {}", attempt, e);
                        return Err(e.into());
                    }

                    let backoff = self.backoff(attempt);
                    warn!(
                        "Remote request failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt, self.max_attempts, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// Execute and parse the JSON body
    pub async fn send_json<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        let response = self.send(request).await?;
        parse_json(&response.body)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

fn is_retryable(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| RemoteError::Parse(e.to_string()))
}
