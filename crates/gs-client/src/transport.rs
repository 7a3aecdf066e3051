//! HTTP transport layer for statistics API requests

use gs_core::{Config, Error, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use url::Url;

/// HTTP transport layer for making requests to the statistics API
pub struct Transport {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    max_retries: u32,
}

impl Transport {
    /// Create a new transport instance
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("gs-client/0.1.0")
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
        })
    }

    /// GET `path` with the given query parameters
    #[instrument(skip(self, query), fields(path = %path))]
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let mut url = self.build_url(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        debug!("Making GET request to: {}", url);

        self.send_with_retries(|| self.client.get(url.clone())).await
    }

    /// POST a JSON body to `path`
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.build_url(path)?;
        debug!("Making POST request to: {}", url);

        self.send_with_retries(|| self.client.post(url.clone()).json(body)).await
    }

    async fn send_with_retries<F>(&self, build: F) -> Result<Value>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(2_u64.pow(attempt) * 250); // Exponential backoff
                warn!("Retrying request in {}ms (attempt {})", delay.as_millis(), attempt + 1);
                tokio::time::sleep(delay).await;
            }

            let mut request = build();
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            match self.make_request(request).await {
                Ok(text) => {
                    debug!("Response body length: {} bytes", text.len());
                    let body = serde_json::from_str::<Value>(&text).map_err(|e| {
                        error!("Failed to parse JSON response: {}", e);
                        Error::Parse(format!(
                            "Failed to parse response: {}. Response: {}",
                            e,
                            truncate(&text, 200)
                        ))
                    })?;
                    self.check_api_error(&body)?;
                    return Ok(body);
                }
                Err(e @ Error::RateLimit(_)) => return Err(e),
                Err(e) => {
                    warn!("Request failed (attempt {}): {}", attempt + 1, e);
                    last_error = Some(e);
                    attempt += 1;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Http("Max retries exceeded".to_string())))
    }

    /// Build the full URL for a path relative to the base URL
    fn build_url(&self, path: &str) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| Error::Http(format!("Invalid URL {}: {}", joined, e)))
    }

    /// Send the request and return the body of a successful response
    async fn make_request(&self, request: RequestBuilder) -> Result<String> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimit(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            error!("Request failed with status: {}", status);
            return Err(Error::Http(format!("status {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| Error::Http(format!("Failed to read response body: {}", e)))
    }

    /// Detect the API's error envelope in an otherwise successful response
    fn check_api_error(&self, body: &Value) -> Result<()> {
        let Some(object) = body.as_object() else {
            return Ok(());
        };

        if object.get("success").and_then(Value::as_bool) == Some(false) {
            let message = object
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("request was not successful");
            return Err(Error::Api(message.to_string()));
        }

        if let Some(message) = object.get("error").and_then(Value::as_str) {
            return Err(Error::Api(message.to_string()));
        }

        Ok(())
    }

    /// Get the base URL being used
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get request timeout duration
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
