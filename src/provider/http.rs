//! Blocking HTTP helper shared by the providers.
//!
//! Maps transport errors and HTTP statuses onto [`EnrichError`]: 429 and 503
//! are transient, any other non-2xx status rejects the request outright.

use crate::error::{EnrichError, EnrichResult};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub struct JsonClient {
    client: Client,
    provider: &'static str,
}

impl JsonClient {
    pub fn new(provider: &'static str, user_agent: &str, timeout: Duration) -> EnrichResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| EnrichError::NetworkFailure {
                provider,
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, provider })
    }

    /// GETs `url` and decodes the JSON body.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str, headers: &[(&str, &str)]) -> EnrichResult<T> {
        debug!("{} GET {}", self.provider, strip_query(url));

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().map_err(|e| EnrichError::NetworkFailure {
            provider: self.provider,
            message: e.without_url().to_string(),
        })?;

        let status = response.status();
        let body = response.text().map_err(|e| EnrichError::NetworkFailure {
            provider: self.provider,
            message: e.without_url().to_string(),
        })?;
        check_status(self.provider, status, &body)?;

        decode(self.provider, &body)
    }
}

/// Classifies a response status.
pub fn check_status(provider: &'static str, status: StatusCode, body: &str) -> EnrichResult<()> {
    if status.is_success() {
        return Ok(());
    }
    Err(status_error(provider, status, body))
}

/// Error for a non-2xx status: 429 and 503 are transient, the rest fatal.
pub fn status_error(provider: &'static str, status: StatusCode, body: &str) -> EnrichError {
    let message = format!("{} {}", status, snippet(body));
    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
        return EnrichError::NetworkFailure { provider, message };
    }

    EnrichError::ProviderRejected {
        provider,
        status: status.as_u16(),
        message,
    }
}

pub fn decode<T: DeserializeOwned>(provider: &'static str, body: &str) -> EnrichResult<T> {
    serde_json::from_str(body).map_err(|e| EnrichError::InvalidResponse {
        provider,
        message: e.to_string(),
    })
}

fn snippet(body: &str) -> &str {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(200) {
        Some((idx, _)) => &trimmed[..idx],
        None => trimmed,
    }
}

/// Query strings may carry API keys; keep them out of logs.
fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
