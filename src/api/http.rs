//! Shared HTTP GET helpers used by both fetchers.
//!
//! `get_json` performs one request with status and body checks; `get_json_with_fallback`
//! layers the primary/secondary resource chain on top of it.

use crate::error::{AppError, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Upper bound on a single request when the caller supplies no client of its own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Builds a client whose requests fail with `AppError::Network` once `timeout` elapses.
pub fn client_with_timeout(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(AppError::from)
}

/// The client behind the fetchers' `new()` constructors, bounded by `DEFAULT_TIMEOUT`.
pub fn default_client() -> Client {
    client_with_timeout(DEFAULT_TIMEOUT).unwrap_or_else(|e| {
        error!("Could not build HTTP client with timeout: {}", e);
        Client::new()
    })
}

/// A pair of URL suffixes appended to the same stem: the primary resource and the
/// one tried when the primary fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlSuffixes {
    pub primary: &'static str,
    pub fallback: &'static str,
}

impl UrlSuffixes {
    pub fn primary_url(&self, stem: &str) -> String {
        format!("{}{}", stem, self.primary)
    }

    pub fn fallback_url(&self, stem: &str) -> String {
        format!("{}{}", stem, self.fallback)
    }
}

/// Pretty JSON first, minified JSON as fallback.
pub const JSON_SUFFIXES: UrlSuffixes = UrlSuffixes {
    primary: ".json",
    fallback: ".min.json",
};

/// Issues a GET and decodes the body as JSON.
///
/// # Errors
///
/// - `AppError::Network` if the request could not be completed (including timeouts).
/// - `AppError::HttpStatus` if the server answered with a non-success status.
/// - `AppError::Decode` if the body is not valid JSON.
pub async fn get_json(
    client: &Client,
    url: &str,
    headers: &[(&str, &str)],
    query: &[(&str, String)],
) -> Result<Value> {
    let mut request = client.get(url);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    if !query.is_empty() {
        request = request.query(query);
    }

    let response = request.send().await.map_err(|e| {
        error!("Error sending request to {}: {}", url, e);
        AppError::Network {
            url: url.to_string(),
            source: e.into(),
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        error!("Request to {} failed with status {}", url, status);
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            error!("Received 401/403. Check that the access token is valid.");
        } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Received 429. The upstream rate limit was hit.");
        }
        return Err(AppError::HttpStatus {
            url: url.to_string(),
            status,
        });
    }

    // Read the body as text first so decode failures can be told apart from transport ones.
    let body = response.text().await.map_err(|e| AppError::Network {
        url: url.to_string(),
        source: e.into(),
    })?;

    let value = serde_json::from_str::<Value>(&body).map_err(|e| {
        error!("Error parsing JSON from {}: {}", url, e);
        AppError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        }
    })?;

    debug!("Decoded {} bytes of JSON from {}", body.len(), url);
    Ok(value)
}

/// Fetches `stem + suffixes.primary`, and on a transport failure or non-success status
/// tries `stem + suffixes.fallback` once.
///
/// A primary response that arrives with a success status but an undecodable body is
/// returned as-is, without trying the fallback.
///
/// # Errors
///
/// Returns `AppError::FallbackExhausted` carrying both underlying errors when neither
/// resource could be fetched, or `AppError::Decode` as described above.
pub async fn get_json_with_fallback(
    client: &Client,
    stem: &str,
    suffixes: &UrlSuffixes,
) -> Result<Value> {
    let primary_url = suffixes.primary_url(stem);
    let primary_err = match get_json(client, &primary_url, &[], &[]).await {
        Ok(value) => return Ok(value),
        Err(e @ AppError::Decode { .. }) => return Err(e),
        Err(e) => e,
    };

    let fallback_url = suffixes.fallback_url(stem);
    warn!(
        "Primary resource {} failed ({}). Falling back to {}",
        primary_url, primary_err, fallback_url
    );

    match get_json(client, &fallback_url, &[], &[]).await {
        Ok(value) => {
            debug!("Fallback resource {} succeeded", fallback_url);
            Ok(value)
        },
        Err(fallback_err) => {
            error!(
                "Both {} and {} failed; giving up",
                primary_url, fallback_url
            );
            Err(AppError::FallbackExhausted {
                primary: Box::new(primary_err),
                fallback: Box::new(fallback_err),
            })
        },
    }
}
