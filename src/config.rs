//! Runtime configuration loaded from environment variables (and `.env`, via `dotenv`).

use crate::api::http::{client_with_timeout, DEFAULT_TIMEOUT};
use crate::api::{CURRENCY_API_ROOT, NOAA_DATA_URL};
use crate::error::{AppError, Result};
use crate::models::{DEFAULT_API_VERSION, DEFAULT_DATASET, MAX_PAGE_SIZE};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Settings for both fetchers and the credential source.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub noaa_base_url: String,
    pub noaa_dataset: String,
    pub noaa_page_size: u32,
    /// Token taken from `NOAA_TOKEN`; overrides the key file when set.
    pub noaa_token: Option<String>,
    pub api_key_file: PathBuf,
    pub currency_api_root: String,
    pub currency_api_version: String,
    /// Upper bound on every outbound request.
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            noaa_base_url: NOAA_DATA_URL.to_string(),
            noaa_dataset: DEFAULT_DATASET.to_string(),
            noaa_page_size: MAX_PAGE_SIZE,
            noaa_token: None,
            api_key_file: PathBuf::from("api_key.json"),
            currency_api_root: CURRENCY_API_ROOT.to_string(),
            currency_api_version: DEFAULT_API_VERSION.to_string(),
            http_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    /// Loads `.env` (if present) and reads every setting from the environment,
    /// falling back to the defaults for unset variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a numeric variable cannot be parsed or is zero.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let noaa_page_size: u32 = parse_var("NOAA_PAGE_SIZE", defaults.noaa_page_size)?;
        if noaa_page_size == 0 || noaa_page_size > MAX_PAGE_SIZE {
            return Err(AppError::Config(format!(
                "NOAA_PAGE_SIZE must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, noaa_page_size
            )));
        }

        let timeout_secs: u64 = parse_var("HTTP_TIMEOUT_SECS", defaults.http_timeout.as_secs())?;
        if timeout_secs == 0 {
            return Err(AppError::Config(
                "HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        let config = Self {
            noaa_base_url: string_var("NOAA_BASE_URL", defaults.noaa_base_url),
            noaa_dataset: string_var("NOAA_DATASET", defaults.noaa_dataset),
            noaa_page_size,
            noaa_token: env::var("NOAA_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            api_key_file: env::var("API_KEY_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.api_key_file),
            currency_api_root: string_var("CURRENCY_API_ROOT", defaults.currency_api_root),
            currency_api_version: string_var("CURRENCY_API_VERSION", defaults.currency_api_version),
            http_timeout: Duration::from_secs(timeout_secs),
        };
        debug!("Loaded configuration: {:?}", config.redacted());
        Ok(config)
    }

    /// Builds the HTTP client shared by both fetchers, bounded by `http_timeout`.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        client_with_timeout(self.http_timeout)
    }

    fn redacted(&self) -> Self {
        Self {
            noaa_token: self.noaa_token.as_ref().map(|_| "***".to_string()),
            ..self.clone()
        }
    }
}

fn string_var(name: &str, default: String) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{}='{}' is invalid: {}", name, raw, e))),
        _ => Ok(default),
    }
}
