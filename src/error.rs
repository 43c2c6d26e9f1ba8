//! Defines the crate's primary error type `AppError` and a convenience `Result` alias.
//!
//! Uses the `thiserror` crate for ergonomic error definition and provides `From`
//! implementations to convert common external errors into `AppError` variants.
//! Errors that do not implement `Clone` are wrapped in `Arc` to allow `AppError` to be cloneable.

use reqwest::StatusCode;
use std::sync::Arc;
use thiserror::Error;

/// The primary error enumeration for all crate-specific errors.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// Transport-level failure (connection refused, DNS, TLS, timeout).
    #[error("Network Error requesting {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: Arc<reqwest::Error>,
    },

    /// The server answered with a non-success status code.
    #[error("HTTP Status Error: {url} returned {status}")]
    HttpStatus { url: String, status: StatusCode },

    /// The body was not valid JSON or lacked a required envelope field.
    #[error("Response Decode Error from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// No credential could be resolved for a source that requires one.
    #[error("Credential Missing: {0}")]
    CredentialMissing(String),

    /// Paginated collection stopped making progress before reaching the declared total.
    #[error(
        "Pagination Stalled at {url}: received {received} of {expected} records after {requests} requests"
    )]
    PaginationStalled {
        url: String,
        expected: u64,
        received: u64,
        requests: u32,
    },

    /// Both the primary and the fallback resource failed.
    #[error("Fallback Exhausted: primary attempt failed ({primary}); fallback attempt failed ({fallback})")]
    FallbackExhausted {
        primary: Box<AppError>,
        fallback: Box<AppError>,
    },

    /// A query was rejected before any request was sent.
    #[error("Invalid Query: {0}")]
    InvalidQuery(String),

    /// A configuration value could not be parsed.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Error during JSON parsing outside of an HTTP response (key files, CLI output).
    #[error("JSON Parsing Error: {0}")]
    JsonParse(Arc<serde_json::Error>),

    /// Error related to standard I/O operations.
    #[error("I/O Error: {0}")]
    Io(Arc<std::io::Error>),

    /// Error specific to CLI logic or argument handling.
    #[error("CLI Error: {0}")]
    Cli(String),

    /// Error originating from user interaction prompts (`dialoguer`).
    #[error("Dialoguer Error: {0}")]
    Dialoguer(Arc<dialoguer::Error>),

    /// Error related to progress bar style templating (`indicatif`).
    #[error("Progress Style Template Error: {0}")]
    Template(Arc<indicatif::style::TemplateError>),
}

impl AppError {
    /// The URL this error is about, when it concerns a single request.
    pub fn url(&self) -> Option<&str> {
        match self {
            AppError::Network { url, .. }
            | AppError::HttpStatus { url, .. }
            | AppError::Decode { url, .. }
            | AppError::PaginationStalled { url, .. } => Some(url.as_str()),
            _ => None,
        }
    }
}

/// A specialized `Result` type using the crate's `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

// --- From implementations ---
// These allow easy conversion from external error types into AppError
// using the `?` operator. Arc is used for non-Clone error types.

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown URL".to_string());
        AppError::Network {
            url,
            source: Arc::new(err),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(Arc::new(err))
    }
}

impl From<dialoguer::Error> for AppError {
    fn from(err: dialoguer::Error) -> Self {
        AppError::Dialoguer(Arc::new(err))
    }
}

impl From<indicatif::style::TemplateError> for AppError {
    fn from(err: indicatif::style::TemplateError) -> Self {
        AppError::Template(Arc::new(err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::JsonParse(Arc::new(err))
    }
}
