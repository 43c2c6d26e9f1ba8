//! Reads API tokens from a local JSON key file.
//!
//! The file maps source names to tokens, e.g. `{"noaa": "abc123"}`. Files written in the
//! older single-key layout `{"apiKey": "abc123"}` are still accepted for every source.

use crate::error::{AppError, Result};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, error};

/// Key used by single-token key files.
const LEGACY_KEY: &str = "apiKey";

/// Source name of the NOAA Climate Data Online token.
pub const NOAA_SOURCE: &str = "noaa";

/// Tokens loaded from a key file, looked up by source name.
#[derive(Clone)]
pub struct CredentialStore {
    entries: Map<String, Value>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("sources", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CredentialStore {
    /// Reads and parses the key file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::CredentialMissing` if the file cannot be read or is not a JSON
    /// object.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            error!("Cannot read key file {}: {}", path.display(), e);
            AppError::CredentialMissing(format!("cannot read {}: {}", path.display(), e))
        })?;
        let store = Self::from_json_str(&raw).map_err(|e| match e {
            AppError::CredentialMissing(reason) => {
                AppError::CredentialMissing(format!("{}: {}", path.display(), reason))
            },
            other => other,
        })?;
        debug!(
            "Loaded {} credential entries from {}",
            store.entries.len(),
            path.display()
        );
        Ok(store)
    }

    /// Parses key file contents.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(entries)) => Ok(Self { entries }),
            Ok(_) => Err(AppError::CredentialMissing(
                "key file is not a JSON object".to_string(),
            )),
            Err(e) => Err(AppError::CredentialMissing(format!(
                "key file is not valid JSON: {}",
                e
            ))),
        }
    }

    /// Returns the token stored for `source`, or the legacy `apiKey` entry if the source
    /// has none.
    ///
    /// # Errors
    ///
    /// Returns `AppError::CredentialMissing` if neither entry holds a non-empty string.
    pub fn token_for(&self, source: &str) -> Result<String> {
        [source, LEGACY_KEY]
            .iter()
            .find_map(|key| {
                self.entries
                    .get(*key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
            })
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::CredentialMissing(format!("no token for source '{}'", source))
            })
    }
}

/// Resolves a token for `source`: `override_token` wins, otherwise the key file is read.
pub fn resolve_token(
    override_token: Option<&str>,
    key_file: impl AsRef<Path>,
    source: &str,
) -> Result<String> {
    if let Some(token) = override_token.filter(|t| !t.trim().is_empty()) {
        debug!("Using token for '{}' from environment", source);
        return Ok(token.to_string());
    }
    CredentialStore::from_file(key_file)?.token_for(source)
}
