//! Data structures for the currency exchange-rate CDN.

use crate::error::{AppError, Result};
use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// API version used when none is given.
pub const DEFAULT_API_VERSION: &str = "1";

/// Base currency used when none is given.
pub const DEFAULT_BASE_CURRENCY: &str = "usd";

/// The date an exchange rate is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RateDate {
    /// The most recent published rates.
    Latest,
    On(NaiveDate),
}

impl RateDate {
    /// The path segment used in request URLs (`latest` or `YYYY-MM-DD`).
    pub fn as_path_segment(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RateDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateDate::Latest => f.write_str("latest"),
            RateDate::On(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl FromStr for RateDate {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("latest") {
            return Ok(RateDate::Latest);
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(RateDate::On)
            .map_err(|e| {
                AppError::InvalidQuery(format!(
                    "'{}' is not 'latest' or a YYYY-MM-DD date: {}",
                    s, e
                ))
            })
    }
}

impl From<NaiveDate> for RateDate {
    fn from(date: NaiveDate) -> Self {
        RateDate::On(date)
    }
}

// Serialized as its string form so result maps render as `{"2024-01-01": ...}`.
impl Serialize for RateDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Per-date payloads of a batch call. Each value is the JSON body returned for that
/// date, verbatim.
pub type ExchangeRateResult = BTreeMap<RateDate, Value>;

/// Per-date outcomes of a batch call that does not abort on the first failure.
pub type SettledExchangeRates = BTreeMap<RateDate, Result<Value>>;

/// Parameters for a (possibly multi-date) exchange-rate lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRateQuery {
    pub version: String,
    pub dates: Vec<RateDate>,
    pub base: String,
    /// When set, each payload holds a single rate instead of the full currency map.
    pub target: Option<String>,
}

impl ExchangeRateQuery {
    pub fn new(dates: impl Into<Vec<RateDate>>, base: impl Into<String>) -> Self {
        Self {
            version: DEFAULT_API_VERSION.to_string(),
            dates: dates.into(),
            base: base.into(),
            target: None,
        }
    }

    /// A query for the latest rates of `base` against every currency.
    pub fn latest(base: impl Into<String>) -> Self {
        Self::new(vec![RateDate::Latest], base)
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Validates the query and returns a copy with lowercase currency codes and
    /// duplicate dates removed (first occurrence kept).
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidQuery` if no dates are given, the version is blank or
    /// contains a path separator, or a currency code is not ASCII alphanumeric.
    pub fn normalized(&self) -> Result<Self> {
        if self.dates.is_empty() {
            return Err(AppError::InvalidQuery(
                "at least one date is required".to_string(),
            ));
        }
        let version = self.version.trim();
        if version.is_empty() || version.contains('/') {
            return Err(AppError::InvalidQuery(format!(
                "invalid API version '{}'",
                self.version
            )));
        }

        let mut dates = Vec::with_capacity(self.dates.len());
        for date in &self.dates {
            if !dates.contains(date) {
                dates.push(*date);
            }
        }

        Ok(Self {
            version: version.to_string(),
            dates,
            base: normalize_currency_code(&self.base)?,
            target: self
                .target
                .as_deref()
                .map(normalize_currency_code)
                .transpose()?,
        })
    }
}

/// Lowercases a currency code after checking it is non-empty ASCII alphanumeric.
pub fn normalize_currency_code(code: &str) -> Result<String> {
    let code = code.trim();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::InvalidQuery(format!(
            "invalid currency code '{}'",
            code
        )));
    }
    Ok(code.to_ascii_lowercase())
}
