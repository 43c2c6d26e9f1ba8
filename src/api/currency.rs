//! Provides a client for the `fawazahmed0/currency-api` exchange-rate CDN.
//!
//! Every resource is published twice, as `.json` and `.min.json`. Each request tries
//! the first and falls back to the second through the shared
//! `http::get_json_with_fallback` primitive.

use crate::api::http::{default_client, get_json_with_fallback, JSON_SUFFIXES};
use crate::error::Result;
use crate::models::{
    ExchangeRateQuery, ExchangeRateResult, RateDate, SettledExchangeRates, DEFAULT_API_VERSION,
};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info, info_span, Instrument, Span};

/// Default CDN root. The API version is appended as `@<version>`.
pub const CURRENCY_API_ROOT: &str = "https://cdn.jsdelivr.net/gh/fawazahmed0/currency-api";

/// Fallback-chained fetcher for daily exchange rates.
#[derive(Debug, Clone)]
pub struct ExchangeRateFetcher {
    client: Client,
    root: String,
    span: Span,
}

impl ExchangeRateFetcher {
    /// Creates a fetcher against the public CDN whose requests are bounded by
    /// `http::DEFAULT_TIMEOUT`.
    pub fn new() -> Self {
        Self::with_client(default_client(), CURRENCY_API_ROOT)
    }

    /// Creates a fetcher with a custom client and CDN root (a mock server in tests).
    pub fn with_client(client: Client, root: &str) -> Self {
        Self {
            client,
            root: root.trim_end_matches('/').to_string(),
            span: info_span!("exchange_rate_fetcher"),
        }
    }

    /// Replaces the span every fetch is recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// URL stem (without suffix) for one date of a normalized query.
    fn rate_stem(&self, version: &str, date: RateDate, base: &str, target: Option<&str>) -> String {
        let mut stem = format!(
            "{}@{}/{}/currencies/{}",
            self.root,
            version,
            date.as_path_segment(),
            base
        );
        if let Some(target) = target {
            stem.push('/');
            stem.push_str(target);
        }
        stem
    }

    /// Fetches the rates of every date in `query`, aborting on the first failure.
    ///
    /// Duplicate dates are fetched once, so the result has one entry per distinct date.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidQuery` for a malformed query, or the error of the first
    /// date whose primary and fallback resources both failed.
    pub async fn fetch_rates(&self, query: &ExchangeRateQuery) -> Result<ExchangeRateResult> {
        let query = query.normalized()?;
        self.collect_rates(&query)
            .instrument(self.span.clone())
            .await
    }

    async fn collect_rates(&self, query: &ExchangeRateQuery) -> Result<ExchangeRateResult> {
        info!(
            "Fetching {} rates for {} date(s)",
            query.base,
            query.dates.len()
        );
        let mut rates = ExchangeRateResult::new();
        for date in &query.dates {
            let payload = self.fetch_one(query, *date).await?;
            rates.insert(*date, payload);
        }
        Ok(rates)
    }

    /// Fetches the rates of every date in `query` without aborting: each date maps to
    /// its own outcome.
    ///
    /// # Errors
    ///
    /// Only `AppError::InvalidQuery`; per-date failures are reported inside the map.
    pub async fn fetch_rates_settled(
        &self,
        query: &ExchangeRateQuery,
    ) -> Result<SettledExchangeRates> {
        let query = query.normalized()?;
        let settled = async {
            let mut settled = SettledExchangeRates::new();
            for date in &query.dates {
                let outcome = self.fetch_one(&query, *date).await;
                settled.insert(*date, outcome);
            }
            settled
        }
        .instrument(self.span.clone())
        .await;

        let failed = settled.values().filter(|r| r.is_err()).count();
        if failed > 0 {
            error!("{} of {} dates failed", failed, settled.len());
        }
        Ok(settled)
    }

    async fn fetch_one(&self, query: &ExchangeRateQuery, date: RateDate) -> Result<Value> {
        let stem = self.rate_stem(&query.version, date, &query.base, query.target.as_deref());
        debug!("Fetching rates for {} from {}", date, stem);
        get_json_with_fallback(&self.client, &stem, &JSON_SUFFIXES)
            .await
            .map_err(|e| {
                error!("Failed to fetch rates for {}: {}", date, e);
                e
            })
    }

    /// Fetches the catalog of currency codes and their names from the latest release.
    ///
    /// # Errors
    ///
    /// Returns `AppError::FallbackExhausted` when both catalog resources fail, or
    /// `AppError::Decode` when the body is not JSON.
    pub async fn fetch_currency_codes(&self) -> Result<Value> {
        let stem = format!("{}@{}/latest/currencies", self.root, DEFAULT_API_VERSION);
        async {
            info!("Fetching currency code catalog");
            get_json_with_fallback(&self.client, &stem, &JSON_SUFFIXES).await
        }
        .instrument(self.span.clone())
        .await
    }
}

impl Default for ExchangeRateFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_rate_stem() {
        let fetcher = ExchangeRateFetcher::with_client(Client::new(), "http://cdn/currency-api/");
        let date = RateDate::On(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(
            fetcher.rate_stem("1", date, "usd", None),
            "http://cdn/currency-api@1/2024-01-01/currencies/usd"
        );
        assert_eq!(
            fetcher.rate_stem("1", RateDate::Latest, "usd", Some("eur")),
            "http://cdn/currency-api@1/latest/currencies/usd/eur"
        );
    }
}
