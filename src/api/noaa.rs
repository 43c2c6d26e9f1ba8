//! Provides a client for collecting station observations from the NOAA Climate Data
//! Online v2 `data` endpoint.
//!
//! The endpoint pages with an `offset`/`limit` cursor and reports the total number of
//! matching records in `metadata.resultset.count`. `ObservationFetcher` walks the
//! cursor until that total is collected.

use crate::api::http::{default_client, get_json};
use crate::error::{AppError, Result};
use crate::models::{ObservationEnvelope, ObservationPage, ObservationQuery, ObservationRecord};
use reqwest::Client;
use tracing::{debug, error, info, info_span, Instrument, Span};

/// Default location of the data endpoint.
pub const NOAA_DATA_URL: &str = "https://www.ncei.noaa.gov/cdo-web/api/v2/data";

/// Header carrying the access token.
const TOKEN_HEADER: &str = "token";

/// Paginated collector for station observations.
#[derive(Debug, Clone)]
pub struct ObservationFetcher {
    client: Client,
    span: Span,
}

impl ObservationFetcher {
    /// Creates a fetcher whose requests are bounded by `http::DEFAULT_TIMEOUT`.
    pub fn new() -> Self {
        Self::with_client(default_client())
    }

    /// Creates a fetcher that sends requests through `client`, e.g. one built by
    /// `Config::http_client` with a timeout.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            span: info_span!("observation_fetcher"),
        }
    }

    /// Replaces the span every fetch is recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Fetches every observation matching `query`, in the order the API returns them.
    ///
    /// Issues the first request at offset 0 and keeps advancing the offset by the page
    /// size until the number of collected records reaches the declared total.
    ///
    /// # Errors
    ///
    /// - `AppError::InvalidQuery` if the query fails validation (no request is sent).
    /// - `AppError::Network`, `AppError::HttpStatus` or `AppError::Decode` from any page.
    /// - `AppError::PaginationStalled` if a page comes back empty while records are still
    ///   owed, or if `ceil(total / page_size)` requests have not produced the total.
    pub async fn fetch_observations(
        &self,
        query: &ObservationQuery,
    ) -> Result<Vec<ObservationRecord>> {
        query.validate()?;
        self.collect_pages(query)
            .instrument(self.span.clone())
            .await
    }

    async fn collect_pages(&self, query: &ObservationQuery) -> Result<Vec<ObservationRecord>> {
        info!(
            "Fetching {} observations for station {} from {} to {}",
            query.dataset_id, query.station_id, query.start_date, query.end_date
        );

        let page_size = u64::from(query.page_size);
        let first = self.fetch_page(query, 0).await?;
        let total = first.total;
        let mut records = first.results;
        let mut requests: u32 = 1;

        debug!(
            "First page returned {} of {} records",
            records.len(),
            total
        );

        if records.is_empty() && total > 0 {
            return Err(self.stalled(query, total, 0, requests));
        }

        // The API should need exactly this many requests; anything beyond is a stall.
        let max_requests = total.div_ceil(page_size).max(1);
        let mut offset: u64 = 0;

        while (records.len() as u64) < total {
            if u64::from(requests) >= max_requests {
                return Err(self.stalled(query, total, records.len(), requests));
            }

            offset += page_size;
            let page = self.fetch_page(query, offset).await?;
            requests += 1;

            if page.results.is_empty() {
                return Err(self.stalled(query, total, records.len(), requests));
            }

            debug!(
                "Page at offset {} returned {} records ({} of {} collected)",
                offset,
                page.results.len(),
                records.len() + page.results.len(),
                total
            );
            records.extend(page.results);
        }

        info!(
            "Collected {} observations for station {} in {} requests",
            records.len(),
            query.station_id,
            requests
        );
        Ok(records)
    }

    async fn fetch_page(&self, query: &ObservationQuery, offset: u64) -> Result<ObservationPage> {
        let value = get_json(
            &self.client,
            &query.endpoint,
            &[(TOKEN_HEADER, query.token.expose())],
            &query.query_params(offset),
        )
        .await?;

        let envelope: ObservationEnvelope =
            serde_json::from_value(value).map_err(|e| AppError::Decode {
                url: query.endpoint.clone(),
                reason: format!("malformed envelope at offset {}: {}", offset, e),
            })?;

        envelope.into_page().map_err(|reason| {
            error!("Malformed envelope at offset {}: {}", offset, reason);
            AppError::Decode {
                url: query.endpoint.clone(),
                reason,
            }
        })
    }

    fn stalled(
        &self,
        query: &ObservationQuery,
        total: u64,
        received: usize,
        requests: u32,
    ) -> AppError {
        error!(
            "Pagination stalled for station {}: {} of {} records after {} requests",
            query.station_id, received, total, requests
        );
        AppError::PaginationStalled {
            url: query.endpoint.clone(),
            expected: total,
            received: received as u64,
            requests,
        }
    }
}

impl Default for ObservationFetcher {
    fn default() -> Self {
        Self::new()
    }
}
