//! Data structures for the NOAA Climate Data Online `data` endpoint.
//!
//! Includes:
//! - `ObservationQuery`: the validated request parameters for a paginated pull.
//! - `ObservationEnvelope`: the `{results, metadata}` wrapper returned per page.
//! - `ObservationRecord`: one station reading, kept as an opaque JSON object.

use crate::error::{AppError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// The dataset queried when none is given (Global Historical Climatology Network, daily).
pub const DEFAULT_DATASET: &str = "GHCND";

/// The largest `limit` the data endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// A single station reading. Fields are whatever the upstream returns
/// (`date`, `datatype`, `station`, `attributes`, `value`).
pub type ObservationRecord = Map<String, Value>;

/// An access token sent in the `token` header.
///
/// `Debug` output is redacted so queries can be logged safely.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

/// Parameters for collecting every observation of one station over a date range.
#[derive(Debug, Clone)]
pub struct ObservationQuery {
    /// Full URL of the data endpoint, e.g. `https://www.ncei.noaa.gov/cdo-web/api/v2/data`.
    pub endpoint: String,
    pub dataset_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Station identifier including its namespace, e.g. `GHCND:USW00094728`.
    pub station_id: String,
    /// Records requested per page (`limit`).
    pub page_size: u32,
    pub token: ApiToken,
}

impl ObservationQuery {
    /// Creates a query against the default dataset with the maximum page size.
    pub fn new(
        endpoint: impl Into<String>,
        station_id: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        token: ApiToken,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            dataset_id: DEFAULT_DATASET.to_string(),
            start_date,
            end_date,
            station_id: station_id.into(),
            page_size: MAX_PAGE_SIZE,
            token,
        }
    }

    pub fn with_dataset(mut self, dataset_id: impl Into<String>) -> Self {
        self.dataset_id = dataset_id.into();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Checks the query before any request is issued.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidQuery` if the date range is inverted, the page size is
    /// outside `1..=MAX_PAGE_SIZE`, or the station or dataset identifier is blank.
    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(AppError::InvalidQuery(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(AppError::InvalidQuery(format!(
                "page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        if self.station_id.trim().is_empty() {
            return Err(AppError::InvalidQuery(
                "station id must not be empty".to_string(),
            ));
        }
        if self.dataset_id.trim().is_empty() {
            return Err(AppError::InvalidQuery(
                "dataset id must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Query string pairs for the page starting at `offset`.
    pub(crate) fn query_params(&self, offset: u64) -> Vec<(&'static str, String)> {
        vec![
            ("datasetid", self.dataset_id.clone()),
            ("startdate", self.start_date.to_string()),
            ("enddate", self.end_date.to_string()),
            ("stationid", self.station_id.clone()),
            ("limit", self.page_size.to_string()),
            ("offset", offset.to_string()),
        ]
    }
}

/// Response envelope of the data endpoint.
///
/// The upstream answers `{}` when nothing matches, so both fields are optional here;
/// `ObservationEnvelope::into_page` decides what combinations are acceptable.
#[derive(Debug, Deserialize, Clone)]
pub struct ObservationEnvelope {
    #[serde(default)]
    pub results: Option<Vec<ObservationRecord>>,
    #[serde(default)]
    pub metadata: Option<EnvelopeMetadata>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnvelopeMetadata {
    pub resultset: ResultSet,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResultSet {
    pub count: u64,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
}

/// One decoded page: the declared total and the records on this page.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationPage {
    pub total: u64,
    pub results: Vec<ObservationRecord>,
}

impl ObservationEnvelope {
    /// Converts the envelope into a page.
    ///
    /// An empty envelope is a page of zero records with a total of zero. Records without
    /// `metadata.resultset.count` are rejected, since paging cannot continue without it.
    pub fn into_page(self) -> std::result::Result<ObservationPage, String> {
        match (self.results, self.metadata) {
            (None, None) => Ok(ObservationPage {
                total: 0,
                results: Vec::new(),
            }),
            (Some(results), Some(meta)) => Ok(ObservationPage {
                total: meta.resultset.count,
                results,
            }),
            (Some(_), None) => Err("envelope has results but no metadata.resultset".to_string()),
            (None, Some(meta)) => Ok(ObservationPage {
                total: meta.resultset.count,
                results: Vec::new(),
            }),
        }
    }
}
