//! Pulls time-series data from two public HTTP APIs into in-memory records:
//! NOAA Climate Data Online station observations (paginated) and daily currency
//! exchange rates (fallback-chained, multi-date).
//!
//! ```no_run
//! use etl_fetch::api::ExchangeRateFetcher;
//! use etl_fetch::models::{ExchangeRateQuery, RateDate};
//!
//! # async fn run() -> etl_fetch::error::Result<()> {
//! let dates = vec!["2024-01-01".parse::<RateDate>()?, "2024-01-02".parse()?];
//! let rates = ExchangeRateFetcher::new()
//!     .fetch_rates(&ExchangeRateQuery::new(dates, "usd"))
//!     .await?;
//! assert_eq!(rates.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod models;
