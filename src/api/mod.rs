//! Provides clients and utilities for interacting with external APIs.
//!
//! Includes:
//! - `http`: shared GET helpers, including the primary/fallback resource chain.
//! - `noaa`: paginated collector for NOAA station observations.
//! - `currency`: fallback-chained fetcher for daily exchange rates.

mod currency;
pub mod http;
mod noaa;

#[cfg(test)]
mod currency_test;

pub use currency::*;
pub use noaa::*;
