//! Defines the data structures used by the fetchers.
//!
//! Includes query types validated before any request is sent, the response
//! envelopes deserialized from the upstream APIs, and the in-memory result types
//! handed back to callers.

mod currency;
mod noaa;

pub use currency::*;
pub use noaa::*;
