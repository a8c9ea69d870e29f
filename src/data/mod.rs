//! Remote data access.
//!
//! Only the FRED API is remote; every other source is read from local files
//! by `crate::sources`.

pub mod fred;

pub use fred::{FRED_ORIGIN, FredClient, MORTGAGE_SERIES};
