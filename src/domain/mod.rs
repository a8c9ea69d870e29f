//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - source identities, regions, years and windows (`types`)
//! - polars helpers for building and reducing source tables (`frame`)

pub mod frame;
pub mod types;

pub use types::*;
