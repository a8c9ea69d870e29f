//! Reporting utilities: formatted terminal output for builds and surveys.

pub mod format;

pub use format::*;
