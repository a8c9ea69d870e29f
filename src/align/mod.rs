//! Alignment of the loaded sources into one panel.
//!
//! Responsibilities:
//!
//! - year coverage per table and across tables
//! - selection of the five-year window
//! - range filtering and the inner-join merge

pub mod assemble;
pub mod window;

pub use assemble::*;
pub use window::*;
