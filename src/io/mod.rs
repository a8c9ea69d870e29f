//! Input/output helpers.
//!
//! - raw sheet ingest + validation (`ingest`)
//! - panel CSV export (`export`)
//! - panel JSON read/write (`panel_file`)

pub mod export;
pub mod ingest;
pub mod panel_file;

pub use export::*;
pub use ingest::*;
pub use panel_file::*;
