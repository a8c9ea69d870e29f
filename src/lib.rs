//! `parish-panel` library crate.
//!
//! The binary (`panel`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the alignment steps are reusable on their own (notebooks, other tools)
//! - code stays easy to navigate as the project grows

pub mod align;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
pub mod sources;

pub use app::pipeline::{PanelBuild, build_five_year_panel, init_panel};
pub use error::PanelError;
