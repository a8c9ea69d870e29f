//! Command-line parsing for the parish panel builder.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the loading/alignment code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{PanelConfig, RateSource, Year};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "panel", version, about = "Parish five-year panel builder")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load all sources, select the window and build the panel (default).
    Build(BuildArgs),
    /// Print per-source year coverage and the window that would be chosen.
    Years(SourceArgs),
    /// Print the summary of a previously exported panel JSON.
    Show(ShowArgs),
}

/// Where the raw sources live and how to read them.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Directory holding the raw source files.
    #[arg(long, env = "PANEL_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// First year of the per-year median income files.
    #[arg(long, default_value_t = 2014)]
    pub income_from: Year,

    /// Last year of the per-year median income files.
    #[arg(long, default_value_t = 2023)]
    pub income_to: Year,

    /// Mortgage rate source.
    #[arg(long, value_enum, default_value_t = RateSource::Workbook)]
    pub rates: RateSource,
}

impl SourceArgs {
    pub fn to_config(&self) -> PanelConfig {
        let mut config = PanelConfig::new(&self.data_dir);
        config.income_years = (self.income_from, self.income_to);
        config.rate_source = self.rates;
        config
    }
}

/// Options for building the panel.
#[derive(Debug, Args, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Number of panel rows to print.
    #[arg(long, default_value_t = 10)]
    pub head: usize,

    /// Export the panel to CSV, or JSON when the path ends in `.json`.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

/// Options for showing a saved panel.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Panel JSON file produced by `panel build --export FILE.json`.
    #[arg(long, value_name = "JSON")]
    pub panel: PathBuf,

    /// Number of panel rows to print.
    #[arg(long, default_value_t = 10)]
    pub head: usize,
}
