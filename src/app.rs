//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - sets up logging and `.env`
//! - parses CLI arguments
//! - runs the panel pipeline
//! - prints reports and writes optional exports

use std::path::Path;

use clap::Parser;

use crate::align::choose_five_year_window;
use crate::cli::{BuildArgs, Command, ShowArgs, SourceArgs};
use crate::error::{AppError, PanelError};

pub mod pipeline;

/// Entry point for the `panel` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // `panel` and `panel --data-dir X` behave like `panel build ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_logging(cli.verbose);

    match cli.command {
        Command::Build(args) => handle_build(args),
        Command::Years(args) => handle_years(args),
        Command::Show(args) => handle_show(args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).try_init();
}

fn handle_build(args: BuildArgs) -> Result<(), AppError> {
    let config = args.source.to_config();
    let build = pipeline::init_panel(&config)?;

    println!("{}", crate::report::format_panel_summary(build));
    if args.head > 0 {
        println!("{}", crate::report::format_panel_head(&build.panel, args.head));
    }

    if let Some(path) = &args.export {
        if is_json_path(path) {
            crate::io::write_panel_json(path, &build.panel, &build.window)?;
        } else {
            crate::io::write_panel_csv(path, &build.panel)?;
        }
        log::info!("wrote {} panel rows to {}", build.panel.height(), path.display());
    }

    Ok(())
}

fn handle_years(args: SourceArgs) -> Result<(), AppError> {
    let survey = pipeline::survey_years(&args.to_config())?;

    let window = match choose_five_year_window(&survey.common_years) {
        Ok(w) => Some(w),
        Err(PanelError::InsufficientData { .. }) => None,
        Err(e) => return Err(e.into()),
    };

    println!("{}", crate::report::format_year_survey(&survey, window.as_ref()));
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let file = crate::io::read_panel_json(&args.panel)?;
    let panel = file.to_frame()?;

    println!("Panel file: {} (written by {})", args.panel.display(), file.tool);
    print!("{}", crate::report::format_window(&file.window()));
    println!("Panel: {} rows x {} columns\n", panel.height(), panel.width());
    if args.head > 0 {
        println!("{}", crate::report::format_panel_head(&panel, args.head));
    }
    Ok(())
}

fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Rewrite argv so `panel` defaults to `panel build`.
///
/// Rules:
/// - `panel`                      -> `panel build`
/// - `panel --data-dir X ...`     -> `panel build --data-dir X ...`
/// - `panel --help/--version/-h`  -> unchanged (show top-level help/version)
/// - `panel -v years`             -> unchanged (global flags may precede a subcommand)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    // Skip leading global verbosity flags to find the first meaningful token.
    let first = argv
        .iter()
        .skip(1)
        .position(|a| !is_verbose_flag(a))
        .map(|i| i + 1);

    let Some(pos) = first else {
        argv.push("build".to_string());
        return argv;
    };

    let token = argv[pos].as_str();
    let is_top_level_help_or_version = matches!(token, "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(token, "build" | "years" | "show");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "build flags".
    if token.starts_with('-') {
        argv.insert(pos, "build".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

fn is_verbose_flag(arg: &str) -> bool {
    arg == "--verbose" || (arg.len() > 1 && arg.starts_with('-') && arg[1..].chars().all(|c| c == 'v'))
}
