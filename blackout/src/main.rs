// blackout/src/main.rs
//! Blackout entry point.
//!
//! Parses the command line, sets up logging and the theme, builds the
//! detector registry and dispatches to the selected command.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use blackout::cli::{Cli, Commands};
use blackout::commands::{self, error_msg};
use blackout::commands::pdf::{run_pdf_opts, PdfOptions};
use blackout::commands::scan::{run_scan_opts, ScanOptions, ScanVerdict};
use blackout::commands::text::{read_input, run_text_opts, TextOptions};
use blackout::logger;
use blackout::ui::theme::{build_theme_map, default_theme_map, ThemeMap};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.quiet {
        Some(LevelFilter::Off)
    } else if cli.debug {
        Some(LevelFilter::Debug)
    } else {
        None
    };
    logger::init_logger(level);

    let theme_map = match build_theme_map(cli.theme.as_deref()) {
        Ok(theme) => theme,
        Err(e) => {
            let fallback = default_theme_map();
            error_msg(format!("{e:#}"), &fallback);
            return ExitCode::FAILURE;
        }
    };

    match run(cli, &theme_map) {
        Ok(code) => code,
        Err(e) => {
            error_msg(format!("{e:#}"), &theme_map);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, theme_map: &ThemeMap) -> Result<ExitCode> {
    match cli.command {
        Commands::Pdf(cmd) => {
            let registry = commands::load_registry(&cmd.detectors)?;
            let opts = PdfOptions {
                input: cmd.input,
                output: cmd.output,
                timeout: cmd.timeout_secs.map(Duration::from_secs),
                json: cmd.json,
                no_redaction_summary: cmd.no_summary,
                quiet: cli.quiet,
            };
            run_pdf_opts(&registry, opts, theme_map)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Text(cmd) => {
            let registry = commands::load_registry(&cmd.detectors)?;
            let input = read_input(cmd.input_file.as_ref()).context("Failed to read text input")?;
            let opts = TextOptions {
                input,
                output_path: cmd.output,
                no_redaction_summary: cmd.no_summary,
                quiet: cli.quiet,
            };
            run_text_opts(&registry, opts, theme_map)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Scan(cmd) => {
            let registry = commands::load_registry(&cmd.detectors)?;
            let opts = ScanOptions {
                input: cmd.input,
                json: cmd.json,
                fail_over_threshold: cmd.fail_over_threshold,
                quiet: cli.quiet,
            };
            match run_scan_opts(&registry, opts, theme_map)? {
                ScanVerdict::Pass => Ok(ExitCode::SUCCESS),
                ScanVerdict::ThresholdExceeded => Ok(ExitCode::from(2)),
            }
        }
        Commands::Detectors(cmd) => {
            commands::detectors::run_detectors(&cmd.detectors, theme_map)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
