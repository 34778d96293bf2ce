//! Command implementations and the helpers they share.

pub mod detectors;
pub mod pdf;
pub mod scan;
pub mod text;

use std::io;

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use log::debug;

use blackout_core::{merge_detectors, DetectorConfig, PatternRegistry};

use crate::cli::DetectorArgs;
use crate::ui::output_format;
use crate::ui::theme::ThemeMap;

/// Helper for printing info messages to stderr.
pub fn info_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let supports_color = io::stderr().is_terminal();
    let _ = output_format::print_info_message(&mut io::stderr(), msg.as_ref(), theme, supports_color);
}

/// Helper for printing success messages to stderr.
pub fn success_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let supports_color = io::stderr().is_terminal();
    let _ = output_format::print_success_message(&mut io::stderr(), msg.as_ref(), theme, supports_color);
}

/// Helper for printing warning messages to stderr.
pub fn warn_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let supports_color = io::stderr().is_terminal();
    let _ = output_format::print_warn_message(&mut io::stderr(), msg.as_ref(), theme, supports_color);
}

/// Helper for printing error messages to stderr.
pub fn error_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let supports_color = io::stderr().is_terminal();
    let _ = output_format::print_error_message(&mut io::stderr(), msg.as_ref(), theme, supports_color);
}

/// Resolves the detector set for a run: built-in defaults, overlaid with the
/// user's file if any, then filtered by `--enable`/`--disable`.
pub fn resolve_detectors(args: &DetectorArgs) -> Result<DetectorConfig> {
    let defaults = DetectorConfig::load_default().context("Failed to load built-in detectors")?;
    let user = match &args.config {
        Some(path) => {
            debug!("Loading detector configuration from {}", path.display());
            Some(
                DetectorConfig::load_from_file(path)
                    .with_context(|| format!("Failed to load detector configuration {}", path.display()))?,
            )
        }
        None => None,
    };
    let mut config = merge_detectors(defaults, user);
    config.set_active(&args.enable, &args.disable);
    debug!("{} detectors active", config.detectors.len());
    Ok(config)
}

/// Builds the compiled registry for a run.
pub fn load_registry(args: &DetectorArgs) -> Result<PatternRegistry> {
    let config = resolve_detectors(args)?;
    PatternRegistry::from_config(&config).context("Failed to compile detectors")
}
