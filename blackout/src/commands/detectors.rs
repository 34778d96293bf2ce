//! `blackout detectors`: show the detector set a run would use.

use std::io;

use anyhow::Result;
use is_terminal::IsTerminal;

use crate::cli::DetectorArgs;
use crate::ui::redaction_summary;
use crate::ui::theme::ThemeMap;

use super::resolve_detectors;

pub fn run_detectors(args: &DetectorArgs, theme_map: &ThemeMap) -> Result<()> {
    let config = resolve_detectors(args)?;
    // Fails on patterns that do not compile.
    blackout_core::PatternRegistry::from_config(&config)?;
    let supports_color = io::stdout().is_terminal();
    redaction_summary::print_detectors(&config.detectors, &mut io::stdout(), theme_map, supports_color)
}
