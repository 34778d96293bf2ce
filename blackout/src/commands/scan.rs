//! `blackout scan`: report what would be redacted, without writing anything.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use log::info;

use blackout_core::{scan_document, PatternRegistry, ScanReport};

use super::error_msg;
use crate::ui::redaction_summary;
use crate::ui::theme::ThemeMap;

pub struct ScanOptions {
    pub input: PathBuf,
    pub json: bool,
    pub fail_over_threshold: Option<usize>,
    pub quiet: bool,
}

/// Outcome of a scan as far as the exit code is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanVerdict {
    Pass,
    ThresholdExceeded,
}

pub fn run_scan_opts(registry: &PatternRegistry, opts: ScanOptions, theme_map: &ThemeMap) -> Result<ScanVerdict> {
    info!("Starting scan of {}", opts.input.display());
    let report = scan_document(&opts.input, registry)
        .with_context(|| format!("Failed to scan {}", opts.input.display()))?;

    if opts.json {
        writeln!(io::stdout().lock(), "{}", report.to_json()?)?;
    } else if !opts.quiet {
        let supports_color = io::stderr().is_terminal();
        redaction_summary::print_summary(&report.summary, &mut io::stderr(), theme_map, supports_color)?;
        print_pages(&report);
    }

    Ok(match opts.fail_over_threshold {
        Some(threshold) if report.total_matches > threshold => {
            error_msg(
                format!(
                    "Found {} match(es), more than the allowed {}",
                    report.total_matches, threshold
                ),
                theme_map,
            );
            ScanVerdict::ThresholdExceeded
        }
        _ => ScanVerdict::Pass,
    })
}

fn print_pages(report: &ScanReport) {
    let mut stderr = io::stderr();
    for page in report.per_page.iter().filter(|p| p.matches > 0) {
        let _ = writeln!(stderr, "page {}: {} match(es)", page.page_index + 1, page.matches);
    }
}
