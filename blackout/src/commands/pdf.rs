//! `blackout pdf`: redact one PDF document into a new file.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use log::{debug, info};

use blackout_core::{default_output_path, redact, PatternRegistry, RedactOptions, RedactionReport};

use super::{info_msg, success_msg, warn_msg};
use crate::ui::redaction_summary;
use crate::ui::theme::ThemeMap;

/// Options for [`run_pdf_opts`].
pub struct PdfOptions {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub json: bool,
    pub no_redaction_summary: bool,
    pub quiet: bool,
}

/// Runs one PDF redaction and prints its outcome.
///
/// stdout receives the output file name, or the JSON report with `json`.
/// Status lines and the summary table go to stderr.
pub fn run_pdf_opts(registry: &PatternRegistry, opts: PdfOptions, theme_map: &ThemeMap) -> Result<RedactionReport> {
    let output = opts.output.clone().unwrap_or_else(|| default_output_path(&opts.input));
    let options = match opts.timeout {
        Some(timeout) => RedactOptions::with_timeout(timeout),
        None => RedactOptions::default(),
    };
    info!("Starting pdf redaction of {}", opts.input.display());
    debug!("Writing to {} with {} detector(s)", output.display(), registry.len());

    if !opts.quiet {
        info_msg(format!("Redacting {}", opts.input.display()), theme_map);
    }

    let report = redact(&opts.input, &output, registry, &options)
        .with_context(|| format!("Failed to redact {}", opts.input.display()))?;

    let mut stdout = io::stdout().lock();
    if opts.json {
        writeln!(stdout, "{}", report.to_json()?)?;
    } else {
        writeln!(stdout, "{}", report.output)?;
    }

    if !opts.quiet {
        if report.unresolved_literals > 0 {
            warn_msg(
                format!(
                    "{} matched literal(s) could not be located on the page and were left in place",
                    report.unresolved_literals
                ),
                theme_map,
            );
        }
        if !opts.no_redaction_summary {
            let supports_color = io::stderr().is_terminal();
            redaction_summary::print_summary(&report.summary, &mut io::stderr(), theme_map, supports_color)?;
        }
        success_msg(
            format!(
                "Wrote {} ({} region(s) on {} of {} page(s))",
                output.display(),
                report.regions_redacted,
                report.pages_redacted,
                report.pages
            ),
            theme_map,
        );
    }

    info!("pdf redaction completed");
    Ok(report)
}
