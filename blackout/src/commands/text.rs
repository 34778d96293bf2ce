//! `blackout text`: redact plain text from a file or stdin.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use log::{debug, info};

use blackout_core::{redact_text, PatternRegistry, TextRedaction};

use super::info_msg;
use crate::ui::redaction_summary;
use crate::ui::theme::ThemeMap;

pub struct TextOptions {
    pub input: String,
    pub output_path: Option<PathBuf>,
    pub no_redaction_summary: bool,
    pub quiet: bool,
}

/// Reads the whole input, from `path` or stdin.
pub fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

pub fn run_text_opts(registry: &PatternRegistry, opts: TextOptions, theme_map: &ThemeMap) -> Result<TextRedaction> {
    info!("Starting text redaction.");
    let result = redact_text(registry, &opts.input);
    debug!(
        "Text redacted. Original length: {}, redacted length: {}",
        opts.input.len(),
        result.text.len()
    );

    match &opts.output_path {
        Some(path) => {
            if !opts.quiet {
                info_msg(format!("Writing redacted content to file: {}", path.display()), theme_map);
            }
            fs::write(path, &result.text)
                .with_context(|| format!("Failed to write output file {}", path.display()))?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(result.text.as_bytes())?;
            if !result.text.ends_with('\n') {
                writeln!(stdout)?;
            }
        }
    }

    if !opts.no_redaction_summary && !opts.quiet {
        let supports_color = io::stderr().is_terminal();
        redaction_summary::print_summary(&result.summary, &mut io::stderr(), theme_map, supports_color)?;
    }

    info!("Text redaction completed.");
    Ok(result)
}
