//! Summary tables printed after a run.

use std::io::Write;

use anyhow::Result;
use blackout_core::{Detector, RedactionSummaryItem};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, ContentArrangement, Table};

use super::output_format::{styled, write_styled};
use super::theme::{ThemeEntry, ThemeMap};

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(*h)));
    table
}

/// Page numbers are printed one-based.
fn format_pages(pages: &[usize]) -> String {
    pages
        .iter()
        .map(|p| (p + 1).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Prints the per-detector summary of a run. Matched text never appears here.
pub fn print_summary<W: Write + ?Sized>(
    summary: &[RedactionSummaryItem],
    writer: &mut W,
    theme: &ThemeMap,
    supports_color: bool,
) -> Result<()> {
    if summary.is_empty() {
        write_styled(writer, "No personal data found.", ThemeEntry::Success, theme, supports_color)?;
        writeln!(writer)?;
        return Ok(());
    }

    write_styled(writer, "Redaction Summary", ThemeEntry::Header, theme, supports_color)?;
    writeln!(writer)?;

    let mut table = new_table(&["Detector", "Label", "Occurrences", "Pages"]);
    for item in summary {
        table.add_row(vec![
            Cell::new(styled(&item.detector, ThemeEntry::SummaryDetector, theme, supports_color)),
            Cell::new(&item.label),
            Cell::new(styled(&item.occurrences.to_string(), ThemeEntry::SummaryOccurrences, theme, supports_color)),
            Cell::new(styled(&format_pages(&item.pages), ThemeEntry::SummaryPages, theme, supports_color)),
        ]);
    }
    writeln!(writer, "{table}")?;

    let total: usize = summary.iter().map(|item| item.occurrences).sum();
    writeln!(writer, "Total: {total}")?;
    Ok(())
}

/// Prints the active detector set in execution order.
pub fn print_detectors<W: Write + ?Sized>(
    detectors: &[Detector],
    writer: &mut W,
    theme: &ThemeMap,
    supports_color: bool,
) -> Result<()> {
    let mut table = new_table(&["#", "Detector", "Label", "Pattern"]);
    for (i, detector) in detectors.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(styled(&detector.name, ThemeEntry::SummaryDetector, theme, supports_color)),
            Cell::new(detector.display_label()),
            Cell::new(&detector.pattern),
        ]);
    }
    writeln!(writer, "{table}")?;
    Ok(())
}
