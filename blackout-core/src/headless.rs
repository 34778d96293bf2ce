//! `headless.rs`
//! One-shot redaction of plain text, for callers that have a string rather
//! than a document.

use crate::redaction_match::Match;
use crate::report::{summarize, RedactionSummaryItem};
use crate::sanitizers::compiler::PatternRegistry;
use crate::scanner::PageScanner;

/// Replacement written over every matched span.
pub const REDACTION_BLOCK: &str = "████";

/// Redacted text plus what was found in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRedaction {
    pub text: String,
    pub matches: Vec<Match>,
    pub summary: Vec<RedactionSummaryItem>,
}

/// Replaces every detector match in `content` with [`REDACTION_BLOCK`].
///
/// Overlapping matches from different detectors are resolved left to right:
/// the earliest start wins, and of two spans starting together the longer
/// one wins. A span that overlaps an already replaced one extends that
/// replacement.
pub fn redact_text(registry: &PatternRegistry, content: &str) -> TextRedaction {
    let scan = PageScanner::new(registry).scan_page(0, content);
    let mut spans: Vec<(usize, usize)> = scan.matches.iter().map(|m| (m.start, m.end)).collect();
    spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    let mut text = String::with_capacity(content.len());
    let mut last_end = 0usize;
    for (start, end) in spans {
        if end <= last_end {
            continue;
        }
        if start >= last_end {
            text.push_str(&content[last_end..start]);
            text.push_str(REDACTION_BLOCK);
        }
        last_end = end;
    }
    text.push_str(&content[last_end..]);

    let summary = summarize(&scan.matches);
    TextRedaction {
        text,
        matches: scan.matches,
        summary,
    }
}
