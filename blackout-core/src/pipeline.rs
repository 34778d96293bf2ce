//! End-to-end redaction of a document.
//!
//! Pages are processed strictly in order: extract, scan, resolve literals,
//! commit. The first error aborts the run and nothing is written. A
//! deadline, when set, is checked between pages only.
//!
//! License: MIT OR Apache-2.0

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::applicator::{PageOutcome, RedactionApplicator};
use crate::document::RedactableDocument;
use crate::errors::{OpenError, RedactionError};
use crate::pdf::{write_atomic, LopdfDocument};
use crate::redaction_match::Match;
use crate::report::{RedactionReport, ScanReport};
use crate::sanitizers::compiler::PatternRegistry;
use crate::scanner::PageScanner;

/// Prefix of the default output file name.
pub const OUTPUT_PREFIX: &str = "redacted_";

/// Per-run options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedactOptions {
    /// Abort before starting a page once this instant has passed.
    pub deadline: Option<Instant>,
}

impl RedactOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    fn check_deadline(&self, next_page: usize) -> Result<(), RedactionError> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                warn!("Deadline exceeded before page {}", next_page);
                Err(RedactionError::DeadlineExceeded { next_page })
            }
            _ => Ok(()),
        }
    }
}

/// What a redaction pass did to an open document.
#[derive(Debug, Clone, Default)]
pub struct DocumentRedaction {
    pub pages: usize,
    pub matches: Vec<Match>,
    pub outcomes: Vec<PageOutcome>,
}

impl DocumentRedaction {
    pub fn regions_committed(&self) -> usize {
        self.outcomes.iter().map(|o| o.committed).sum()
    }
}

/// Scans and redacts every page of `doc` in place.
pub fn redact_document<D>(
    doc: &mut D,
    registry: &PatternRegistry,
    options: &RedactOptions,
) -> Result<DocumentRedaction, RedactionError>
where
    D: RedactableDocument + ?Sized,
{
    let scanner = PageScanner::new(registry);
    let applicator = RedactionApplicator::new();
    let mut result = DocumentRedaction {
        pages: doc.page_count(),
        ..Default::default()
    };

    for page_index in 0..result.pages {
        options.check_deadline(page_index)?;
        let text = doc.extract_text(page_index)?;
        let scan = scanner.scan_page(page_index, &text);
        let outcome = applicator.apply_page(doc, &scan)?;
        result.matches.extend(scan.matches);
        result.outcomes.push(outcome);
    }

    debug!(
        "Redaction pass finished: {} page(s), {} match(es), {} region(s)",
        result.pages,
        result.matches.len(),
        result.regions_committed()
    );
    Ok(result)
}

/// Matches on every page of `doc`, without modifying it.
pub fn scan_pages<D>(doc: &D, registry: &PatternRegistry) -> Result<Vec<Match>, RedactionError>
where
    D: RedactableDocument + ?Sized,
{
    let scanner = PageScanner::new(registry);
    let mut matches = Vec::new();
    for page_index in 0..doc.page_count() {
        let text = doc.extract_text(page_index)?;
        matches.extend(scanner.scan_page(page_index, &text).matches);
    }
    Ok(matches)
}

/// `redacted_<name>` next to `input`.
pub fn default_output_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document.pdf".to_string());
    input.with_file_name(format!("{}{}", OUTPUT_PREFIX, name))
}

fn read_input(input: &Path) -> Result<Vec<u8>, RedactionError> {
    fs::read(input).map_err(|source| {
        RedactionError::Open(OpenError::Read {
            path: input.to_path_buf(),
            source,
        })
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Redacts the PDF at `input` and writes the result to `output`.
///
/// The input file is never modified. On any error no file is created at
/// `output`. When nothing was committed the input bytes are copied through
/// unchanged.
pub fn redact(
    input: &Path,
    output: &Path,
    registry: &PatternRegistry,
    options: &RedactOptions,
) -> Result<RedactionReport, RedactionError> {
    if same_file(input, output) {
        return Err(RedactionError::Save {
            path: output.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "output would overwrite the input document",
            ),
        });
    }

    let bytes = read_input(input)?;
    let mut doc = LopdfDocument::from_bytes(&bytes)?;
    info!("Redacting {} ({} page(s))", input.display(), doc.page_count());

    let result = redact_document(&mut doc, registry, options)?;

    if doc.is_modified() {
        doc.save_atomic(output)?;
    } else {
        debug!("No region committed; copying input unchanged");
        write_atomic(output, |writer| writer.write_all(&bytes))?;
    }

    let report = RedactionReport::new(input, output, &bytes, result.pages, &result.matches, result.outcomes);
    info!(
        "Wrote {}: {} region(s) on {} page(s), {} unresolved literal(s)",
        report.output, report.regions_redacted, report.pages_redacted, report.unresolved_literals
    );
    Ok(report)
}

/// Reports the matches in the PDF at `input` without writing anything.
pub fn scan_document(input: &Path, registry: &PatternRegistry) -> Result<ScanReport, RedactionError> {
    let bytes = read_input(input)?;
    let doc = LopdfDocument::from_bytes(&bytes)?;
    let matches = scan_pages(&doc, registry)?;
    info!("Scanned {}: {} match(es)", input.display(), matches.len());
    Ok(ScanReport::new(input, &bytes, doc.page_count(), &matches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorConfig;
    use crate::testing::MockDocument;

    fn registry() -> PatternRegistry {
        PatternRegistry::from_config(&DetectorConfig::load_default().unwrap()).unwrap()
    }

    #[test]
    fn test_redacts_only_pages_with_matches() {
        let registry = registry();
        let mut doc = MockDocument::new(vec!["Contact: jane@example.com, call 9876543210", "Nothing here."]);

        let result = redact_document(&mut doc, &registry, &RedactOptions::default()).unwrap();

        assert_eq!(result.pages, 2);
        assert_eq!(result.outcomes[0].committed, 2);
        assert_eq!(result.outcomes[1].committed, 0);
        assert_eq!(doc.extract_text(1).unwrap(), "Nothing here.");
        assert_eq!(doc.apply_calls(1), 1);
    }

    #[test]
    fn test_expired_deadline_stops_before_first_page() {
        let registry = registry();
        let mut doc = MockDocument::new(vec!["jane@example.com"]);
        let options = RedactOptions {
            deadline: Some(Instant::now()),
        };

        let err = redact_document(&mut doc, &registry, &options).unwrap_err();

        assert!(matches!(err, RedactionError::DeadlineExceeded { next_page: 0 }));
        assert_eq!(doc.apply_calls(0), 0);
    }

    #[test]
    fn test_commit_failure_aborts_remaining_pages() {
        let registry = registry();
        let mut doc = MockDocument::new(vec!["a@b.io", "c@d.io"]).failing_on_page(0);

        let err = redact_document(&mut doc, &registry, &RedactOptions::default()).unwrap_err();

        assert_eq!(err.page(), Some(0));
        assert_eq!(doc.apply_calls(1), 0);
    }

    #[test]
    fn test_scan_pages_leaves_document_untouched() {
        let registry = registry();
        let doc = MockDocument::new(vec!["a@b.io", "ip 10.0.0.1"]);
        let matches = scan_pages(&doc, &registry).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(doc.extract_text(0).unwrap(), "a@b.io");
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/tmp/in/report.pdf")),
            PathBuf::from("/tmp/in/redacted_report.pdf")
        );
        assert_eq!(default_output_path(Path::new("a.pdf")), PathBuf::from("redacted_a.pdf"));
    }
}
