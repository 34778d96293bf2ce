//! Redaction applicator: resolves literals to regions and commits them.
//!
//! For one page, every unique literal is searched, every returned rectangle
//! is marked, and the accumulated marks are committed exactly once. A literal
//! that resolves to no rectangle is recorded and skipped: text extraction and
//! rendered layout can disagree (a number wrapped across lines, re-flowed
//! whitespace), and literal search cannot reconcile that.

use log::debug;
use serde::Serialize;

use crate::document::{RedactableDocument, Region};
use crate::errors::RedactionError;
use crate::redaction_match::log_unresolved_literal_debug;
use crate::scanner::PageScan;

/// What happened on one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageOutcome {
    pub page_index: usize,
    /// Regions that were marked and committed.
    pub regions: Vec<Region>,
    /// Literals that were detected but could not be located.
    #[serde(skip)]
    pub unresolved: Vec<String>,
    pub unresolved_count: usize,
    /// Marks the backend reported as applied.
    pub committed: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RedactionApplicator;

impl RedactionApplicator {
    pub fn new() -> Self {
        Self
    }

    /// Marks and commits every literal of `scan` on its page.
    ///
    /// On failure all marks staged for the page are dropped and the page is
    /// left unmodified.
    pub fn apply_page<D>(&self, doc: &mut D, scan: &PageScan) -> Result<PageOutcome, RedactionError>
    where
        D: RedactableDocument + ?Sized,
    {
        let page_index = scan.page_index;
        let mut outcome = PageOutcome {
            page_index,
            ..Default::default()
        };

        for literal in scan.literals() {
            let rects = match doc.search(page_index, literal) {
                Ok(rects) => rects,
                Err(e) => {
                    doc.discard_marks(page_index);
                    return Err(e);
                }
            };

            if rects.is_empty() {
                log_unresolved_literal_debug(module_path!(), page_index, literal);
                outcome.unresolved.push(literal.to_string());
                continue;
            }

            for rect in rects {
                doc.mark(page_index, rect);
                outcome.regions.push(Region { page_index, rect });
            }
        }

        outcome.unresolved_count = outcome.unresolved.len();
        outcome.committed = doc.apply(page_index)?;
        debug!(
            "Page {}: {} region(s) committed, {} literal(s) unresolved",
            page_index, outcome.committed, outcome.unresolved_count
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorConfig;
    use crate::sanitizers::compiler::PatternRegistry;
    use crate::scanner::PageScanner;
    use crate::testing::MockDocument;

    fn registry() -> PatternRegistry {
        PatternRegistry::from_config(&DetectorConfig::load_default().unwrap()).unwrap()
    }

    #[test]
    fn test_literals_are_marked_and_committed_once() {
        let registry = registry();
        let mut doc = MockDocument::new(vec!["Contact: jane@example.com, call 9876543210"]);
        let text = doc.extract_text(0).unwrap();
        let scan = PageScanner::new(&registry).scan_page(0, &text);

        let outcome = RedactionApplicator::new().apply_page(&mut doc, &scan).unwrap();

        assert_eq!(outcome.regions.len(), 2);
        assert_eq!(outcome.committed, 2);
        assert_eq!(doc.apply_calls(0), 1);
        let redacted = doc.extract_text(0).unwrap();
        assert!(!redacted.contains("jane@example.com"));
        assert!(!redacted.contains("9876543210"));
        assert!(redacted.starts_with("Contact: "));
    }

    #[test]
    fn test_unresolved_literal_is_not_an_error() {
        let registry = registry();
        let mut doc = MockDocument::new(vec!["call 9876543210"]).with_unsearchable("9876543210");
        let scan = PageScanner::new(&registry).scan_page(0, "call 9876543210");

        let outcome = RedactionApplicator::new().apply_page(&mut doc, &scan).unwrap();

        assert!(outcome.regions.is_empty());
        assert_eq!(outcome.unresolved, vec!["9876543210".to_string()]);
        assert_eq!(outcome.committed, 0);
        assert_eq!(doc.extract_text(0).unwrap(), "call 9876543210");
    }

    #[test]
    fn test_commit_failure_leaves_page_untouched() {
        let registry = registry();
        let mut doc = MockDocument::new(vec!["mail jane@example.com"]).failing_on_page(0);
        let scan = PageScanner::new(&registry).scan_page(0, "mail jane@example.com");

        let err = RedactionApplicator::new().apply_page(&mut doc, &scan).unwrap_err();

        assert!(matches!(err, RedactionError::Commit { page: 0, .. }));
        assert_eq!(doc.extract_text(0).unwrap(), "mail jane@example.com");
        assert!(doc.pending_marks(0).is_empty());
    }

    #[test]
    fn test_empty_scan_commits_nothing() {
        let mut doc = MockDocument::new(vec!["nothing to see"]);
        let scan = PageScan { page_index: 0, matches: Vec::new() };

        let outcome = RedactionApplicator::new().apply_page(&mut doc, &scan).unwrap();

        assert_eq!(outcome.committed, 0);
        assert_eq!(doc.extract_text(0).unwrap(), "nothing to see");
    }
}
