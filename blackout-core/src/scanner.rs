//! Page scanner: runs every detector over one page's extracted text.
//!
//! All detectors see the same immutable snapshot of the page text, so the
//! result does not depend on detector order. The literal passed downstream is
//! the full match span, exactly as extracted; it is never case-folded or
//! whitespace-normalised.

use std::collections::HashSet;

use crate::redaction_match::{log_match_debug, Match};
use crate::sanitizers::compiler::PatternRegistry;

/// The detections on a single page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageScan {
    pub page_index: usize,
    pub matches: Vec<Match>,
}

impl PageScan {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Unique literals in first-seen order.
    ///
    /// Identical literals resolve to identical geometry, so searching each
    /// one once is enough.
    pub fn literals(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.matches
            .iter()
            .map(|m| m.literal.as_str())
            .filter(|literal| seen.insert(*literal))
            .collect()
    }
}

/// Borrowing scanner over a compiled registry.
#[derive(Debug, Clone, Copy)]
pub struct PageScanner<'r> {
    registry: &'r PatternRegistry,
}

impl<'r> PageScanner<'r> {
    pub fn new(registry: &'r PatternRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r PatternRegistry {
        self.registry
    }

    /// Finds every detector match in `text`.
    ///
    /// Matches are ordered by detector, then by position.
    pub fn scan_page(&self, page_index: usize, text: &str) -> PageScan {
        let mut matches = Vec::new();
        for detector in self.registry.iter() {
            for (start, end, literal) in detector.find_spans(text) {
                let m = Match {
                    detector: detector.name.clone(),
                    label: detector.label.clone(),
                    literal: literal.to_string(),
                    page_index,
                    start,
                    end,
                };
                log_match_debug(module_path!(), &m);
                matches.push(m);
            }
        }
        PageScan { page_index, matches }
    }
}
