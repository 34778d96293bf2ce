//! Serializable summaries of redaction and scan runs.
//!
//! Reports never carry matched literals; each detector entry lists keyed
//! sample hashes of its matches instead. The key is drawn fresh for every
//! report, so equal hashes mean equal literals only within that report.
//!
//! License: MIT OR Apache-2.0

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::applicator::PageOutcome;
use crate::errors::BlackoutError;
use crate::redaction_match::{Match, SampleHasher};

/// Matches of one detector across a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionSummaryItem {
    pub detector: String,
    pub label: String,
    pub occurrences: usize,
    /// Zero-based pages the detector fired on, ascending.
    pub pages: Vec<usize>,
    pub sample_hashes: Vec<String>,
}

/// Groups `matches` by detector, ordered by detector name.
pub fn summarize(matches: &[Match]) -> Vec<RedactionSummaryItem> {
    summarize_with(matches, &SampleHasher::new())
}

pub fn summarize_with(matches: &[Match], hasher: &SampleHasher) -> Vec<RedactionSummaryItem> {
    let mut by_detector: BTreeMap<&str, RedactionSummaryItem> = BTreeMap::new();
    for m in matches {
        let item = by_detector
            .entry(m.detector.as_str())
            .or_insert_with(|| RedactionSummaryItem {
                detector: m.detector.clone(),
                label: m.label.clone(),
                occurrences: 0,
                pages: Vec::new(),
                sample_hashes: Vec::new(),
            });
        item.occurrences += 1;
        if !item.pages.contains(&m.page_index) {
            item.pages.push(m.page_index);
        }
        let hash = hasher.hash_match(m);
        if !item.sample_hashes.contains(&hash) {
            item.sample_hashes.push(hash);
        }
    }
    let mut items: Vec<RedactionSummaryItem> = by_detector.into_values().collect();
    for item in &mut items {
        item.pages.sort_unstable();
    }
    items
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Result of a successful `redact` run.
#[derive(Debug, Clone, Serialize)]
pub struct RedactionReport {
    pub input: String,
    /// File name of the written document.
    pub output: String,
    pub input_sha256: String,
    pub generated_at: String,
    pub pages: usize,
    pub pages_redacted: usize,
    pub total_matches: usize,
    pub regions_redacted: usize,
    pub unresolved_literals: usize,
    pub summary: Vec<RedactionSummaryItem>,
    pub page_outcomes: Vec<PageOutcome>,
}

impl RedactionReport {
    pub fn new(
        input: &Path,
        output: &Path,
        input_bytes: &[u8],
        pages: usize,
        matches: &[Match],
        page_outcomes: Vec<PageOutcome>,
    ) -> Self {
        Self {
            input: input.display().to_string(),
            output: display_name(output),
            input_sha256: sha256_hex(input_bytes),
            generated_at: now_rfc3339(),
            pages,
            pages_redacted: page_outcomes.iter().filter(|o| o.committed > 0).count(),
            total_matches: matches.len(),
            regions_redacted: page_outcomes.iter().map(|o| o.committed).sum(),
            unresolved_literals: page_outcomes.iter().map(|o| o.unresolved_count).sum(),
            summary: summarize(matches),
            page_outcomes,
        }
    }

    pub fn to_json(&self) -> Result<String, BlackoutError> {
        serde_json::to_string_pretty(self).map_err(|e| BlackoutError::SerializationError(e.to_string()))
    }
}

/// Match count of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMatches {
    pub page_index: usize,
    pub matches: usize,
}

/// Result of a read-only `scan_document` run.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub input: String,
    pub input_sha256: String,
    pub generated_at: String,
    pub pages: usize,
    pub total_matches: usize,
    pub per_page: Vec<PageMatches>,
    pub summary: Vec<RedactionSummaryItem>,
}

impl ScanReport {
    pub fn new(input: &Path, input_bytes: &[u8], pages: usize, matches: &[Match]) -> Self {
        let mut per_page: Vec<PageMatches> = (0..pages)
            .map(|page_index| PageMatches { page_index, matches: 0 })
            .collect();
        for m in matches {
            if let Some(entry) = per_page.get_mut(m.page_index) {
                entry.matches += 1;
            }
        }
        Self {
            input: input.display().to_string(),
            input_sha256: sha256_hex(input_bytes),
            generated_at: now_rfc3339(),
            pages,
            total_matches: matches.len(),
            per_page,
            summary: summarize(matches),
        }
    }

    pub fn to_json(&self) -> Result<String, BlackoutError> {
        serde_json::to_string_pretty(self).map_err(|e| BlackoutError::SerializationError(e.to_string()))
    }
}
