// blackout-core/src/lib.rs
//! # Blackout Core Library
//!
//! `blackout-core` finds personal data in PDF documents and removes it
//! irreversibly. A fixed, ordered set of regex detectors is run over the text
//! of each page; every matched literal is located on the page, and the
//! content under it is deleted and painted over with an opaque black box.
//!
//! The library performs no interactive I/O. Reading the input, writing the
//! output atomically and producing a serializable report is all it does.
//!
//! ## Modules
//!
//! * `config`: `Detector` definitions, YAML loading, merging and enable/disable.
//! * `sanitizers`: compiles detectors into the immutable `PatternRegistry`.
//! * `scanner`: runs every detector over one page of text.
//! * `document`: the `RedactableDocument` trait the pipeline is written against.
//! * `applicator`: resolves literals to page regions and commits them.
//! * `pdf`: the `lopdf`-backed `RedactableDocument` implementation.
//! * `pipeline`: `redact`, `scan_document` and the backend-agnostic core.
//! * `headless`: one-shot redaction of plain strings.
//! * `report`: per-detector summaries and run reports.
//! * `redaction_match`: match records and PII-safe debug logging.
//! * `geometry`: rectangles and affine matrices in PDF user space.
//! * `errors`: the library's error enums.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use blackout_core::{redact, DetectorConfig, PatternRegistry, RedactOptions};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = DetectorConfig::load_default()?;
//!     let registry = PatternRegistry::from_config(&config)?;
//!
//!     let report = redact(
//!         Path::new("statement.pdf"),
//!         Path::new("redacted_statement.pdf"),
//!         &registry,
//!         &RedactOptions::default(),
//!     )?;
//!     println!("wrote {} ({} regions)", report.output, report.regions_redacted);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Detector problems surface as [`BlackoutError`]. Everything that can go
//! wrong while a document is processed is a [`RedactionError`]; a document
//! that cannot be opened at all is wrapped as [`OpenError`]. A literal that is
//! detected but cannot be located on the page is not an error, it is counted
//! in the report.
//!
//! ---
//! License: MIT OR Apache-2.0

pub mod applicator;
pub mod config;
pub mod document;
pub mod errors;
pub mod geometry;
pub mod headless;
pub mod pdf;
pub mod pipeline;
pub mod redaction_match;
pub mod report;
pub mod sanitizers;
pub mod scanner;

#[cfg(test)]
mod testing;

/// Detector configuration.
pub use config::{merge_detectors, validate_detectors, Detector, DetectorConfig, MAX_PATTERN_LENGTH};

pub use errors::{BlackoutError, OpenError, RedactionError};

/// The compiled, immutable detector set.
pub use sanitizers::compiler::{compile_detectors, CompiledDetector, PatternRegistry};

pub use applicator::{PageOutcome, RedactionApplicator};
pub use document::{RedactableDocument, RedactionMark, Region};
pub use geometry::Rect;
pub use scanner::{PageScan, PageScanner};

/// Document-level entry points.
pub use pdf::LopdfDocument;
pub use pipeline::{default_output_path, redact, redact_document, scan_document, RedactOptions};

pub use headless::{redact_text, TextRedaction, REDACTION_BLOCK};
pub use redaction_match::{redact_sensitive, Match, SampleHasher};
pub use report::{RedactionReport, RedactionSummaryItem, ScanReport};
