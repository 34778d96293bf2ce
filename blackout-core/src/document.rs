//! Defines the `RedactableDocument` trait and the region types it exchanges.
//!
//! The redaction pipeline never talks to a PDF library directly. It consumes
//! three capabilities through this trait (text extraction, text-to-geometry
//! search and staged commit) so the scanner and applicator stay agnostic of
//! the concrete backend.
//!
//! License: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

use crate::errors::RedactionError;
use crate::geometry::Rect;

/// A rectangular area on one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub page_index: usize,
    pub rect: Rect,
}

/// A pending opaque-black redaction of one region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RedactionMark {
    pub region: Region,
}

/// An open document whose pages can be redacted in place.
///
/// Page indices are zero-based. Implementations are not required to support
/// concurrent page mutation; callers serialise all commits against one handle.
pub trait RedactableDocument {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Best-effort plain text of a page. Layout is not preserved.
    fn extract_text(&self, page_index: usize) -> Result<String, RedactionError>;

    /// Rectangles where `literal` is rendered on the page.
    ///
    /// May be empty, for instance when the renderer places parts of the
    /// literal on different lines than the extractor reported.
    fn search(&self, page_index: usize, literal: &str) -> Result<Vec<Rect>, RedactionError>;

    /// Stages a redaction of `rect` on the page.
    fn mark(&mut self, page_index: usize, rect: Rect);

    /// Staged marks for the page.
    fn pending_marks(&self, page_index: usize) -> Vec<RedactionMark>;

    /// Drops every staged mark for the page without applying it.
    fn discard_marks(&mut self, page_index: usize);

    /// Destructively commits all staged marks for the page, removing the
    /// underlying content, and returns the number of marks applied.
    ///
    /// Either every mark takes effect or, on error, the page is left exactly
    /// as it was. Staged marks are consumed in both cases. Committing with no
    /// staged marks leaves the page untouched.
    fn apply(&mut self, page_index: usize) -> Result<usize, RedactionError>;
}
