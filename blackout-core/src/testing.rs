//! In-memory `RedactableDocument` used by unit tests.
//!
//! Each page is a single line of text. A rectangle spans character indices
//! `x0..x1`; committing a mark overwrites those characters with `█`.

use std::collections::{HashMap, HashSet};

use crate::document::{RedactableDocument, RedactionMark, Region};
use crate::errors::RedactionError;
use crate::geometry::Rect;

#[derive(Debug, Default)]
pub(crate) struct MockDocument {
    pages: Vec<String>,
    marks: HashMap<usize, Vec<Rect>>,
    failing_pages: HashSet<usize>,
    unsearchable: HashSet<String>,
    apply_calls: HashMap<usize, usize>,
}

impl MockDocument {
    pub(crate) fn new(pages: Vec<&str>) -> Self {
        Self {
            pages: pages.into_iter().map(str::to_string).collect(),
            ..Default::default()
        }
    }

    pub(crate) fn failing_on_page(mut self, page_index: usize) -> Self {
        self.failing_pages.insert(page_index);
        self
    }

    pub(crate) fn with_unsearchable(mut self, literal: &str) -> Self {
        self.unsearchable.insert(literal.to_string());
        self
    }

    pub(crate) fn apply_calls(&self, page_index: usize) -> usize {
        self.apply_calls.get(&page_index).copied().unwrap_or(0)
    }

    fn page(&self, page_index: usize) -> Result<&String, RedactionError> {
        self.pages.get(page_index).ok_or(RedactionError::Extraction {
            page: page_index,
            message: "no such page".to_string(),
        })
    }
}

impl RedactableDocument for MockDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn extract_text(&self, page_index: usize) -> Result<String, RedactionError> {
        self.page(page_index).cloned()
    }

    fn search(&self, page_index: usize, literal: &str) -> Result<Vec<Rect>, RedactionError> {
        if self.unsearchable.contains(literal) {
            return Ok(Vec::new());
        }
        let text = self.page(page_index)?;
        let len = literal.chars().count();
        Ok(text
            .match_indices(literal)
            .map(|(byte_idx, _)| {
                let start = text[..byte_idx].chars().count();
                Rect::new(start as f32, 0.0, (start + len) as f32, 1.0)
            })
            .collect())
    }

    fn mark(&mut self, page_index: usize, rect: Rect) {
        self.marks.entry(page_index).or_default().push(rect);
    }

    fn pending_marks(&self, page_index: usize) -> Vec<RedactionMark> {
        self.marks
            .get(&page_index)
            .map(|rects| {
                rects
                    .iter()
                    .map(|rect| RedactionMark { region: Region { page_index, rect: *rect } })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn discard_marks(&mut self, page_index: usize) {
        self.marks.remove(&page_index);
    }

    fn apply(&mut self, page_index: usize) -> Result<usize, RedactionError> {
        *self.apply_calls.entry(page_index).or_default() += 1;
        let marks = self.marks.remove(&page_index).unwrap_or_default();
        if self.failing_pages.contains(&page_index) {
            return Err(RedactionError::Commit {
                page: page_index,
                message: "injected failure".to_string(),
            });
        }
        if marks.is_empty() {
            return Ok(0);
        }
        let mut chars: Vec<char> = self.page(page_index)?.chars().collect();
        for rect in &marks {
            let end = (rect.x1 as usize).min(chars.len());
            for c in chars.iter_mut().take(end).skip(rect.x0 as usize) {
                *c = '█';
            }
        }
        self.pages[page_index] = chars.into_iter().collect();
        Ok(marks.len())
    }
}
