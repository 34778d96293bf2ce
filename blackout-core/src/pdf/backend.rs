//! `LopdfDocument`: an in-memory PDF opened for redaction.
//!
//! The input file is read once into memory and never written back. Marks
//! are staged per page; committing a page replaces its content stream with a
//! freshly built one, and saving rewrites the whole file so removed objects
//! do not survive in an incremental-update section.
//!
//! Forms whose content changes are copied and the copy is linked from a
//! page-local `/Resources`, so other pages painting the same form keep the
//! original.
//!
//! License: MIT OR Apache-2.0

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::rc::Rc;

use log::{debug, info};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tempfile::NamedTempFile;

use super::content::encode_stream;
use super::layout::{layout_page, PageLayout, StreamIndex, TextIndex};
use super::rewrite::{paint_marks, redact_stream, Rewrite};
use super::{dict_get, page_resources};
use crate::document::{RedactableDocument, RedactionMark, Region};
use crate::errors::{OpenError, RedactionError};
use crate::geometry::Rect;

struct PageContent {
    layout: PageLayout,
    index: TextIndex,
}

/// Everything a commit writes, built before the document is touched.
struct CommitPlan {
    /// Rewritten form copies under freshly reserved ids.
    forms: Vec<(ObjectId, Stream)>,
    content: Vec<u8>,
    resources: Option<Dictionary>,
    removed_glyphs: usize,
    removed_images: usize,
}

pub struct LopdfDocument {
    doc: Document,
    page_ids: Vec<ObjectId>,
    marks: HashMap<usize, Vec<Rect>>,
    /// Layout of the page last read; a pass extracts and searches the same
    /// page many times before committing it.
    current: RefCell<Option<(usize, Rc<PageContent>)>>,
    modified: bool,
}

impl std::fmt::Debug for LopdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LopdfDocument")
            .field("pages", &self.page_ids.len())
            .field("modified", &self.modified)
            .finish()
    }
}

impl LopdfDocument {
    /// Reads and parses the PDF at `path`.
    pub fn open(path: &Path) -> Result<Self, OpenError> {
        let bytes = fs::read(path).map_err(|source| OpenError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let doc = Self::from_bytes(&bytes)?;
        info!("Opened {} ({} page(s))", path.display(), doc.page_count());
        Ok(doc)
    }

    /// Parses a PDF held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, OpenError> {
        let doc = Document::load_mem(bytes).map_err(|e| OpenError::Malformed(e.to_string()))?;
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(OpenError::NoPages);
        }
        Ok(Self {
            doc,
            page_ids,
            marks: HashMap::new(),
            current: RefCell::new(None),
            modified: false,
        })
    }

    /// True once any page has been committed.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Writes the document to `output` atomically.
    pub fn save_atomic(&mut self, output: &Path) -> Result<(), RedactionError> {
        self.finish();
        let doc = &mut self.doc;
        write_atomic(output, |writer| {
            doc.save_to(writer).map_err(|e| std::io::Error::other(e.to_string()))
        })
    }

    /// Drops every object the committed pages no longer reach.
    fn finish(&mut self) {
        if !self.modified {
            return;
        }
        self.localize_resources();
        let pruned = self.doc.prune_objects();
        debug!("Pruned {} unreferenced object(s) before save", pruned.len());
    }

    /// Gives every page its own `/Resources` and removes them from the page
    /// tree nodes, so XObjects detached from a page are not kept alive
    /// through an ancestor.
    fn localize_resources(&mut self) {
        let inherited: Vec<(ObjectId, Dictionary)> = self
            .page_ids
            .iter()
            .filter_map(|&id| {
                let page = self.doc.get_dictionary(id).ok()?;
                if page.has(b"Resources") {
                    return None;
                }
                Some((id, page_resources(&self.doc, id)?.clone()))
            })
            .collect();
        for (id, resources) in inherited {
            if let Ok(page) = self.doc.get_object_mut(id).and_then(Object::as_dict_mut) {
                page.set("Resources", Object::Dictionary(resources));
            }
        }
        for object in self.doc.objects.values_mut() {
            let Ok(node) = object.as_dict_mut() else {
                continue;
            };
            if node.get(b"Type").and_then(Object::as_name).ok() == Some(b"Pages".as_slice()) {
                node.remove(b"Resources");
            }
        }
    }

    fn page_id(&self, page_index: usize) -> Option<ObjectId> {
        self.page_ids.get(page_index).copied()
    }

    fn load_page(&self, page_index: usize) -> Result<PageContent, String> {
        let page_id = self
            .page_id(page_index)
            .ok_or_else(|| format!("page {} out of range", page_index))?;
        let data = self.doc.get_page_content(page_id).map_err(|e| e.to_string())?;
        let layout = layout_page(&self.doc, page_id, &data)?;
        let index = layout.text_index();
        Ok(PageContent { layout, index })
    }

    /// The laid-out page, reusing the last one when it is the same page.
    fn page(&self, page_index: usize) -> Result<Rc<PageContent>, String> {
        if let Some((cached, page)) = self.current.borrow().as_ref() {
            if *cached == page_index {
                return Ok(Rc::clone(page));
            }
        }
        let page = Rc::new(self.load_page(page_index)?);
        *self.current.borrow_mut() = Some((page_index, Rc::clone(&page)));
        Ok(page)
    }

    /// Builds the new page content, form copies and resources for `marks`.
    fn plan_commit(&mut self, page_id: ObjectId, layout: &PageLayout, marks: &[Rect]) -> Result<CommitPlan, String> {
        let mut rewrites: Vec<Rewrite> = (0..layout.streams.len().max(1))
            .map(|stream| redact_stream(layout, stream, marks))
            .collect();
        let mut replaced: HashMap<StreamIndex, ObjectId> = HashMap::new();
        let mut forms = Vec::new();

        // Children always come after their parent, so walking backwards
        // finishes every form before the stream that paints it.
        for stream in (1..layout.streams.len()).rev() {
            let Some(form) = layout.streams[stream].form.as_ref() else {
                continue;
            };
            let children = replaced_children(layout, stream, &replaced);
            let rewrite = &rewrites[stream];
            if !rewrite.changed() && children.is_empty() {
                continue;
            }
            let original = self
                .doc
                .get_object(form.id)
                .and_then(Object::as_stream)
                .map_err(|e| e.to_string())?;
            let mut copy = if rewrite.changed() {
                let mut dict = original.dict.clone();
                dict.remove(b"Filter");
                dict.remove(b"DecodeParms");
                let content = encode_stream(rewrite.operations.clone(), &layout.streams[stream].inline_images)
                    .map_err(|e| e.to_string())?;
                Stream::new(dict, content)
            } else {
                original.clone()
            };
            let base = stream_resources(&self.doc, layout, page_id, stream);
            if let Some(resources) = detached_resources(&self.doc, base, rewrite, &children) {
                copy.dict.set("Resources", Object::Dictionary(resources));
            }
            let id = self.doc.new_object_id();
            replaced.insert(stream, id);
            forms.push((id, copy));
        }

        let removed_glyphs = rewrites.iter().map(|r| r.removed_glyphs).sum();
        let removed_images = rewrites.iter().map(Rewrite::removed_images).sum();
        let page_rewrite = std::mem::take(&mut rewrites[0]);
        let children = replaced_children(layout, 0, &replaced);
        let resources = detached_resources(&self.doc, page_resources(&self.doc, page_id), &page_rewrite, &children);
        let inline_images = layout.streams.first().map(|s| s.inline_images.as_slice()).unwrap_or_default();
        let content = encode_stream(paint_marks(page_rewrite.operations, marks), inline_images)
            .map_err(|e| e.to_string())?;

        Ok(CommitPlan {
            forms,
            content,
            resources,
            removed_glyphs,
            removed_images,
        })
    }

    /// Points the page at the planned content, and at its resources when
    /// given.
    fn install(&mut self, page_id: ObjectId, plan: CommitPlan) -> Result<(), lopdf::Error> {
        // Page lookup is the only fallible step; nothing is changed before it.
        self.doc.get_dictionary(page_id)?;
        for (id, form) in plan.forms {
            self.doc.objects.insert(id, Object::Stream(form));
        }
        let stream_id = self.doc.add_object(Stream::new(Dictionary::new(), plan.content));
        let page = self.doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?;
        page.set("Contents", Object::Reference(stream_id));
        if let Some(resources) = plan.resources {
            page.set("Resources", Object::Dictionary(resources));
        }
        Ok(())
    }
}

/// The resources `stream` is interpreted with: its own, else the nearest
/// ancestor's, else the page's.
fn stream_resources<'a>(
    doc: &'a Document,
    layout: &PageLayout,
    page_id: ObjectId,
    mut stream: StreamIndex,
) -> Option<&'a Dictionary> {
    while let Some(form) = layout.streams.get(stream).and_then(|s| s.form.as_ref()) {
        let own = doc
            .get_object(form.id)
            .and_then(Object::as_stream)
            .ok()
            .and_then(|f| dict_get(doc, &f.dict, b"Resources"))
            .and_then(|o| o.as_dict().ok());
        if own.is_some() {
            return own;
        }
        stream = form.parent;
    }
    page_resources(doc, page_id)
}

/// Forms painted from `parent` that were replaced by a rewritten copy.
fn replaced_children(
    layout: &PageLayout,
    parent: StreamIndex,
    replaced: &HashMap<StreamIndex, ObjectId>,
) -> Vec<(Vec<u8>, ObjectId)> {
    layout
        .streams
        .iter()
        .enumerate()
        .filter_map(|(index, stream)| {
            let form = stream.form.as_ref().filter(|f| f.parent == parent)?;
            Some((form.name.clone(), *replaced.get(&index)?))
        })
        .collect()
}

/// A copy of `base` with removed XObjects dropped from `/XObject`, when no
/// remaining operator still paints them, and replaced forms relinked.
/// `None` when nothing needs to change.
fn detached_resources(
    doc: &Document,
    base: Option<&Dictionary>,
    rewrite: &Rewrite,
    children: &[(Vec<u8>, ObjectId)],
) -> Option<Dictionary> {
    if rewrite.removed_xobjects.is_empty() && children.is_empty() {
        return None;
    }
    let mut resources = base?.clone();
    let mut xobjects = dict_get(doc, &resources, b"XObject")
        .and_then(|o| o.as_dict().ok())
        .cloned()?;

    let still_used: HashSet<&[u8]> = rewrite
        .operations
        .iter()
        .filter(|op| op.operator == "Do")
        .filter_map(|op| op.operands.first()?.as_name().ok())
        .collect();
    for name in &rewrite.removed_xobjects {
        if !still_used.contains(name.as_slice()) {
            xobjects.remove(name);
        }
    }
    for (name, id) in children {
        xobjects.set(name.clone(), Object::Reference(*id));
    }
    resources.set("XObject", Object::Dictionary(xobjects));
    Some(resources)
}

/// Writes `output` through a temporary file in the same directory, so the
/// target either holds the complete new content or is left as it was.
pub(crate) fn write_atomic<F>(output: &Path, write: F) -> Result<(), RedactionError>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> std::io::Result<()>,
{
    let save_err = |source: std::io::Error| RedactionError::Save {
        path: output.to_path_buf(),
        source,
    };
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(save_err)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer).map_err(save_err)?;
        writer.flush().map_err(save_err)?;
    }
    tmp.persist(output).map_err(|e| save_err(e.error))?;
    info!("Saved {}", output.display());
    Ok(())
}

impl RedactableDocument for LopdfDocument {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn extract_text(&self, page_index: usize) -> Result<String, RedactionError> {
        let page = self
            .page(page_index)
            .map_err(|message| RedactionError::Extraction { page: page_index, message })?;
        Ok(page.index.text.clone())
    }

    fn search(&self, page_index: usize, literal: &str) -> Result<Vec<Rect>, RedactionError> {
        let page = self
            .page(page_index)
            .map_err(|message| RedactionError::Extraction { page: page_index, message })?;
        Ok(page.index.find(literal, &page.layout.glyphs))
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
        let marks = self.marks.remove(&page_index).unwrap_or_default();
        if marks.is_empty() {
            return Ok(0);
        }
        let commit_err = |message: String| RedactionError::Commit { page: page_index, message };

        let page_id = self
            .page_id(page_index)
            .ok_or_else(|| commit_err(format!("page {} out of range", page_index)))?;
        let page = self.page(page_index).map_err(commit_err)?;
        let plan = self.plan_commit(page_id, &page.layout, &marks).map_err(commit_err)?;
        let removed_glyphs = plan.removed_glyphs;
        let removed_images = plan.removed_images;

        self.install(page_id, plan).map_err(|e| commit_err(e.to_string()))?;
        self.current.get_mut().take();
        self.modified = true;

        debug!(
            "Page {}: {} mark(s) applied, {} glyph(s) and {} image(s) removed",
            page_index,
            marks.len(),
            removed_glyphs,
            removed_images
        );
        Ok(marks.len())
    }
}
