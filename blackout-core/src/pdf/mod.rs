//! PDF backend built on `lopdf`.
//!
//! * `content`: decodes content streams, lifting inline images out first.
//! * `fonts`: glyph widths and Unicode decoding per font resource.
//! * `layout`: content-stream interpreter that positions every glyph and
//!   image placement on a page, descending into Form XObjects.
//! * `rewrite`: removes marked glyphs and images from a content stream and
//!   paints the black boxes.
//! * `backend`: [`LopdfDocument`], the [`crate::document::RedactableDocument`]
//!   implementation tying the above together.
//!
//! A content stream that cannot be decoded to its end is an error, never a
//! partial page. Annotation appearance streams are not laid out, so their
//! text is neither extracted nor redacted.
//!
//! License: MIT OR Apache-2.0

mod backend;
mod content;
mod fonts;
mod layout;
mod rewrite;

pub use backend::LopdfDocument;
pub(crate) use backend::write_atomic;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Follows one level of indirection.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Looks up `key` in `dict`, resolving a reference value.
pub(crate) fn dict_get<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().map(|obj| resolve(doc, obj))
}

pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

pub(crate) fn real(value: f32) -> Object {
    Object::Real(value.into())
}

/// Decoded stream data, or the raw bytes for unfiltered streams.
pub(crate) fn stream_bytes(stream: &Stream) -> Vec<u8> {
    stream.decompressed_content().unwrap_or_else(|_| stream.content.clone())
}

/// The `/Resources` dictionary of a page, inherited through `/Parent`.
pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    // Page trees deeper than this are malformed.
    for _ in 0..64 {
        if let Some(resources) = dict_get(doc, node, b"Resources") {
            return resources.as_dict().ok();
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_object(parent).ok()?.as_dict().ok()?;
    }
    None
}
