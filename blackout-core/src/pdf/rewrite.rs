//! Removes marked content from content streams and paints the boxes.

use std::collections::{BTreeMap, HashMap, HashSet};

use lopdf::content::Operation;
use lopdf::{Object, StringFormat};

use super::layout::{Glyph, ImageSource, PageLayout, StreamIndex};
use super::real;
use crate::geometry::Rect;

/// One rewritten content stream and what was taken out of it.
#[derive(Debug, Clone, Default)]
pub(crate) struct Rewrite {
    pub operations: Vec<Operation>,
    pub removed_glyphs: usize,
    /// Resource names of removed XObject placements (images and opaque forms).
    pub removed_xobjects: Vec<Vec<u8>>,
    pub removed_inline_images: usize,
}

impl Rewrite {
    pub(crate) fn changed(&self) -> bool {
        self.removed_glyphs > 0 || !self.removed_xobjects.is_empty() || self.removed_inline_images > 0
    }

    pub(crate) fn removed_images(&self) -> usize {
        self.removed_xobjects.len() + self.removed_inline_images
    }
}

/// Applies `marks` to one stream of `layout`.
///
/// A glyph is removed when its centre lies inside a mark; an image placement
/// is removed when it overlaps one. Every remaining glyph keeps its position.
pub(crate) fn redact_stream(layout: &PageLayout, stream: StreamIndex, marks: &[Rect]) -> Rewrite {
    let Some(content) = layout.streams.get(stream) else {
        return Rewrite::default();
    };
    let mut rewrite = Rewrite::default();

    // A form painted several times yields one glyph per placement for the
    // same string bytes; a hit in any placement removes the bytes.
    let mut positions: HashMap<usize, BTreeMap<(usize, usize), (&Glyph, bool)>> = HashMap::new();
    for glyph in layout.glyphs.iter().filter(|g| g.stream == stream) {
        let center = glyph.bbox.center();
        let hit = marks.iter().any(|m| m.contains_point(center));
        rewrite.removed_glyphs += usize::from(hit);
        let slot = positions
            .entry(glyph.op_index)
            .or_default()
            .entry((glyph.element, glyph.bytes.start))
            .or_insert((glyph, false));
        slot.1 |= hit;
    }
    let by_op: HashMap<usize, Vec<(&Glyph, bool)>> = positions
        .into_iter()
        .map(|(op, glyphs)| (op, glyphs.into_values().collect()))
        .collect();

    let mut skipped_ops = HashSet::new();
    for image in layout.images.iter().filter(|i| i.stream == stream) {
        if !marks.iter().any(|m| m.overlaps(&image.bbox)) {
            continue;
        }
        skipped_ops.insert(image.op_index);
        match &image.source {
            ImageSource::XObject(name) | ImageSource::Form(name) => {
                if !rewrite.removed_xobjects.contains(name) {
                    rewrite.removed_xobjects.push(name.clone());
                }
            }
            ImageSource::Inline => rewrite.removed_inline_images += 1,
        }
    }

    rewrite.operations.reserve(content.operations.len());
    for (i, op) in content.operations.iter().enumerate() {
        if skipped_ops.contains(&i) {
            continue;
        }
        match by_op.get(&i) {
            Some(glyphs) if glyphs.iter().any(|(_, hit)| *hit) => rewrite.operations.extend(rewrite_show(op, glyphs)),
            _ => rewrite.operations.push(op.clone()),
        }
    }
    rewrite
}

/// Wraps page `operations` in `q`/`Q` and fills every mark in black on top.
pub(crate) fn paint_marks(operations: Vec<Operation>, marks: &[Rect]) -> Vec<Operation> {
    let mut out = Vec::with_capacity(operations.len() + marks.len() + 6);
    out.push(Operation::new("q", vec![]));
    out.extend(operations);
    out.push(Operation::new("Q", vec![]));

    out.push(Operation::new("q", vec![]));
    out.push(Operation::new(
        "rg",
        vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)],
    ));
    for m in marks {
        out.push(Operation::new(
            "re",
            vec![real(m.x0), real(m.y0), real(m.width()), real(m.height())],
        ));
    }
    out.push(Operation::new("f", vec![]));
    out.push(Operation::new("Q", vec![]));
    out
}

/// Re-emits a show operator as a `TJ` array without the hit glyphs.
fn rewrite_show(op: &Operation, glyphs: &[(&Glyph, bool)]) -> Vec<Operation> {
    let mut prefix = Vec::new();
    let elements: Vec<(usize, &Object)> = match op.operator.as_str() {
        "TJ" => match op.operands.first() {
            Some(Object::Array(items)) => items.iter().enumerate().collect(),
            _ => return vec![op.clone()],
        },
        "Tj" => op.operands.first().map(|o| (0, o)).into_iter().collect(),
        "'" => {
            prefix.push(Operation::new("T*", vec![]));
            op.operands.first().map(|o| (0, o)).into_iter().collect()
        }
        "\"" => {
            let (Some(aw), Some(ac)) = (op.operands.first(), op.operands.get(1)) else {
                return vec![op.clone()];
            };
            prefix.push(Operation::new("Tw", vec![aw.clone()]));
            prefix.push(Operation::new("Tc", vec![ac.clone()]));
            prefix.push(Operation::new("T*", vec![]));
            op.operands.get(2).map(|o| (2, o)).into_iter().collect()
        }
        _ => return vec![op.clone()],
    };

    let mut array = Vec::new();
    let mut adjust = 0.0f32;
    for (slot, element) in elements {
        let Object::String(bytes, format) = element else {
            flush_adjust(&mut array, &mut adjust);
            array.push(element.clone());
            continue;
        };
        let mut run = Vec::new();
        let mut covered = 0;
        for (glyph, hit) in glyphs.iter().filter(|(g, _)| g.element == slot) {
            if *hit {
                flush_run(&mut array, &mut run, format);
                adjust += glyph.adjust;
            } else if let Some(chunk) = bytes.get(glyph.bytes.clone()) {
                flush_adjust(&mut array, &mut adjust);
                run.extend_from_slice(chunk);
            }
            covered = covered.max(glyph.bytes.end);
        }
        if let Some(rest) = bytes.get(covered..) {
            if !rest.is_empty() {
                flush_adjust(&mut array, &mut adjust);
                run.extend_from_slice(rest);
            }
        }
        flush_run(&mut array, &mut run, format);
    }
    flush_adjust(&mut array, &mut adjust);

    prefix.push(Operation::new("TJ", vec![Object::Array(array)]));
    prefix
}

fn flush_run(array: &mut Vec<Object>, run: &mut Vec<u8>, format: &StringFormat) {
    if !run.is_empty() {
        array.push(Object::String(std::mem::take(run), format.clone()));
    }
}

fn flush_adjust(array: &mut Vec<Object>, adjust: &mut f32) {
    if *adjust != 0.0 {
        array.push(real(*adjust));
        *adjust = 0.0;
    }
}
