//! Content-stream interpreter that positions glyphs and image placements.
//!
//! Glyph boxes follow the PDF text rendering matrix
//! `Trm = [Tfs*Th 0 0 Tfs 0 Trise] x Tm x CTM` and extend vertically from
//! the font descent to its ascent.
//!
//! Form XObjects are interpreted in place, so their text joins the page text
//! in painting order. Each distinct form painted from a stream gets its own
//! [`ContentStream`] entry; glyphs and placements record which entry they
//! belong to.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use lopdf::content::Operation;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::content::{decode_stream, inline_image_index, INLINE_IMAGE_OP};
use super::fonts::FontMetrics;
use super::{dict_get, number, page_resources, resolve, stream_bytes};
use crate::geometry::{Matrix, Rect};

/// Index into [`PageLayout::streams`]. The page's own content is 0.
pub(crate) type StreamIndex = usize;

/// Forms nested deeper than this are treated as opaque.
const MAX_FORM_DEPTH: usize = 12;

/// One shown character code.
#[derive(Debug, Clone)]
pub(crate) struct Glyph {
    pub text: String,
    pub bbox: Rect,
    /// Baseline origin in user space.
    pub origin: (f32, f32),
    /// Font size in user space.
    pub size: f32,
    pub stream: StreamIndex,
    /// Index of the show operator in its stream's operation list.
    pub op_index: usize,
    /// Position of the string within the operator: the array slot for `TJ`,
    /// the operand slot otherwise.
    pub element: usize,
    /// Byte range of the code inside that string.
    pub bytes: Range<usize>,
    /// `TJ` displacement that advances exactly as far as this glyph does.
    pub adjust: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ImageSource {
    /// An image XObject, by resource name.
    XObject(Vec<u8>),
    /// A `BI ... EI` image written into the content stream.
    Inline,
    /// A form that could not be entered, painted as one opaque block.
    Form(Vec<u8>),
}

#[derive(Debug, Clone)]
pub(crate) struct ImagePlacement {
    pub stream: StreamIndex,
    pub op_index: usize,
    pub source: ImageSource,
    pub bbox: Rect,
}

/// A Form XObject as painted from its parent stream.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FormUse {
    pub parent: StreamIndex,
    pub name: Vec<u8>,
    pub id: ObjectId,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ContentStream {
    pub operations: Vec<Operation>,
    pub inline_images: Vec<Vec<u8>>,
    /// `None` for the page content.
    pub form: Option<FormUse>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PageLayout {
    pub streams: Vec<ContentStream>,
    pub glyphs: Vec<Glyph>,
    pub images: Vec<ImagePlacement>,
}

/// Page text with, for every byte, the glyph it came from. Inserted
/// separators belong to no glyph.
#[derive(Debug, Clone, Default)]
pub(crate) struct TextIndex {
    pub text: String,
    owners: Vec<Option<usize>>,
}

impl PageLayout {
    pub(crate) fn text_index(&self) -> TextIndex {
        let mut index = TextIndex::default();
        let mut prev: Option<&Glyph> = None;
        for (i, glyph) in self.glyphs.iter().enumerate() {
            if glyph.text.is_empty() {
                continue;
            }
            if let Some(sep) = prev.and_then(|p| separator(p, glyph)) {
                index.text.push(sep);
                index.owners.push(None);
            }
            for c in glyph.text.chars() {
                index.text.push(c);
                index.owners.extend(std::iter::repeat(Some(i)).take(c.len_utf8()));
            }
            prev = Some(glyph);
        }
        index
    }
}

fn separator(prev: &Glyph, next: &Glyph) -> Option<char> {
    let size = prev.size.min(next.size);
    if (next.origin.1 - prev.origin.1).abs() > size * 0.5 {
        return Some('\n');
    }
    if prev.text.ends_with(char::is_whitespace) || next.text.starts_with(char::is_whitespace) {
        return None;
    }
    let gap = next.bbox.x0 - prev.bbox.x1;
    if gap > size * 0.25 || next.bbox.x1 <= prev.bbox.x0 {
        Some(' ')
    } else {
        None
    }
}

impl TextIndex {
    /// Rectangles covering every occurrence of `literal`, one per line.
    pub(crate) fn find(&self, literal: &str, glyphs: &[Glyph]) -> Vec<Rect> {
        let mut rects = Vec::new();
        if literal.is_empty() {
            return rects;
        }
        for (start, matched) in self.text.match_indices(literal) {
            let mut line: Option<Rect> = None;
            for (offset, c) in matched.char_indices() {
                if c == '\n' {
                    rects.extend(line.take());
                    continue;
                }
                let owner = self.owners.get(start + offset).copied().flatten();
                if let Some(glyph) = owner.and_then(|g| glyphs.get(g)) {
                    line = Some(line.map_or(glyph.bbox, |r| r.union(&glyph.bbox)));
                }
            }
            rects.extend(line);
        }
        rects
    }
}

struct Resources {
    fonts: HashMap<Vec<u8>, FontMetrics>,
    fallback: FontMetrics,
    images: HashSet<Vec<u8>>,
    forms: HashMap<Vec<u8>, ObjectId>,
}

impl Resources {
    fn load(doc: &Document, dict: Option<&Dictionary>) -> Self {
        let mut resources = Resources {
            fonts: HashMap::new(),
            fallback: FontMetrics::default(),
            images: HashSet::new(),
            forms: HashMap::new(),
        };
        let Some(dict) = dict else {
            return resources;
        };
        if let Some(fonts) = dict_get(doc, dict, b"Font").and_then(|o| o.as_dict().ok()) {
            for (name, font) in fonts.iter() {
                if let Ok(font) = resolve(doc, font).as_dict() {
                    resources.fonts.insert(name.clone(), FontMetrics::from_dict(doc, font));
                }
            }
        }
        if let Some(xobjects) = dict_get(doc, dict, b"XObject").and_then(|o| o.as_dict().ok()) {
            for (name, xobject) in xobjects.iter() {
                let Object::Stream(stream) = resolve(doc, xobject) else {
                    continue;
                };
                match stream.dict.get(b"Subtype").and_then(Object::as_name).ok() {
                    Some(b"Image") => {
                        resources.images.insert(name.clone());
                    }
                    Some(b"Form") => {
                        if let Object::Reference(id) = xobject {
                            resources.forms.insert(name.clone(), *id);
                        }
                    }
                    _ => {}
                }
            }
        }
        resources
    }

    fn font(&self, name: Option<&[u8]>) -> &FontMetrics {
        name.and_then(|n| self.fonts.get(n)).unwrap_or(&self.fallback)
    }
}

#[derive(Debug, Clone)]
struct TextState {
    font: Option<Vec<u8>>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

struct Builder<'d> {
    doc: &'d Document,
    layout: PageLayout,
    /// Forms currently being interpreted, outermost first.
    active: Vec<ObjectId>,
}

impl Builder<'_> {
    /// Stream entry for form `name` painted from `parent`, decoding it on
    /// first use.
    fn form_stream(&mut self, parent: StreamIndex, name: &[u8], id: ObjectId, form: &Stream) -> Result<StreamIndex, String> {
        let existing = self.layout.streams.iter().position(|s| {
            s.form
                .as_ref()
                .is_some_and(|f| f.parent == parent && f.name == name && f.id == id)
        });
        if let Some(index) = existing {
            return Ok(index);
        }
        let decoded = decode_stream(&stream_bytes(form)).map_err(|e| {
            format!("form {}: {}", String::from_utf8_lossy(name), e)
        })?;
        self.layout.streams.push(ContentStream {
            operations: decoded.operations,
            inline_images: decoded.inline_images,
            form: Some(FormUse {
                parent,
                name: name.to_vec(),
                id,
            }),
        });
        Ok(self.layout.streams.len() - 1)
    }
}

struct Interpreter<'a, 'd> {
    builder: &'a mut Builder<'d>,
    resources: &'a Resources,
    stream: StreamIndex,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    tm: Matrix,
    tlm: Matrix,
}

/// Lays out the page whose raw (decompressed) content is `content`.
pub(crate) fn layout_page(doc: &Document, page_id: ObjectId, content: &[u8]) -> Result<PageLayout, String> {
    let decoded = decode_stream(content)?;
    let mut builder = Builder {
        doc,
        layout: PageLayout {
            streams: vec![ContentStream {
                operations: decoded.operations,
                inline_images: decoded.inline_images,
                form: None,
            }],
            ..PageLayout::default()
        },
        active: Vec::new(),
    };
    let resources = Resources::load(doc, page_resources(doc, page_id));
    run_stream(&mut builder, 0, &resources, GraphicsState::default())?;
    Ok(builder.layout)
}

fn run_stream(builder: &mut Builder<'_>, stream: StreamIndex, resources: &Resources, state: GraphicsState) -> Result<(), String> {
    let operations = match builder.layout.streams.get_mut(stream) {
        Some(entry) => std::mem::take(&mut entry.operations),
        None => return Ok(()),
    };
    let mut interpreter = Interpreter {
        builder: &mut *builder,
        resources,
        stream,
        state,
        stack: Vec::new(),
        tm: Matrix::IDENTITY,
        tlm: Matrix::IDENTITY,
    };
    let result = operations
        .iter()
        .enumerate()
        .try_for_each(|(i, op)| interpreter.step(i, op));
    if let Some(entry) = builder.layout.streams.get_mut(stream) {
        entry.operations = operations;
    }
    result
}

fn matrix_from_array(array: &[Object]) -> Option<Matrix> {
    let v: Vec<f32> = array.iter().filter_map(number).collect();
    match v.as_slice() {
        [a, b, c, d, e, f] => Some(Matrix::new(*a, *b, *c, *d, *e, *f)),
        _ => None,
    }
}

fn form_bbox(doc: &Document, form: &Stream) -> Option<Rect> {
    let array = dict_get(doc, &form.dict, b"BBox")?.as_array().ok()?;
    let v: Vec<f32> = array.iter().filter_map(number).collect();
    match v.as_slice() {
        [x0, y0, x1, y1] => Some(Rect::new(*x0, *y0, *x1, *y1)),
        _ => None,
    }
}

fn operand(op: &Operation, index: usize) -> Option<f32> {
    op.operands.get(index).and_then(number)
}

fn matrix_operands(op: &Operation) -> Option<Matrix> {
    matrix_from_array(&op.operands)
}

impl Interpreter<'_, '_> {
    fn step(&mut self, i: usize, op: &Operation) -> Result<(), String> {
        match op.operator.as_str() {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.stack.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operands(op) {
                    self.state.ctm = m.then(&self.state.ctm);
                }
            }
            "BT" => {
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "Tf" => {
                self.state.text.font = op.operands.first().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec);
                self.state.text.size = operand(op, 1).unwrap_or(0.0);
            }
            "Tc" => self.state.text.char_spacing = operand(op, 0).unwrap_or(0.0),
            "Tw" => self.state.text.word_spacing = operand(op, 0).unwrap_or(0.0),
            "Tz" => self.state.text.scale = operand(op, 0).unwrap_or(100.0) / 100.0,
            "TL" => self.state.text.leading = operand(op, 0).unwrap_or(0.0),
            "Ts" => self.state.text.rise = operand(op, 0).unwrap_or(0.0),
            "Td" => self.move_line(operand(op, 0).unwrap_or(0.0), operand(op, 1).unwrap_or(0.0)),
            "TD" => {
                let ty = operand(op, 1).unwrap_or(0.0);
                self.state.text.leading = -ty;
                self.move_line(operand(op, 0).unwrap_or(0.0), ty);
            }
            "Tm" => {
                if let Some(m) = matrix_operands(op) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => self.show_operand(i, op, 0),
            "'" => {
                self.next_line();
                self.show_operand(i, op, 0);
            }
            "\"" => {
                self.state.text.word_spacing = operand(op, 0).unwrap_or(0.0);
                self.state.text.char_spacing = operand(op, 1).unwrap_or(0.0);
                self.next_line();
                self.show_operand(i, op, 2);
            }
            "TJ" => {
                let Some(Object::Array(items)) = op.operands.first() else {
                    return Ok(());
                };
                for (k, item) in items.iter().enumerate() {
                    match item {
                        Object::String(bytes, _) => self.show(i, k, bytes),
                        other => {
                            if let Some(n) = number(other) {
                                let text = &self.state.text;
                                let tx = -n / 1000.0 * text.size * text.scale;
                                self.tm = Matrix::translate(tx, 0.0).then(&self.tm);
                            }
                        }
                    }
                }
            }
            "Do" => {
                let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) else {
                    return Ok(());
                };
                if self.resources.images.contains(name) {
                    self.place_image(i, ImageSource::XObject(name.to_vec()));
                } else if let Some(&id) = self.resources.forms.get(name) {
                    self.paint_form(i, name, id)?;
                }
            }
            INLINE_IMAGE_OP if inline_image_index(op).is_some() => self.place_image(i, ImageSource::Inline),
            _ => {}
        }
        Ok(())
    }

    /// Images fill the unit square of the current CTM.
    fn place_image(&mut self, op_index: usize, source: ImageSource) {
        let bbox = self.state.ctm.transform_rect(&Rect::new(0.0, 0.0, 1.0, 1.0));
        self.builder.layout.images.push(ImagePlacement {
            stream: self.stream,
            op_index,
            source,
            bbox,
        });
    }

    fn paint_form(&mut self, op_index: usize, name: &[u8], id: ObjectId) -> Result<(), String> {
        let doc = self.builder.doc;
        let Ok(form) = doc.get_object(id).and_then(Object::as_stream) else {
            return Ok(());
        };
        let matrix = dict_get(doc, &form.dict, b"Matrix")
            .and_then(|o| o.as_array().ok())
            .and_then(|a| matrix_from_array(a))
            .unwrap_or(Matrix::IDENTITY);
        let ctm = matrix.then(&self.state.ctm);

        if self.builder.active.contains(&id) || self.builder.active.len() >= MAX_FORM_DEPTH {
            let bbox = form_bbox(doc, form).unwrap_or(Rect::new(0.0, 0.0, 1.0, 1.0));
            self.builder.layout.images.push(ImagePlacement {
                stream: self.stream,
                op_index,
                source: ImageSource::Form(name.to_vec()),
                bbox: ctm.transform_rect(&bbox),
            });
            return Ok(());
        }

        let index = self.builder.form_stream(self.stream, name, id, form)?;
        let own;
        let resources = match dict_get(doc, &form.dict, b"Resources").and_then(|o| o.as_dict().ok()) {
            Some(dict) => {
                own = Resources::load(doc, Some(dict));
                &own
            }
            None => self.resources,
        };
        let state = GraphicsState {
            ctm,
            text: self.state.text.clone(),
        };
        self.builder.active.push(id);
        let result = run_stream(self.builder, index, resources, state);
        self.builder.active.pop();
        result
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translate(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        let leading = self.state.text.leading;
        self.move_line(0.0, -leading);
    }

    fn show_operand(&mut self, i: usize, op: &Operation, slot: usize) {
        if let Some(Object::String(bytes, _)) = op.operands.get(slot) {
            self.show(i, slot, bytes);
        }
    }

    fn show(&mut self, op_index: usize, element: usize, bytes: &[u8]) {
        let resources = self.resources;
        let font = resources.font(self.state.text.font.as_deref());
        let text = self.state.text.clone();

        for (code, range) in font.codes(bytes) {
            let w0 = font.width(code) / 1000.0;
            let trm = Matrix::new(text.size * text.scale, 0.0, 0.0, text.size, 0.0, text.rise)
                .then(&self.tm)
                .then(&self.state.ctm);
            let glyph_space = Rect::new(0.0, font.descent / 1000.0, w0, font.ascent / 1000.0);

            let word_spacing = if !font.is_two_byte() && code == 32 {
                text.word_spacing
            } else {
                0.0
            };
            let advance = w0 * text.size + text.char_spacing + word_spacing;
            let adjust = if text.size.abs() > f32::EPSILON {
                -advance * 1000.0 / text.size
            } else {
                0.0
            };

            self.builder.layout.glyphs.push(Glyph {
                text: font.decode(code),
                bbox: trm.transform_rect(&glyph_space),
                origin: trm.apply(0.0, 0.0),
                size: (trm.c * trm.c + trm.d * trm.d).sqrt(),
                stream: self.stream,
                op_index,
                element,
                bytes: range,
                adjust,
            });
            self.tm = Matrix::translate(advance * text.scale, 0.0).then(&self.tm);
        }
    }
}
