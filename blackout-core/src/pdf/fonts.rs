//! Font metrics and character decoding for text layout.
//!
//! Only what is needed to place glyphs is read: code width (simple fonts use
//! one byte per code, Type0 fonts two), advance widths, ascent/descent, and
//! the optional `/ToUnicode` CMap. Standard-14 fonts without `/Widths` fall
//! back to built-in Helvetica or Courier metrics.

use std::collections::HashMap;
use std::ops::Range;

use lopdf::{Dictionary, Document, Object};

use super::{dict_get, number, resolve, stream_bytes};

const DEFAULT_ASCENT: f32 = 750.0;
const DEFAULT_DESCENT: f32 = -250.0;

/// Helvetica advance widths for codes 32..=126.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallback {
    Helvetica,
    Monospace,
}

/// Metrics of one font resource, in thousandths of an em.
#[derive(Debug, Clone)]
pub(crate) struct FontMetrics {
    two_byte: bool,
    first_char: u32,
    widths: Vec<f32>,
    cid_widths: HashMap<u32, f32>,
    default_width: Option<f32>,
    fallback: Fallback,
    pub(crate) ascent: f32,
    pub(crate) descent: f32,
    to_unicode: HashMap<u32, String>,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            two_byte: false,
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            default_width: None,
            fallback: Fallback::Helvetica,
            ascent: DEFAULT_ASCENT,
            descent: DEFAULT_DESCENT,
            to_unicode: HashMap::new(),
        }
    }
}

impl FontMetrics {
    /// Reads the metrics of a font dictionary.
    pub(crate) fn from_dict(doc: &Document, font: &Dictionary) -> Self {
        let mut metrics = FontMetrics::default();

        let subtype = dict_get(doc, font, b"Subtype").and_then(|o| o.as_name().ok());
        let base_font = dict_get(doc, font, b"BaseFont")
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .unwrap_or_default();
        if base_font.contains("Courier") {
            metrics.fallback = Fallback::Monospace;
        }

        let mut descriptor = dict_get(doc, font, b"FontDescriptor").and_then(|o| o.as_dict().ok());

        if subtype == Some(b"Type0".as_slice()) {
            metrics.two_byte = true;
            metrics.default_width = Some(1000.0);
            let descendant = dict_get(doc, font, b"DescendantFonts")
                .and_then(|o| o.as_array().ok())
                .and_then(|arr| arr.first())
                .map(|o| resolve(doc, o))
                .and_then(|o| o.as_dict().ok());
            if let Some(cid_font) = descendant {
                if let Some(dw) = dict_get(doc, cid_font, b"DW").and_then(number) {
                    metrics.default_width = Some(dw);
                }
                if let Some(w) = dict_get(doc, cid_font, b"W").and_then(|o| o.as_array().ok()) {
                    metrics.cid_widths = parse_cid_widths(doc, w);
                }
                descriptor = dict_get(doc, cid_font, b"FontDescriptor").and_then(|o| o.as_dict().ok());
            }
        } else {
            metrics.first_char = dict_get(doc, font, b"FirstChar")
                .and_then(number)
                .map(|n| n.max(0.0) as u32)
                .unwrap_or(0);
            if let Some(widths) = dict_get(doc, font, b"Widths").and_then(|o| o.as_array().ok()) {
                metrics.widths = widths
                    .iter()
                    .map(|w| number(resolve(doc, w)).unwrap_or(0.0))
                    .collect();
            }
        }

        if let Some(descriptor) = descriptor {
            let ascent = dict_get(doc, descriptor, b"Ascent").and_then(number);
            let descent = dict_get(doc, descriptor, b"Descent").and_then(number);
            if let (Some(a), Some(d)) = (ascent, descent) {
                if a > d {
                    metrics.ascent = a;
                    metrics.descent = d;
                }
            }
            if !metrics.two_byte {
                metrics.default_width = dict_get(doc, descriptor, b"MissingWidth").and_then(number).filter(|w| *w > 0.0);
            }
        }

        if let Some(Object::Stream(stream)) = dict_get(doc, font, b"ToUnicode") {
            metrics.to_unicode = parse_to_unicode(&stream_bytes(stream));
        }

        metrics
    }

    pub(crate) fn is_two_byte(&self) -> bool {
        self.two_byte
    }

    /// Splits a show-string into character codes and their byte ranges.
    pub(crate) fn codes(&self, bytes: &[u8]) -> Vec<(u32, Range<usize>)> {
        if self.two_byte {
            bytes
                .chunks(2)
                .enumerate()
                .map(|(i, chunk)| {
                    let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
                    (code, i * 2..i * 2 + chunk.len())
                })
                .collect()
        } else {
            bytes.iter().enumerate().map(|(i, b)| (u32::from(*b), i..i + 1)).collect()
        }
    }

    /// Advance width of a code in thousandths of an em.
    pub(crate) fn width(&self, code: u32) -> f32 {
        if self.two_byte {
            return self
                .cid_widths
                .get(&code)
                .copied()
                .or(self.default_width)
                .unwrap_or(1000.0);
        }
        if let Some(index) = code.checked_sub(self.first_char) {
            if let Some(w) = self.widths.get(index as usize) {
                return *w;
            }
        }
        if let Some(w) = self.default_width {
            return w;
        }
        match self.fallback {
            Fallback::Monospace => 600.0,
            Fallback::Helvetica => match code {
                32..=126 => f32::from(HELVETICA_WIDTHS[(code - 32) as usize]),
                _ => 556.0,
            },
        }
    }

    /// Unicode text of a code.
    pub(crate) fn decode(&self, code: u32) -> String {
        if let Some(s) = self.to_unicode.get(&code) {
            return s.clone();
        }
        if self.two_byte {
            return char::from_u32(code).map(String::from).unwrap_or_else(|| '\u{FFFD}'.to_string());
        }
        match code {
            // cp1252 punctuation commonly produced by office suites
            0x91 | 0x92 => "'".to_string(),
            0x93 | 0x94 => "\"".to_string(),
            0x96 | 0x97 => "-".to_string(),
            _ => char::from_u32(code).map(String::from).unwrap_or_default(),
        }
    }
}

fn parse_cid_widths(doc: &Document, w: &[Object]) -> HashMap<u32, f32> {
    let mut widths = HashMap::new();
    let mut items = w.iter().map(|o| resolve(doc, o));
    while let Some(first) = items.next() {
        let Some(start) = number(first) else { continue };
        let start = start.max(0.0) as u32;
        match items.next() {
            Some(Object::Array(list)) => {
                for (offset, width) in list.iter().enumerate() {
                    if let Some(width) = number(resolve(doc, width)) {
                        widths.insert(start.saturating_add(offset as u32), width);
                    }
                }
            }
            Some(end) => {
                let (Some(end), Some(width)) = (number(end), items.next().and_then(number)) else {
                    break;
                };
                let end = (end.max(0.0) as u32).min(start.saturating_add(0xFFFF));
                for code in start..=end {
                    widths.insert(code, width);
                }
            }
            None => break,
        }
    }
    widths
}

#[derive(Debug, Clone, PartialEq)]
enum CMapToken {
    Hex(Vec<u8>),
    Open,
    Close,
    Word(String),
}

fn tokenize_cmap(data: &[u8]) -> Vec<CMapToken> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        match b {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if data.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                let start = i + 1;
                let end = data[start..].iter().position(|c| *c == b'>').map_or(data.len(), |p| start + p);
                let digits: Vec<u8> = data[start..end].iter().copied().filter(u8::is_ascii_hexdigit).collect();
                tokens.push(CMapToken::Hex(hex_bytes(&digits)));
                i = end + 1;
            }
            b'[' => {
                tokens.push(CMapToken::Open);
                i += 1;
            }
            b']' => {
                tokens.push(CMapToken::Close);
                i += 1;
            }
            b'(' => {
                // Literal strings never carry mappings we use; skip balanced.
                let mut depth = 0usize;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            _ if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < data.len() && !data[i].is_ascii_whitespace() && !b"<>[]()%".contains(&data[i]) {
                    i += 1;
                }
                if i == start {
                    i += 1;
                } else {
                    tokens.push(CMapToken::Word(String::from_utf8_lossy(&data[start..i]).to_string()));
                }
            }
        }
    }
    tokens
}

fn hex_bytes(digits: &[u8]) -> Vec<u8> {
    let value = |c: u8| -> u8 {
        match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            _ => c - b'A' + 10,
        }
    };
    digits
        .chunks(2)
        .map(|pair| {
            let hi = value(pair[0]);
            let lo = pair.get(1).map_or(0, |c| value(*c));
            (hi << 4) | lo
        })
        .collect()
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().take(4).fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

fn utf16be(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|c| (u16::from(c[0]) << 8) | u16::from(c.get(1).copied().unwrap_or(0)))
        .collect()
}

/// Parses the `bfchar` and `bfrange` sections of a ToUnicode CMap.
pub(crate) fn parse_to_unicode(data: &[u8]) -> HashMap<u32, String> {
    let tokens = tokenize_cmap(data);
    let mut map = HashMap::new();
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            CMapToken::Word(w) if w == "beginbfchar" => {
                i += 1;
                while i + 1 < tokens.len() {
                    match (&tokens[i], &tokens[i + 1]) {
                        (CMapToken::Hex(src), CMapToken::Hex(dst)) => {
                            map.insert(code_of(src), String::from_utf16_lossy(&utf16be(dst)));
                            i += 2;
                        }
                        _ => break,
                    }
                }
            }
            CMapToken::Word(w) if w == "beginbfrange" => {
                i += 1;
                while i + 2 < tokens.len() {
                    let (CMapToken::Hex(lo), CMapToken::Hex(hi)) = (&tokens[i], &tokens[i + 1]) else {
                        break;
                    };
                    let (lo, hi) = (code_of(lo), code_of(hi));
                    let hi = hi.min(lo.saturating_add(0xFFFF));
                    match &tokens[i + 2] {
                        CMapToken::Hex(dst) => {
                            let base = utf16be(dst);
                            for (offset, code) in (lo..=hi).enumerate() {
                                let mut units = base.clone();
                                if let Some(last) = units.last_mut() {
                                    *last = last.wrapping_add(offset as u16);
                                }
                                map.insert(code, String::from_utf16_lossy(&units));
                            }
                            i += 3;
                        }
                        CMapToken::Open => {
                            i += 3;
                            let mut code = lo;
                            while let Some(CMapToken::Hex(dst)) = tokens.get(i) {
                                if code <= hi {
                                    map.insert(code, String::from_utf16_lossy(&utf16be(dst)));
                                }
                                code += 1;
                                i += 1;
                            }
                            if tokens.get(i) == Some(&CMapToken::Close) {
                                i += 1;
                            }
                        }
                        _ => break,
                    }
                }
            }
            _ => i += 1,
        }
    }
    map
}
