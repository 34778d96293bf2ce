//! Decoding and re-encoding of raw content streams.
//!
//! `lopdf` stops at the first inline image (`BI ... ID ... EI`) and hands
//! back the operators parsed so far. Before decoding, every inline image is
//! cut out of the stream and replaced by an [`INLINE_IMAGE_OP`] operator
//! whose only operand indexes the saved segment. Encoding splices the saved
//! segments back in verbatim.
//!
//! The same pass counts the operators it sees, so any other short decode is
//! reported instead of silently dropping the rest of the page.

use lopdf::content::{Content, Operation};
use lopdf::Object;

/// Placeholder operator standing in for one inline image.
pub(crate) const INLINE_IMAGE_OP: &str = "BlackoutInlineImage";

/// Operations of one content stream plus its lifted inline images.
#[derive(Debug, Clone, Default)]
pub(crate) struct DecodedStream {
    pub operations: Vec<Operation>,
    /// Raw `BI ... EI` segments, indexed by the placeholder operand.
    pub inline_images: Vec<Vec<u8>>,
}

pub(crate) fn decode_stream(data: &[u8]) -> Result<DecodedStream, String> {
    let lifted = lift_inline_images(data)?;
    let operations = Content::decode(&lifted.bytes)
        .map_err(|e| e.to_string())?
        .operations;
    if operations.len() < lifted.operators {
        return Err(format!(
            "content stream decoded to {} of {} operators",
            operations.len(),
            lifted.operators
        ));
    }
    Ok(DecodedStream {
        operations,
        inline_images: lifted.inline_images,
    })
}

/// Encodes `operations`, writing each inline image placeholder as the
/// original segment.
pub(crate) fn encode_stream(operations: Vec<Operation>, inline_images: &[Vec<u8>]) -> Result<Vec<u8>, lopdf::Error> {
    let mut out = Vec::new();
    let mut chunk = Vec::new();
    for op in operations {
        match inline_image_index(&op).and_then(|n| inline_images.get(n)) {
            Some(segment) => {
                flush_chunk(&mut out, &mut chunk)?;
                out.extend_from_slice(segment);
                out.push(b'\n');
            }
            None => chunk.push(op),
        }
    }
    flush_chunk(&mut out, &mut chunk)?;
    Ok(out)
}

/// Segment index carried by an inline image placeholder.
pub(crate) fn inline_image_index(op: &Operation) -> Option<usize> {
    if op.operator != INLINE_IMAGE_OP {
        return None;
    }
    match op.operands.first() {
        Some(Object::Integer(n)) => usize::try_from(*n).ok(),
        _ => None,
    }
}

fn flush_chunk(out: &mut Vec<u8>, chunk: &mut Vec<Operation>) -> Result<(), lopdf::Error> {
    if chunk.is_empty() {
        return Ok(());
    }
    let encoded = Content {
        operations: std::mem::take(chunk),
    }
    .encode()?;
    out.extend_from_slice(&encoded);
    out.push(b'\n');
    Ok(())
}

struct Lifted {
    bytes: Vec<u8>,
    inline_images: Vec<Vec<u8>>,
    operators: usize,
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x0c' | b'\0')
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn token_end(data: &[u8], start: usize) -> usize {
    data[start..]
        .iter()
        .position(|&b| is_whitespace(b) || is_delimiter(b))
        .map_or(data.len(), |n| start + n)
}

fn is_operator(token: &[u8]) -> bool {
    let starts_like_operator = matches!(token.first(), Some(b) if b.is_ascii_alphabetic() || *b == b'\'' || *b == b'"');
    starts_like_operator && !matches!(token, b"true" | b"false" | b"null")
}

/// End of a literal string starting at `start` (which holds `(`).
fn literal_string_end(data: &[u8], start: usize) -> Result<usize, String> {
    let mut depth = 0usize;
    let mut i = start;
    while i < data.len() {
        match data[i] {
            b'\\' => i += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(format!("unterminated string at byte {}", start))
}

fn hex_string_end(data: &[u8], start: usize) -> Result<usize, String> {
    data[start..]
        .iter()
        .position(|&b| b == b'>')
        .map(|n| start + n + 1)
        .ok_or_else(|| format!("unterminated hex string at byte {}", start))
}

/// End of the `BI` segment whose dictionary starts at `from`: just past the
/// closing `EI`.
fn inline_image_end(data: &[u8], from: usize) -> Result<usize, String> {
    let mut i = from;
    let data_start = loop {
        let Some(&b) = data.get(i) else {
            return Err(format!("inline image at byte {} has no ID", from));
        };
        match b {
            _ if is_whitespace(b) => i += 1,
            b'(' => i = literal_string_end(data, i)?,
            b'<' if data.get(i + 1) != Some(&b'<') => i = hex_string_end(data, i)?,
            b'/' => i = token_end(data, i + 1),
            _ if is_delimiter(b) => i += 1,
            _ => {
                let end = token_end(data, i);
                if &data[i..end] == b"ID" {
                    // One whitespace byte separates ID from the image data.
                    break end + 1;
                }
                i = end;
            }
        }
    };
    let mut k = data_start.min(data.len());
    while k + 1 < data.len() {
        let after = data.get(k + 2).copied();
        if data[k] == b'E'
            && data[k + 1] == b'I'
            && k > 0
            && is_whitespace(data[k - 1])
            && after.map_or(true, |b| is_whitespace(b) || is_delimiter(b))
        {
            return Ok(k + 2);
        }
        k += 1;
    }
    Err(format!("inline image at byte {} has no EI", from))
}

fn lift_inline_images(data: &[u8]) -> Result<Lifted, String> {
    let mut lifted = Lifted {
        bytes: Vec::with_capacity(data.len()),
        inline_images: Vec::new(),
        operators: 0,
    };
    // Array and dictionary nesting; operators only occur at depth zero.
    let mut depth = 0usize;
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        let end = match b {
            _ if is_whitespace(b) => i + 1,
            b'%' => {
                let end = data[i..]
                    .iter()
                    .position(|&c| c == b'\r' || c == b'\n')
                    .map_or(data.len(), |n| i + n);
                lifted.bytes.push(b' ');
                i = end;
                continue;
            }
            b'(' => literal_string_end(data, i)?,
            b'<' if data.get(i + 1) == Some(&b'<') => {
                depth += 1;
                i + 2
            }
            b'>' if data.get(i + 1) == Some(&b'>') => {
                depth = depth.saturating_sub(1);
                i + 2
            }
            b'<' => hex_string_end(data, i)?,
            b'[' => {
                depth += 1;
                i + 1
            }
            b']' => {
                depth = depth.saturating_sub(1);
                i + 1
            }
            b'/' => token_end(data, i + 1),
            _ if is_delimiter(b) => i + 1,
            _ => {
                let end = token_end(data, i);
                let token = &data[i..end];
                if depth == 0 && token == b"BI" {
                    let segment_end = inline_image_end(data, end)?;
                    let index = lifted.inline_images.len();
                    lifted.inline_images.push(data[i..segment_end].to_vec());
                    lifted
                        .bytes
                        .extend_from_slice(format!(" {} {} ", index, INLINE_IMAGE_OP).as_bytes());
                    lifted.operators += 1;
                    i = segment_end;
                    continue;
                }
                if depth == 0 && is_operator(token) {
                    lifted.operators += 1;
                }
                end
            }
        };
        lifted.bytes.extend_from_slice(&data[i..end]);
        i = end;
    }
    Ok(lifted)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WITH_INLINE_IMAGE: &[u8] = b"q 10 0 0 10 300 300 cm BI /W 2 /H 1 /CS /G /BPC 8 ID \x80\x29 EI Q \
BT /F1 12 Tf 72 720 Td (mail jane@example.com) Tj ET";

    #[test]
    fn test_inline_image_does_not_truncate_decoding() {
        let decoded = decode_stream(WITH_INLINE_IMAGE).unwrap();
        let names: Vec<&str> = decoded.operations.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(
            names,
            vec!["q", "cm", INLINE_IMAGE_OP, "Q", "BT", "Tf", "Td", "Tj", "ET"]
        );
        assert_eq!(decoded.inline_images.len(), 1);
        assert!(decoded.inline_images[0].starts_with(b"BI /W 2"));
        assert!(decoded.inline_images[0].ends_with(b"\x80\x29 EI"));
    }

    #[test]
    fn test_encoding_restores_inline_image_bytes() {
        let decoded = decode_stream(WITH_INLINE_IMAGE).unwrap();
        let encoded = encode_stream(decoded.operations, &decoded.inline_images).unwrap();
        assert!(encoded
            .windows(decoded.inline_images[0].len())
            .any(|w| w == decoded.inline_images[0].as_slice()));
        assert!(!encoded.windows(INLINE_IMAGE_OP.len()).any(|w| w == INLINE_IMAGE_OP.as_bytes()));

        let again = decode_stream(&encoded).unwrap();
        assert_eq!(again.operations.len(), 9);
    }

    #[test]
    fn test_bi_inside_strings_is_text() {
        let decoded = decode_stream(b"BT /F1 12 Tf (BI ID EI) Tj [(BI) 5 (x)] TJ ET").unwrap();
        assert!(decoded.inline_images.is_empty());
        assert_eq!(decoded.operations.len(), 5);
    }

    #[test]
    fn test_unterminated_inline_image_is_an_error() {
        let err = decode_stream(b"BT (a) Tj ET BI /W 1 /H 1 ID \x00\x01").unwrap_err();
        assert!(err.contains("no EI"), "{err}");
    }

    #[test]
    fn test_comments_are_skipped() {
        let decoded = decode_stream(b"% leading comment BT\nBT /F1 12 Tf (x) Tj ET % trailing").unwrap();
        assert_eq!(decoded.operations.len(), 4);
    }
}
