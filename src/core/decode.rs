//! Stream decoding: zlib inflate plus the PNG row predictor.
//!
//! Cross-reference streams and object streams are unreadable without
//! FlateDecode, so the core implements exactly that filter (and the PNG
//! "Up" predictor commonly applied to xref tables). Everything else is
//! reported as unsupported rather than silently passed through compressed.

use super::error::{PdfError, PdfResult};
use super::object::{Dict, Value};
use flate2::read::ZlibDecoder;
use std::io::Read;

/// Inflates RFC 1950/1951 zlib data.
pub fn inflate(data: &[u8]) -> PdfResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PdfError::corrupt(format!("zlib inflate failed: {}", e)))?;
    Ok(out)
}

/// Decodes a stream body according to its parameter dictionary.
///
/// `/Filter` absent means identity; `/FlateDecode` (directly or as a
/// single-element array) inflates; any other filter is unsupported. A PNG
/// predictor declared in `/DecodeParms` is reversed after inflation.
pub fn decode_stream(dict: &Dict, data: &[u8]) -> PdfResult<Vec<u8>> {
    let decoded = match filter_name(dict)? {
        None => data.to_vec(),
        Some(name) if name == b"FlateDecode" => inflate(data)?,
        Some(name) => {
            return Err(PdfError::UnsupportedFilter {
                name: String::from_utf8_lossy(name).into_owned(),
            });
        }
    };

    match dict.get(b"DecodeParms") {
        Some(Value::Dict(parms)) => reverse_predictor(parms, decoded),
        _ => Ok(decoded),
    }
}

fn filter_name(dict: &Dict) -> PdfResult<Option<&[u8]>> {
    match dict.get(b"Filter") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Name(name)) => Ok(Some(name.as_bytes())),
        Some(Value::Array(filters)) => match filters.len() {
            0 => Ok(None),
            1 => match &filters[0] {
                Value::Name(name) => Ok(Some(name.as_bytes())),
                other => Err(PdfError::corrupt(format!(
                    "malformed /Filter entry: {:?}",
                    other
                ))),
            },
            _ => Err(PdfError::UnsupportedFilter {
                name: "<filter chain>".to_string(),
            }),
        },
        Some(other) => Err(PdfError::corrupt(format!(
            "malformed /Filter entry: {:?}",
            other
        ))),
    }
}

/// Reverses the predictor declared in a `/DecodeParms` dictionary.
///
/// Predictor 1 (or absent) is the identity. Values of 10 and up select the
/// PNG family, where each row carries its own method tag; the core supports
/// tags 0 (none) and 2 (Up). Only the single-byte sample layout is handled:
/// `Colors` 1 and `BitsPerComponent` 8.
fn reverse_predictor(parms: &Dict, data: Vec<u8>) -> PdfResult<Vec<u8>> {
    let predictor = parms.get_int(b"Predictor").unwrap_or(1);
    if predictor == 1 {
        return Ok(data);
    }
    if predictor < 10 {
        return Err(PdfError::UnsupportedPredictor {
            code: predictor.clamp(0, 255) as u8,
        });
    }

    let colors = parms.get_int(b"Colors").unwrap_or(1);
    let bits = parms.get_int(b"BitsPerComponent").unwrap_or(8);
    if colors != 1 || bits != 8 {
        return Err(PdfError::corrupt(format!(
            "unsupported predictor layout: Colors {} BitsPerComponent {}",
            colors, bits
        )));
    }

    let columns = parms.get_int(b"Columns").unwrap_or(1);
    if columns < 1 {
        return Err(PdfError::corrupt(format!("invalid Columns {}", columns)));
    }

    png_unpredict(&data, columns as usize)
}

/// Undoes the PNG per-row predictor over rows of `columns + 1` bytes.
///
/// The leading byte of each row is the method tag: 0 leaves the row as-is,
/// 2 ("Up") adds the byte one row above in the same column, with a synthetic
/// all-zero row above the first.
pub fn png_unpredict(data: &[u8], columns: usize) -> PdfResult<Vec<u8>> {
    let row_len = columns + 1;
    if data.len() % row_len != 0 {
        return Err(PdfError::corrupt(format!(
            "predictor input of {} bytes is not a whole number of {}-byte rows",
            data.len(),
            row_len
        )));
    }

    let mut out = Vec::with_capacity(data.len() / row_len * columns);
    for row in data.chunks(row_len) {
        let base = out.len();
        match row[0] {
            0 => out.extend_from_slice(&row[1..]),
            2 => {
                for (column, &byte) in row[1..].iter().enumerate() {
                    let up = if base >= columns {
                        out[base - columns + column]
                    } else {
                        0
                    };
                    out.push(byte.wrapping_add(up));
                }
            }
            code => return Err(PdfError::UnsupportedPredictor { code }),
        }
    }
    Ok(out)
}
