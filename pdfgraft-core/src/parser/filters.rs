//! PDF Stream Filters
//!
//! Decoding of the filters the engine itself needs to read: object streams,
//! cross-reference streams and page content. Copied stream payloads are never
//! decoded.

use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// PDF filters known by name
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Filter {
    ASCIIHexDecode,
    ASCII85Decode,
    LZWDecode,
    FlateDecode,
    RunLengthDecode,
    CCITTFaxDecode,
    JBIG2Decode,
    DCTDecode,
    JPXDecode,
    Crypt,
}

impl Filter {
    /// Parse filter from name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ASCIIHexDecode" | "AHx" => Some(Filter::ASCIIHexDecode),
            "ASCII85Decode" | "A85" => Some(Filter::ASCII85Decode),
            "LZWDecode" | "LZW" => Some(Filter::LZWDecode),
            "FlateDecode" | "Fl" => Some(Filter::FlateDecode),
            "RunLengthDecode" | "RL" => Some(Filter::RunLengthDecode),
            "CCITTFaxDecode" | "CCF" => Some(Filter::CCITTFaxDecode),
            "JBIG2Decode" => Some(Filter::JBIG2Decode),
            "DCTDecode" | "DCT" => Some(Filter::DCTDecode),
            "JPXDecode" => Some(Filter::JPXDecode),
            "Crypt" => Some(Filter::Crypt),
            _ => None,
        }
    }
}

/// Decode stream data according to the `Filter` and `DecodeParms` entries
pub fn decode_stream(data: &[u8], dict: &Dictionary) -> ParseResult<Vec<u8>> {
    let filters: Vec<&str> = match dict.get("Filter") {
        None | Some(Object::Null) => return Ok(data.to_vec()),
        Some(Object::Name(name)) => vec![name.as_str()],
        Some(Object::Array(array)) => {
            let mut names = Vec::with_capacity(array.len());
            for obj in array {
                let name = obj.as_name().ok_or_else(|| {
                    ParseError::StreamDecodeError("Invalid filter in array".to_string())
                })?;
                names.push(name);
            }
            names
        }
        Some(other) => {
            return Err(ParseError::StreamDecodeError(format!(
                "Invalid Filter type: {}",
                other.type_name()
            )))
        }
    };

    let mut result = data.to_vec();
    for (i, filter_name) in filters.into_iter().enumerate() {
        let filter = Filter::from_name(filter_name)
            .ok_or_else(|| ParseError::StreamDecodeError(format!("Unknown filter: {filter_name}")))?;

        result = apply_filter(&result, filter)?;
        if let Some(params) = decode_parms(dict, i) {
            result = apply_predictor(result, params)?;
        }
    }

    Ok(result)
}

/// `DecodeParms` for the filter at `index`; a single dictionary applies to
/// the first filter only.
fn decode_parms(dict: &Dictionary, index: usize) -> Option<&Dictionary> {
    match dict.get("DecodeParms") {
        Some(Object::Dictionary(params)) if index == 0 => Some(params),
        Some(Object::Array(items)) => items.get(index).and_then(|obj| match obj {
            Object::Dictionary(params) => Some(params),
            _ => None,
        }),
        _ => None,
    }
}

/// Apply a single filter to data
pub fn apply_filter(data: &[u8], filter: Filter) -> ParseResult<Vec<u8>> {
    match filter {
        Filter::FlateDecode => decode_flate(data),
        Filter::ASCIIHexDecode => decode_ascii_hex(data),
        Filter::ASCII85Decode => decode_ascii85(data),
        _ => Err(ParseError::StreamDecodeError(format!(
            "Filter {filter:?} not supported"
        ))),
    }
}

/// Decode FlateDecode (zlib/deflate) compressed data
fn decode_flate(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut result = Vec::new();
    decoder
        .read_to_end(&mut result)
        .map_err(|e| ParseError::StreamDecodeError(format!("Flate decode error: {e}")))?;
    Ok(result)
}

/// Compress data with zlib for FlateDecode streams
pub fn encode_flate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Undo a PNG (10..=15) or TIFF (2) predictor described by `params`
pub fn apply_predictor(data: Vec<u8>, params: &Dictionary) -> ParseResult<Vec<u8>> {
    let int_param = |key: &str, default: i64| {
        params
            .get(key)
            .and_then(|obj| obj.as_integer())
            .unwrap_or(default)
    };

    let predictor = int_param("Predictor", 1);
    if predictor <= 1 || data.is_empty() {
        return Ok(data);
    }

    let positive = |key: &str, default: i64| {
        usize::try_from(int_param(key, default).max(1)).unwrap_or(usize::MAX)
    };
    let colors = positive("Colors", 1);
    let bits = positive("BitsPerComponent", 8);
    let columns = positive("Columns", 1);

    // A row never holds more bytes than the stream itself
    let row_bits = colors
        .checked_mul(bits)
        .and_then(|pixel| pixel.checked_mul(columns))
        .filter(|&row_bits| row_bits.div_ceil(8) <= data.len())
        .ok_or_else(|| {
            ParseError::StreamDecodeError(format!(
                "Predictor rows of {columns} columns do not fit in {} bytes",
                data.len()
            ))
        })?;
    let bytes_per_pixel = (colors * bits).div_ceil(8).max(1);
    let row_len = row_bits.div_ceil(8);

    match predictor {
        2 => decode_tiff_predictor(data, bits, bytes_per_pixel, row_len),
        10..=15 => decode_png_predictor(&data, bytes_per_pixel, row_len),
        other => Err(ParseError::StreamDecodeError(format!(
            "Unsupported predictor: {other}"
        ))),
    }
}

fn decode_png_predictor(data: &[u8], bpp: usize, row_len: usize) -> ParseResult<Vec<u8>> {
    let stride = row_len + 1;
    let mut result = Vec::with_capacity(data.len() / stride * row_len);
    let mut prev_row = vec![0u8; row_len];

    for chunk in data.chunks(stride) {
        if chunk.len() < 2 {
            break;
        }
        let filter_type = chunk[0];
        let mut row = chunk[1..].to_vec();
        row.resize(row_len, 0);

        for i in 0..row_len {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev_row[i];
            let up_left = if i >= bpp { prev_row[i - bpp] } else { 0 };

            row[i] = match filter_type {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, up_left)),
                other => {
                    return Err(ParseError::StreamDecodeError(format!(
                        "Invalid PNG filter type: {other}"
                    )))
                }
            };
        }

        result.extend_from_slice(&row);
        prev_row = row;
    }

    Ok(result)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn decode_tiff_predictor(
    mut data: Vec<u8>,
    bits: usize,
    bpp: usize,
    row_len: usize,
) -> ParseResult<Vec<u8>> {
    if bits != 8 {
        return Err(ParseError::StreamDecodeError(format!(
            "TIFF predictor with {bits} bits per component not supported"
        )));
    }

    for row in data.chunks_mut(row_len) {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }

    Ok(data)
}

/// Decode ASCIIHexDecode data
fn decode_ascii_hex(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut result = Vec::new();
    let mut chars = data.iter().filter(|&&b| !b.is_ascii_whitespace());

    loop {
        let high = match chars.next() {
            Some(&b'>') | None => break,
            Some(&ch) => ch,
        };

        let low = match chars.next() {
            Some(&b'>') | None => b'0',
            Some(&ch) => ch,
        };

        let high_val = hex_digit_value(high).ok_or_else(|| {
            ParseError::StreamDecodeError(format!("Invalid hex digit: {}", high as char))
        })?;
        let low_val = hex_digit_value(low).ok_or_else(|| {
            ParseError::StreamDecodeError(format!("Invalid hex digit: {}", low as char))
        })?;

        result.push((high_val << 4) | low_val);
    }

    Ok(result)
}

/// Get value of hex digit
pub(crate) fn hex_digit_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        _ => None,
    }
}

/// Decode ASCII85Decode data
fn decode_ascii85(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut result = Vec::new();
    let filtered: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let body = filtered.strip_prefix(b"<~").unwrap_or(&filtered);

    let mut group: Vec<u8> = Vec::with_capacity(5);
    let mut iter = body.iter().copied();

    while let Some(c) = iter.next() {
        match c {
            b'~' => {
                if iter.next() == Some(b'>') {
                    break;
                }
                return Err(ParseError::StreamDecodeError(
                    "Invalid ASCII85 end marker".to_string(),
                ));
            }
            b'z' if group.is_empty() => result.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group.push(c);
                if group.len() == 5 {
                    result.extend_from_slice(&ascii85_group_value(&group).to_be_bytes());
                    group.clear();
                }
            }
            _ => {
                return Err(ParseError::StreamDecodeError(format!(
                    "Invalid ASCII85 character: {}",
                    c as char
                )))
            }
        }
    }

    if !group.is_empty() {
        let original_len = group.len();
        group.resize(5, b'u');
        let bytes = ascii85_group_value(&group).to_be_bytes();
        result.extend_from_slice(&bytes[..original_len - 1]);
    }

    Ok(result)
}

fn ascii85_group_value(group: &[u8]) -> u32 {
    group
        .iter()
        .fold(0u32, |acc, &ch| acc.wrapping_mul(85).wrapping_add((ch - b'!') as u32))
}
