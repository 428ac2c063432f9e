//! Cross-reference stream support for PDF 1.5+
//!
//! Implements cross-reference streams according to ISO 32000-1:2008
//! Section 7.5.8. Entries are decoded from the stream's binary rows using
//! the field widths in `/W`.

use super::xref::XRefEntry;
use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Stream};

/// A decoded cross-reference stream
#[derive(Debug, Clone)]
pub struct XRefStream {
    /// Stream dictionary, which doubles as the trailer
    pub dict: Dictionary,
    /// Decoded stream data
    pub data: Vec<u8>,
    /// Field widths from W array
    pub widths: [usize; 3],
    /// Index array (pairs of [first_object_number, count])
    pub index: Vec<(u32, u32)>,
}

impl XRefStream {
    /// Decode a cross-reference stream object
    pub fn parse(stream: &Stream) -> ParseResult<Self> {
        let dict = stream.dictionary();

        let widths: Vec<usize> = dict
            .get("W")
            .and_then(|obj| obj.as_array())
            .ok_or_else(|| ParseError::MissingKey("W array in xref stream".to_string()))?
            .iter()
            .map(|obj| {
                obj.as_integer()
                    .and_then(|n| usize::try_from(n).ok())
                    .filter(|&n| n <= 8)
                    .ok_or_else(|| ParseError::syntax(0, "Invalid width in W array"))
            })
            .collect::<ParseResult<_>>()?;

        let widths: [usize; 3] = widths.try_into().map_err(|w: Vec<usize>| {
            ParseError::syntax(0, format!("W array must have 3 elements, found {}", w.len()))
        })?;

        let index = match dict.get("Index").and_then(|obj| obj.as_array()) {
            Some(items) => items
                .chunks(2)
                .filter(|pair| pair.len() == 2)
                .map(|pair| {
                    let first = pair[0].as_integer().and_then(|n| u32::try_from(n).ok());
                    let count = pair[1].as_integer().and_then(|n| u32::try_from(n).ok());
                    match (first, count) {
                        (Some(first), Some(count)) if u64::from(first) + u64::from(count) <= 1 << 32 => {
                            Ok((first, count))
                        }
                        _ => Err(ParseError::syntax(0, "Invalid Index array in xref stream")),
                    }
                })
                .collect::<ParseResult<Vec<_>>>()?,
            None => {
                let size = dict
                    .get("Size")
                    .and_then(|obj| obj.as_integer())
                    .ok_or_else(|| ParseError::MissingKey("Size in xref stream".to_string()))?;
                vec![(0, u32::try_from(size.max(0)).unwrap_or(u32::MAX))]
            }
        };

        let data = stream.decode()?;

        Ok(XRefStream {
            dict: dict.clone(),
            data,
            widths,
            index,
        })
    }

    /// Convert the stream rows to cross-reference entries
    pub fn to_xref_entries(&self) -> ParseResult<Vec<(u32, XRefEntry)>> {
        let entry_size = self.widths.iter().sum::<usize>();
        if entry_size == 0 {
            return Err(ParseError::syntax(0, "Invalid entry size (0) in xref stream"));
        }

        let mut entries = Vec::new();
        let mut rows = self.data.chunks_exact(entry_size);

        for &(first_obj, count) in &self.index {
            for i in 0..count {
                let Some(row) = rows.next() else {
                    // Truncated data: keep what was readable
                    tracing::warn!(
                        "Xref stream data truncated after {} entries",
                        entries.len()
                    );
                    return Ok(entries);
                };

                let (type_bytes, rest) = row.split_at(self.widths[0]);
                let (field2, field3) = rest.split_at(self.widths[1]);

                // A zero-width type field defaults to type 1
                let entry_type = if self.widths[0] == 0 {
                    1
                } else {
                    read_field(type_bytes)
                };
                let field2 = read_field(field2);
                let field3 = read_field(field3);

                let entry = match entry_type {
                    0 => XRefEntry::Free,
                    1 => XRefEntry::InUse {
                        offset: field2,
                        generation: field3 as u16,
                    },
                    2 => XRefEntry::Compressed {
                        stream: field2 as u32,
                        index: field3 as u32,
                    },
                    // Unknown types are treated as null references
                    _ => XRefEntry::Free,
                };

                entries.push((first_obj.saturating_add(i), entry));
            }
        }

        Ok(entries)
    }
}

/// Read a field from bytes (big-endian)
fn read_field(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |value, &byte| (value << 8) | byte as u64)
}
