//! PDF Cross-Reference Parser
//!
//! Reads the whole cross-reference chain of a file according to ISO 32000-1
//! Sections 7.5.4 and 7.5.8: classic tables, cross-reference streams, hybrid
//! `XRefStm` sections and `Prev` links left by incremental updates. The
//! newest entry for an object number wins.

use super::lexer::{rfind_subsequence, Lexer, Token};
use super::objects::{looks_like_object_header, parse_indirect_object, parse_object, skip_filler};
use super::xref_stream::XRefStream;
use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object};
use std::collections::{BTreeMap, HashSet};

/// How far from the end of the file `startxref` is searched for
const STARTXREF_SEARCH_WINDOW: usize = 1024;

/// Trailer keys that older sections may still provide
const INHERITED_TRAILER_KEYS: [&str; 4] = ["Root", "Info", "ID", "Encrypt"];

/// Cross-reference entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// Free (deleted) object
    Free,
    /// Object stored at a byte offset in the file
    InUse { offset: u64, generation: u16 },
    /// Object stored inside an object stream (PDF 1.5+)
    Compressed { stream: u32, index: u32 },
}

/// Merged cross-reference index of a file
#[derive(Debug, Clone, Default)]
pub struct XRefTable {
    entries: BTreeMap<u32, XRefEntry>,
    trailer: Dictionary,
}

impl XRefTable {
    /// Create a new empty xref table
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the full xref chain of `data`, starting from `startxref`.
    ///
    /// `header_offset` is the position of `%PDF-`; files with leading junk
    /// sometimes write offsets relative to it.
    pub fn parse(data: &[u8], header_offset: usize) -> ParseResult<Self> {
        let start = find_startxref(data)?;

        let mut table = XRefTable::new();
        let mut visited = HashSet::new();
        let mut next = Some(start);
        let mut first = true;

        while let Some(offset) = next.take() {
            if !visited.insert(offset) {
                tracing::warn!("Xref chain loops back to offset {}, stopping", offset);
                break;
            }

            let section = match read_section(data, offset, header_offset) {
                Ok(section) => section,
                Err(e) if first => return Err(e),
                Err(e) => {
                    // Older revisions are best effort once the newest one parsed
                    tracing::warn!("Skipping unreadable xref section at {}: {}", offset, e);
                    break;
                }
            };

            for (number, entry) in section.entries {
                table.entries.entry(number).or_insert(entry);
            }

            if first {
                table.trailer = section.trailer.clone();
                first = false;
            } else {
                for key in INHERITED_TRAILER_KEYS {
                    if !table.trailer.contains_key(key) {
                        if let Some(value) = section.trailer.get(key) {
                            table.trailer.set(key, value.clone());
                        }
                    }
                }
            }

            next = section
                .trailer
                .get("Prev")
                .and_then(offset_value);
        }

        // Stream-only keys never belong in the merged trailer
        for key in ["Prev", "XRefStm", "Type", "W", "Index", "Length", "Filter", "DecodeParms"] {
            table.trailer.remove(key);
        }

        tracing::debug!(
            "Parsed xref chain: {} entries over {} sections",
            table.entries.len(),
            visited.len()
        );
        Ok(table)
    }

    /// Get the entry for an object number
    pub fn get(&self, number: u32) -> Option<&XRefEntry> {
        self.entries.get(&number)
    }

    /// Insert an entry, replacing any existing one
    pub fn insert(&mut self, number: u32, entry: XRefEntry) {
        self.entries.insert(number, entry);
    }

    /// The merged trailer dictionary
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u32, &XRefEntry)> {
        self.entries.iter()
    }

    /// Highest object number with an entry
    pub fn max_object_number(&self) -> u32 {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }
}

/// One xref section plus its trailer
struct XRefSection {
    entries: Vec<(u32, XRefEntry)>,
    trailer: Dictionary,
}

fn offset_value(obj: &Object) -> Option<usize> {
    match obj {
        Object::Integer(i) => usize::try_from(*i).ok(),
        Object::Real(r) if *r >= 0.0 => Some(*r as usize),
        _ => None,
    }
}

/// Find the byte offset named by the last `startxref` keyword
pub fn find_startxref(data: &[u8]) -> ParseResult<usize> {
    let window_start = data.len().saturating_sub(STARTXREF_SEARCH_WINDOW);
    let window = &data[window_start..];

    let keyword = rfind_subsequence(window, b"startxref").ok_or(ParseError::MissingStartXRef)?;
    let mut lexer = Lexer::at(data, window_start + keyword);
    lexer.expect_keyword("startxref")?;

    match lexer.next_token()? {
        Token::Integer(offset) if offset >= 0 => Ok(offset as usize),
        other => Err(ParseError::InvalidXRef {
            offset: (window_start + keyword) as u64,
            reason: format!("startxref is followed by {other:?}"),
        }),
    }
}

/// Read the section at `offset`, retrying relative to the header when the
/// absolute offset does not hit a section
fn read_section(data: &[u8], offset: usize, header_offset: usize) -> ParseResult<XRefSection> {
    match read_section_at(data, offset) {
        Err(e) if header_offset > 0 => {
            let shifted = offset.saturating_add(header_offset);
            read_section_at(data, shifted).map_err(|_| e)
        }
        result => result,
    }
}

fn read_section_at(data: &[u8], offset: usize) -> ParseResult<XRefSection> {
    if offset >= data.len() {
        return Err(ParseError::InvalidXRef {
            offset: offset as u64,
            reason: "offset beyond end of file".to_string(),
        });
    }

    let position = skip_filler(data, offset);
    if data[position..].starts_with(b"xref") {
        read_table_section(data, position)
    } else if looks_like_object_header(data, position) {
        read_stream_section(data, position)
    } else {
        Err(ParseError::InvalidXRef {
            offset: offset as u64,
            reason: "neither an xref table nor an xref stream".to_string(),
        })
    }
}

/// Classic `xref` table followed by `trailer << ... >>`
fn read_table_section(data: &[u8], offset: usize) -> ParseResult<XRefSection> {
    let invalid = |reason: String| ParseError::InvalidXRef {
        offset: offset as u64,
        reason,
    };

    let mut lexer = Lexer::at(data, offset);
    lexer.expect_keyword("xref")?;
    let mut entries = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::Keyword(word) if word == "trailer" => break,
            Token::Integer(first) if first >= 0 => {
                let count = match lexer.next_token()? {
                    Token::Integer(count) if count >= 0 => count,
                    other => return Err(invalid(format!("bad subsection count {other:?}"))),
                };
                // Every object number in the subsection must fit in u32
                let end = first
                    .checked_add(count)
                    .filter(|&end| end <= i64::from(u32::MAX) + 1)
                    .ok_or_else(|| invalid(format!("subsection {first} {count} is out of range")))?;
                for number in (first..end).map(|n| n as u32) {
                    let entry = read_table_entry(&mut lexer)
                        .map_err(|reason| invalid(format!("entry {number}: {reason}")))?;
                    entries.push((number, entry));
                }
            }
            other => return Err(invalid(format!("unexpected {other:?} in xref table"))),
        }
    }

    let trailer = match parse_object(&mut lexer)? {
        Object::Dictionary(dict) => dict,
        other => {
            return Err(ParseError::InvalidTrailer(format!(
                "expected dictionary, found {}",
                other.type_name()
            )))
        }
    };

    // Hybrid file: the XRefStm section fills in compressed objects
    if let Some(stm_offset) = trailer.get("XRefStm").and_then(offset_value) {
        match read_section_at(data, stm_offset) {
            Ok(stream_section) => {
                let in_use: HashSet<u32> = entries
                    .iter()
                    .filter(|(_, e)| !matches!(e, XRefEntry::Free))
                    .map(|(n, _)| *n)
                    .collect();
                // In-use table entries win; the stream replaces free ones
                let mut merged: Vec<(u32, XRefEntry)> = stream_section
                    .entries
                    .into_iter()
                    .filter(|(n, e)| !in_use.contains(n) && !matches!(e, XRefEntry::Free))
                    .collect();
                merged.extend(entries);
                entries = dedupe_first(merged);
            }
            Err(e) => tracing::warn!("Ignoring unreadable XRefStm at {}: {}", stm_offset, e),
        }
    }

    Ok(XRefSection { entries, trailer })
}

/// Keep the first entry per object number
fn dedupe_first(entries: Vec<(u32, XRefEntry)>) -> Vec<(u32, XRefEntry)> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|(number, _)| seen.insert(*number))
        .collect()
}

/// `oooooooooo ggggg n|f`
fn read_table_entry(lexer: &mut Lexer<'_>) -> Result<XRefEntry, String> {
    let offset = match lexer.next_token() {
        Ok(Token::Integer(offset)) if offset >= 0 => offset as u64,
        other => return Err(format!("bad offset {other:?}")),
    };
    let generation = match lexer.next_token() {
        Ok(Token::Integer(generation)) if (0..=u16::MAX as i64).contains(&generation) => {
            generation as u16
        }
        other => return Err(format!("bad generation {other:?}")),
    };
    match lexer.next_token() {
        Ok(Token::Keyword(kind)) if kind == "n" => Ok(XRefEntry::InUse { offset, generation }),
        Ok(Token::Keyword(kind)) if kind == "f" => Ok(XRefEntry::Free),
        other => Err(format!("bad entry type {other:?}")),
    }
}

/// `N G obj << /Type /XRef ... >> stream ... endstream`
fn read_stream_section(data: &[u8], offset: usize) -> ParseResult<XRefSection> {
    let mut lexer = Lexer::at(data, offset);
    let (_, object) = parse_indirect_object(&mut lexer, &|_| None)?;

    let stream = match object {
        Object::Stream(stream) if stream.dictionary().get_type() == Some("XRef") => stream,
        other => {
            return Err(ParseError::InvalidXRef {
                offset: offset as u64,
                reason: format!("object is a {} and not an xref stream", other.type_name()),
            })
        }
    };

    let xref_stream = XRefStream::parse(&stream)?;
    let entries = xref_stream.to_xref_entries()?;

    Ok(XRefSection {
        entries,
        trailer: xref_stream.dict,
    })
}
