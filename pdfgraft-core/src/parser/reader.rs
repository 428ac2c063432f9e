//! Lazy PDF object reader
//!
//! Owns the source bytes together with the merged cross-reference index and
//! parses indirect objects on demand. Decoded object streams are cached.

use super::header::{PdfHeader, PdfVersion};
use super::lexer::{find_subsequence, Lexer};
use super::object_stream::ObjectStream;
use super::objects::parse_indirect_object;
use super::xref::{XRefEntry, XRefTable};
use super::{ParseError, ParseResult};
use crate::objects::{Object, ObjectId};
use std::collections::HashMap;
use std::sync::Arc;

/// Source of a parsed document's objects
#[derive(Debug, Clone)]
pub struct PdfReader {
    data: Arc<[u8]>,
    header: PdfHeader,
    xref: XRefTable,
    object_streams: HashMap<u32, ObjectStream>,
}

impl PdfReader {
    /// Read the header and cross-reference chain of `data`
    pub fn new(data: impl Into<Arc<[u8]>>) -> ParseResult<Self> {
        let data = data.into();
        let header = PdfHeader::parse(&data)?;
        let xref = XRefTable::parse(&data, header.offset)?;

        Ok(Self {
            data,
            header,
            xref,
            object_streams: HashMap::new(),
        })
    }

    pub fn version(&self) -> PdfVersion {
        self.header.version
    }

    pub fn xref(&self) -> &XRefTable {
        &self.xref
    }

    /// Identities of every object the xref marks as present
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.xref
            .iter()
            .filter_map(|(&number, entry)| match entry {
                XRefEntry::InUse { generation, .. } => Some(ObjectId::new(number, *generation)),
                XRefEntry::Compressed { .. } => Some(ObjectId::new(number, 0)),
                XRefEntry::Free => None,
            })
            .collect()
    }

    /// Load an object from the source bytes.
    ///
    /// A missing entry, a free entry or a generation mismatch yields
    /// `Ok(None)`. Bytes that cannot be parsed are an error.
    pub fn load_object(&mut self, id: ObjectId) -> ParseResult<Option<Object>> {
        match self.xref.get(id.number()).copied() {
            None | Some(XRefEntry::Free) => Ok(None),
            Some(XRefEntry::InUse { offset, generation }) => {
                if generation != id.generation() {
                    tracing::debug!(
                        "Reference {} does not match xref generation {}",
                        id,
                        generation
                    );
                    return Ok(None);
                }
                self.parse_at(offset as usize, id).map(Some)
            }
            Some(XRefEntry::Compressed { stream, .. }) => {
                if id.generation() != 0 {
                    return Ok(None);
                }
                if stream == id.number() {
                    return Err(ParseError::CircularReference(format!(
                        "object stream {stream} contains itself"
                    )));
                }
                let object = self
                    .object_stream(stream)?
                    .and_then(|objstm| objstm.get_object(id.number()).cloned());
                Ok(object)
            }
        }
    }

    fn object_stream(&mut self, number: u32) -> ParseResult<Option<&ObjectStream>> {
        if !self.object_streams.contains_key(&number) {
            let offset = match self.xref.get(number).copied() {
                Some(XRefEntry::InUse { offset, generation }) => {
                    (offset as usize, ObjectId::new(number, generation))
                }
                _ => {
                    tracing::warn!("Object stream {} is not in the xref", number);
                    return Ok(None);
                }
            };

            let stream = match self.parse_at(offset.0, offset.1)? {
                Object::Stream(stream) => stream,
                other => {
                    return Err(ParseError::syntax(
                        offset.0,
                        format!("Object {number} is a {} and not a stream", other.type_name()),
                    ))
                }
            };
            let objstm = ObjectStream::parse(&stream)?;
            self.object_streams.insert(number, objstm);
        }

        Ok(self.object_streams.get(&number))
    }

    /// Parse the indirect object `id` expected at `offset`. When the offset
    /// is stale the file is scanned for the object's header instead.
    fn parse_at(&self, offset: usize, id: ObjectId) -> ParseResult<Object> {
        let first_try = self.parse_indirect_at(offset, id);
        if first_try.is_ok() {
            return first_try;
        }

        let mut candidates = Vec::new();
        if self.header.offset > 0 {
            candidates.extend(offset.checked_add(self.header.offset));
        }
        candidates.extend(self.scan_for_object(id));

        for candidate in candidates.into_iter().filter(|&c| c != offset) {
            if let Ok(object) = self.parse_indirect_at(candidate, id) {
                tracing::debug!("Recovered object {} at offset {} instead of {}", id, candidate, offset);
                return Ok(object);
            }
        }

        first_try
    }

    fn parse_indirect_at(&self, offset: usize, id: ObjectId) -> ParseResult<Object> {
        if offset >= self.data.len() {
            return Err(ParseError::syntax(
                offset,
                format!("Object {id} offset is beyond end of file"),
            ));
        }

        let mut lexer = Lexer::at(&self.data, offset);
        let resolve = |length_id: ObjectId| self.resolve_length(length_id);
        let (found, object) = parse_indirect_object(&mut lexer, &resolve)?;

        if found.number() != id.number() {
            return Err(ParseError::syntax(
                offset,
                format!("Object number mismatch: expected {}, found {}", id.number(), found.number()),
            ));
        }
        Ok(object)
    }

    /// Offset of the last `N G obj` header for `id` in the file
    fn scan_for_object(&self, id: ObjectId) -> Option<usize> {
        let pattern = format!("{} {} obj", id.number(), id.generation());
        let pattern = pattern.as_bytes();

        let mut found = None;
        let mut start = 0;
        while let Some(pos) = find_subsequence(&self.data[start..], pattern) {
            let absolute = start + pos;
            let boundary = absolute == 0 || !self.data[absolute - 1].is_ascii_digit();
            if boundary {
                found = Some(absolute);
            }
            start = absolute + 1;
        }
        found
    }

    /// Value of an indirect `/Length`, when it is a plain integer object
    fn resolve_length(&self, id: ObjectId) -> Option<i64> {
        let offset = match self.xref.get(id.number()) {
            Some(XRefEntry::InUse { offset, .. }) => *offset as usize,
            _ => return None,
        };
        let mut lexer = Lexer::at(&self.data, offset);
        match parse_indirect_object(&mut lexer, &|_| None) {
            Ok((_, Object::Integer(len))) => Some(len),
            _ => None,
        }
    }
}
