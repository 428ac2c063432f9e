//! PDF Object Stream Parser
//!
//! Handles compressed objects stored in object streams (PDF 1.5+,
//! ISO 32000-1 Section 7.5.7)

use super::lexer::{Lexer, Token};
use super::objects::parse_object;
use super::{ParseError, ParseResult};
use crate::objects::{Object, Stream};
use std::collections::HashMap;

/// The objects held by one decoded object stream
#[derive(Debug, Clone)]
pub struct ObjectStream {
    /// Object numbers in the order they appear in the stream
    numbers: Vec<u32>,
    /// Parsed objects
    objects: HashMap<u32, Object>,
}

impl ObjectStream {
    /// Decode and parse an object stream
    pub fn parse(stream: &Stream) -> ParseResult<Self> {
        let dict = stream.dictionary();

        let n = dict
            .get("N")
            .and_then(|obj| obj.as_integer())
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| ParseError::MissingKey("N".to_string()))?;

        let first = dict
            .get("First")
            .and_then(|obj| obj.as_integer())
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| ParseError::MissingKey("First".to_string()))?;

        let data = stream.decode()?;
        // Each header pair takes at least four bytes ("0 0 ")
        if n > data.len() / 2 {
            return Err(ParseError::syntax(
                0,
                format!("Object stream declares {n} objects in {} bytes", data.len()),
            ));
        }
        let mut lexer = Lexer::new(&data);

        let mut offsets = Vec::with_capacity(n);
        for _ in 0..n {
            let number = match lexer.next_token()? {
                Token::Integer(num) if u32::try_from(num).is_ok() => num as u32,
                other => {
                    return Err(ParseError::syntax(
                        lexer.position(),
                        format!("Expected object number in object stream, found {other:?}"),
                    ))
                }
            };
            let offset = match lexer.next_token()? {
                Token::Integer(off) if off >= 0 => off as usize,
                other => {
                    return Err(ParseError::syntax(
                        lexer.position(),
                        format!("Expected offset in object stream, found {other:?}"),
                    ))
                }
            };
            offsets.push((number, offset));
        }

        let mut numbers = Vec::with_capacity(n);
        let mut objects = HashMap::with_capacity(n);
        for (number, offset) in offsets {
            let start = first
                .checked_add(offset)
                .filter(|&start| start < data.len())
                .ok_or_else(|| {
                    ParseError::syntax(
                        first,
                        format!("Object {number} offset {offset} lies outside the object stream"),
                    )
                })?;
            let mut obj_lexer = Lexer::at(&data, start);
            let object = parse_object(&mut obj_lexer)?;
            // The first occurrence of a number wins
            if !objects.contains_key(&number) {
                numbers.push(number);
                objects.insert(number, object);
            }
        }

        Ok(ObjectStream { numbers, objects })
    }

    /// Get an object by its object number
    pub fn get_object(&self, number: u32) -> Option<&Object> {
        self.objects.get(&number)
    }

    /// Object numbers in stream order
    pub fn object_numbers(&self) -> &[u32] {
        &self.numbers
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}
