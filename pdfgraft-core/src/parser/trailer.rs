//! PDF Trailer
//!
//! Validates the trailer dictionary according to ISO 32000-1 Section 7.5.5

use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId};

/// PDF Trailer information
#[derive(Debug, Clone)]
pub struct PdfTrailer {
    dict: Dictionary,
}

impl PdfTrailer {
    /// Wrap and validate a merged trailer dictionary
    pub fn from_dict(dict: Dictionary) -> ParseResult<Self> {
        let trailer = PdfTrailer { dict };
        trailer.validate()?;
        Ok(trailer)
    }

    /// Get the size (number of entries in xref table)
    pub fn size(&self) -> Option<u32> {
        self.dict
            .get("Size")
            .and_then(|obj| obj.as_integer())
            .and_then(|i| u32::try_from(i).ok())
    }

    /// Get the root object reference (document catalog)
    pub fn root(&self) -> ParseResult<ObjectId> {
        match self.dict.get("Root") {
            Some(Object::Reference(id)) => Ok(*id),
            Some(other) => Err(ParseError::InvalidTrailer(format!(
                "Root must be a reference, found {}",
                other.type_name()
            ))),
            None => Err(ParseError::MissingKey("Root".to_string())),
        }
    }

    /// Get the info object reference (document information dictionary)
    pub fn info(&self) -> Option<ObjectId> {
        self.dict.get("Info").and_then(|obj| obj.as_reference())
    }

    /// Get the ID array (file identifiers)
    pub fn id(&self) -> Option<&Object> {
        self.dict.get("ID")
    }

    /// Check if this PDF is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.dict.contains_key("Encrypt")
    }

    /// Validate the trailer dictionary
    pub fn validate(&self) -> ParseResult<()> {
        if self.is_encrypted() {
            return Err(ParseError::EncryptionNotSupported);
        }
        self.root()?;
        Ok(())
    }

    /// Get access to the trailer dictionary
    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    pub fn into_dict(self) -> Dictionary {
        self.dict
    }
}
