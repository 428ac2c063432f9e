use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object};
use crate::parser::{filters, ParseResult};

/// A stream object: its dictionary plus the raw, still-encoded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    dictionary: Dictionary,
    data: Vec<u8>,
}

impl Stream {
    pub fn new(data: Vec<u8>) -> Self {
        Self::with_dictionary(Dictionary::new(), data)
    }

    /// Builds a stream around `data`. `Length` is always rewritten to the
    /// direct byte count, whatever the dictionary carried before.
    pub fn with_dictionary(dictionary: Dictionary, data: Vec<u8>) -> Self {
        let mut dict = dictionary;
        dict.set("Length", data.len() as i64);

        Self {
            dictionary: dict,
            data,
        }
    }

    /// Compresses `data` with FlateDecode and builds the stream around it.
    pub fn flate(dictionary: Dictionary, data: &[u8]) -> Result<Self> {
        let compressed = filters::encode_flate(data)
            .map_err(|e| PdfError::Serialization(format!("flate encode failed: {e}")))?;

        let mut dict = dictionary;
        dict.set("Filter", Object::name("FlateDecode"));
        Ok(Self::with_dictionary(dict, compressed))
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dictionary
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Applies the stream's filter chain and returns the decoded payload.
    pub fn decode(&self) -> ParseResult<Vec<u8>> {
        filters::decode_stream(&self.data, &self.dictionary)
    }
}
