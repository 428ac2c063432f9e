use crate::objects::ObjectId;
use crate::parser::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Source document {index} could not be parsed: {source}")]
    SourceParse {
        index: usize,
        #[source]
        source: ParseError,
    },

    #[error("Page index {0} is out of bounds (document has {1} pages)")]
    PageIndexOutOfBounds(usize, usize),

    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, PdfError>;

/// A reference that did not resolve while copying a page closure. The
/// reference is replaced by `null` in the output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Object {referrer} references missing object {target}")]
pub struct ReferenceError {
    pub referrer: ObjectId,
    pub target: ObjectId,
}

/// A requested item outside the valid range. The item is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Page number {number} is outside 1..={count}")]
    PageNumber { number: i64, count: usize },

    #[error("Page index {index} is out of bounds (document has {count} pages)")]
    PageIndex { index: usize, count: usize },

    #[error("Source index {index} is out of bounds ({count} sources)")]
    SourceIndex { index: usize, count: usize },
}

/// A recovered defect recorded during an operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Range(#[from] RangeError),
}
