//! PDF Parser Module
//!
//! Reads a PDF file into the engine's object model: header, cross-reference
//! chain (tables and streams), trailer, indirect objects, object streams and
//! the page tree. Everything beyond the page tree is resolved lazily through
//! [`PdfReader`].

pub mod encoding;
pub mod filters;
pub mod header;
pub mod lexer;
pub mod object_stream;
pub mod objects;
pub mod page_tree;
pub mod reader;
pub mod trailer;
pub mod xref;
pub mod xref_stream;

pub use self::header::PdfVersion;
pub use self::reader::PdfReader;
pub use self::xref::{XRefEntry, XRefTable};

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// PDF Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty input")]
    EmptyFile,

    #[error("Invalid PDF header")]
    InvalidHeader,

    #[error("startxref not found")]
    MissingStartXRef,

    #[error("Invalid xref at offset {offset}: {reason}")]
    InvalidXRef { offset: u64, reason: String },

    #[error("Invalid trailer: {0}")]
    InvalidTrailer(String),

    #[error("Missing required key: {0}")]
    MissingKey(String),

    #[error("Syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Truncated stream at position {0}: endstream not found")]
    TruncatedStream(usize),

    #[error("Stream decode error: {0}")]
    StreamDecodeError(String),

    #[error("Circular reference detected: {0}")]
    CircularReference(String),

    #[error("Invalid object reference: {0} {1} R")]
    InvalidReference(u32, u16),

    #[error("Encryption not supported")]
    EncryptionNotSupported,
}

impl ParseError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        ParseError::SyntaxError {
            position,
            message: message.into(),
        }
    }
}
