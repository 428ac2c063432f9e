//! # pdfgraft
//!
//! A pure Rust PDF object-graph engine. Documents are parsed into an
//! indirect-object graph, pages are lifted out together with everything they
//! reference, copied between documents with their references renumbered, and
//! written back either with a classic cross-reference table or with object
//! streams and a cross-reference stream.
//!
//! ## Features
//!
//! - **Merge**: assemble pages of several documents in any order, repeats allowed
//! - **Split**: build a document from selected pages of one source
//! - **Compress**: rewrite a document with object streams, drop unreachable
//!   objects and blank the descriptive metadata
//! - **Text**: read the text lines of every page
//!
//! Resources shared between pages are copied once per operation, cyclic
//! references (`/Parent`, annotation back-links) are handled, and defects
//! limited to one reference or one requested page are recovered and
//! reported instead of aborting the whole operation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfgraft::{merge_documents, split_document, Document};
//!
//! # fn main() -> pdfgraft::Result<()> {
//! let a = std::fs::read("a.pdf")?;
//! let b = std::fs::read("b.pdf")?;
//!
//! // b, then a, then b again
//! let merged = merge_documents(&[a, b], Some(&[1, 0, 1]))?;
//!
//! // Page 3 twice, then pages 1 and 2
//! let split = split_document(&merged, &[3, 3, 1, 2])?;
//! assert_eq!(Document::parse(&split)?.page_count(), 4);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`parser`] - Tokenizer, cross-reference and object stream readers
//! - [`document`] - The object graph of one document
//! - [`operations`] - Page closures, copying, merge, split and compress
//! - [`writer`] - Serialization
//! - [`convert`] - Text lines handed to a layout writer

pub mod convert;
pub mod document;
pub mod error;
pub mod objects;
pub mod operations;
pub mod parser;
pub mod writer;

pub use convert::{pdf_to_text_document, PlainTextWriter, TextLayoutWriter, NO_TEXT_NOTICE};
pub use document::{Document, DocumentMetadata, PageNode, SaveOptions};
pub use error::{Diagnostic, PdfError, RangeError, ReferenceError, Result};
pub use objects::{Dictionary, Object, ObjectId, Stream};
pub use operations::{
    compress_document, compress_document_with, extract_text_lines, merge_documents,
    parse_page_numbers, split_document, CompressOptions, MergeOutput, PdfMerger,
    MAX_PAGE_NUMBERS,
};
pub use parser::{ParseError, PdfVersion};

/// Current version of pdfgraft
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
