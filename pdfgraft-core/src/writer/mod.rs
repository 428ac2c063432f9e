//! PDF writing functionality
//!
//! Serializes the reachable part of a [`Document`](crate::Document), either
//! with a classic cross-reference table or with object streams closed by a
//! cross-reference stream.

mod pdf_writer;
mod xref_stream_writer;

pub use pdf_writer::{format_pdf_date, PdfWriter, WriterConfig};
pub use xref_stream_writer::XRefStreamWriter;
