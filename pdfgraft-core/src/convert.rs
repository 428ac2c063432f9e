//! Document to text conversion
//!
//! The engine only produces ordered text lines. Laying them out in a target
//! format is the job of a [`TextLayoutWriter`]; [`PlainTextWriter`] is the
//! one shipped here.

use crate::document::Document;
use crate::error::Result;
use crate::operations::extract_text::extract_text_lines;

/// Written instead of the text when a document has none
pub const NO_TEXT_NOTICE: &str =
    "Could not extract text from this PDF (maybe scanned or image-based).";

/// Lays out text lines as a document in some output format
pub trait TextLayoutWriter {
    /// Builds one output document holding `lines`, one paragraph each
    fn write_document(&mut self, lines: &[String]) -> Result<Vec<u8>>;
}

/// UTF-8 text, one line per entry
#[derive(Debug, Clone, Default)]
pub struct PlainTextWriter {
    crlf: bool,
}

impl PlainTextWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ends lines with `\r\n` instead of `\n`
    pub fn with_crlf(mut self, crlf: bool) -> Self {
        self.crlf = crlf;
        self
    }
}

impl TextLayoutWriter for PlainTextWriter {
    fn write_document(&mut self, lines: &[String]) -> Result<Vec<u8>> {
        let eol = if self.crlf { "\r\n" } else { "\n" };
        let mut out = String::with_capacity(lines.iter().map(|l| l.len() + eol.len()).sum());
        for line in lines {
            out.push_str(line);
            out.push_str(eol);
        }
        Ok(out.into_bytes())
    }
}

/// Extracts the text of `source` and lays it out with `writer`.
///
/// A document without any text produces a single line holding
/// [`NO_TEXT_NOTICE`].
pub fn pdf_to_text_document<W>(source: &[u8], writer: &mut W) -> Result<Vec<u8>>
where
    W: TextLayoutWriter + ?Sized,
{
    let mut document = Document::parse(source)?;
    let mut lines = extract_text_lines(&mut document)?;

    if lines.iter().all(|line| line.trim().is_empty()) {
        tracing::info!(
            "No text found in {} pages, writing notice",
            document.page_count()
        );
        lines = vec![NO_TEXT_NOTICE.to_string()];
    } else {
        tracing::debug!(
            "Extracted {} lines from {} pages",
            lines.len(),
            document.page_count()
        );
    }

    writer.write_document(&lines)
}
