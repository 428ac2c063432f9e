//! PDF splitting functionality
//!
//! Builds a new document from selected pages of one source. Pages may be
//! repeated and listed in any order; numbers outside the document are
//! skipped.

use super::merge::{MergeOutput, PdfMerger};
use crate::document::{Document, SaveOptions};
use crate::error::{RangeError, Result};

/// Builds a document from the 1-based `page_numbers` of `source`, in the
/// order given. All pages share one copy map, so resources shared in the
/// source stay shared in the output.
pub fn extract_pages(source: Document, page_numbers: &[i64]) -> Result<MergeOutput> {
    let count = source.page_count();
    let mut merger = PdfMerger::new();
    let source = merger.add_source(source);

    for &number in page_numbers {
        match usize::try_from(number) {
            Ok(n) if (1..=count).contains(&n) => {
                merger.append_page(source, n - 1)?;
            }
            _ => merger.record(RangeError::PageNumber { number, count }.into()),
        }
    }

    merger.finish()
}

/// Splits out the 1-based `page_numbers` of `source` into a new document,
/// saved with object streams
pub fn split_document(source: &[u8], page_numbers: &[i64]) -> Result<Vec<u8>> {
    let document = Document::parse(source)?;
    let mut output = extract_pages(document, page_numbers)?;
    tracing::debug!(
        "Split {} of {} requested pages",
        output.page_count(),
        page_numbers.len()
    );
    output.save(&SaveOptions::default().with_object_streams(true))
}
