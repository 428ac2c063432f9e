//! PDF operations module
//!
//! This module provides the document level operations: merging pages of
//! several documents, splitting pages out of one, compacting a document and
//! reading its text. All of them are built on page closures copied through a
//! [`CopyMap`].

pub mod compress;
pub mod copier;
pub mod extract_text;
pub mod merge;
pub mod page_extraction;
pub mod split;

pub use compress::{compress_document, compress_document_with, CompressOptions};
pub use copier::{merge_closure, CopyMap, SourceId};
pub use extract_text::{extract_page_lines, extract_text_lines};
pub use merge::{merge_documents, MergeOutput, PdfMerger, PRODUCER};
pub use page_extraction::{closure, PageClosure};
pub use split::{extract_pages, split_document};

use crate::error::{PdfError, Result};

/// Most page numbers a page list may expand to
pub const MAX_PAGE_NUMBERS: usize = 1_000_000;

/// Parses a page list such as `"3,3,1-2"` into 1-based page numbers, in
/// order and with repeats kept.
///
/// Single numbers are taken as written, including 0 and negative numbers,
/// so that the caller decides what is out of range. Ranges are inclusive and
/// must be ascending. A list expanding to more than [`MAX_PAGE_NUMBERS`]
/// entries is rejected.
pub fn parse_page_numbers(s: &str) -> Result<Vec<i64>> {
    let mut numbers = Vec::new();

    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(PdfError::InvalidPageRange(format!("Empty entry in '{s}'")));
        }

        if let Ok(number) = part.parse::<i64>() {
            if numbers.len() >= MAX_PAGE_NUMBERS {
                return Err(too_many_pages());
            }
            numbers.push(number);
            continue;
        }

        // Try range (e.g., "1-5")
        let Some((start, end)) = part.split_once('-') else {
            return Err(PdfError::InvalidPageRange(format!("Invalid page: {part}")));
        };
        let start = start
            .trim()
            .parse::<i64>()
            .map_err(|_| PdfError::InvalidPageRange(format!("Invalid start: {start}")))?;
        let end = end
            .trim()
            .parse::<i64>()
            .map_err(|_| PdfError::InvalidPageRange(format!("Invalid end: {end}")))?;

        if start < 1 {
            return Err(PdfError::InvalidPageRange(
                "Page numbers start at 1".to_string(),
            ));
        }
        if start > end {
            return Err(PdfError::InvalidPageRange(format!(
                "Start {start} is greater than end {end}"
            )));
        }
        let fits = end
            .checked_sub(start)
            .and_then(|span| usize::try_from(span).ok())
            .and_then(|span| span.checked_add(numbers.len() + 1))
            .is_some_and(|total| total <= MAX_PAGE_NUMBERS);
        if !fits {
            return Err(too_many_pages());
        }
        numbers.extend(start..=end);
    }

    Ok(numbers)
}

fn too_many_pages() -> PdfError {
    PdfError::InvalidPageRange(format!(
        "Page list expands to more than {MAX_PAGE_NUMBERS} pages"
    ))
}
