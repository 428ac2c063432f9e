//! PDF merging functionality
//!
//! [`PdfMerger`] assembles a new document from pages of any number of
//! source documents, in the order they are appended. Objects shared by
//! several pages of one source are copied once.

use super::copier::{merge_closure, CopyMap, SourceId};
use super::page_extraction::closure;
use crate::document::{Document, SaveOptions};
use crate::error::{Diagnostic, PdfError, RangeError, Result};
use crate::objects::{Dictionary, Object, ObjectId};
use crate::parser::encoding::encode_text;
use crate::writer::format_pdf_date;
use chrono::Utc;
use std::collections::HashMap;

/// Name written as Producer and Creator of assembled documents
pub const PRODUCER: &str = "pdfgraft";

/// The assembled document plus every defect recovered on the way
#[derive(Debug)]
pub struct MergeOutput {
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
}

impl MergeOutput {
    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    /// Serializes the assembled document
    pub fn save(&mut self, options: &SaveOptions) -> Result<Vec<u8>> {
        self.document.save(options)
    }
}

/// PDF merger
#[derive(Debug)]
pub struct PdfMerger {
    sources: Vec<Document>,
    dest: Document,
    copy_map: CopyMap,
    diagnostics: Vec<Diagnostic>,
}

impl Default for PdfMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfMerger {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            dest: Document::new(),
            copy_map: CopyMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Registers a source document and returns its id within this merger
    pub fn add_source(&mut self, document: Document) -> SourceId {
        if document.version() > self.dest.version() {
            self.dest.set_version(document.version());
        }
        self.sources.push(document);
        self.sources.len() - 1
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn source(&self, source: SourceId) -> Option<&Document> {
        self.sources.get(source)
    }

    /// Pages appended so far
    pub fn page_count(&self) -> usize {
        self.dest.page_count()
    }

    /// Appends page `page_index` (0-based) of `source`.
    ///
    /// An unknown source or an out-of-range page is skipped and recorded as
    /// a diagnostic; the call then returns `Ok(None)`.
    pub fn append_page(&mut self, source: SourceId, page_index: usize) -> Result<Option<ObjectId>> {
        let Some(document) = self.sources.get_mut(source) else {
            let count = self.sources.len();
            self.record(RangeError::SourceIndex { index: source, count }.into());
            return Ok(None);
        };

        let closure = match closure(document, page_index) {
            Ok(closure) => closure,
            Err(PdfError::PageIndexOutOfBounds(index, count)) => {
                push_diagnostic(
                    &mut self.diagnostics,
                    RangeError::PageIndex { index, count }.into(),
                );
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let page = merge_closure(
            document,
            source,
            &closure,
            &mut self.dest,
            &mut self.copy_map,
            &mut self.diagnostics,
        )?;
        self.dest.append_page(page)?;
        Ok(Some(page))
    }

    /// Appends every page of `source` in reading order and returns how many
    /// were appended
    pub fn append_all_pages(&mut self, source: SourceId) -> Result<usize> {
        let Some(document) = self.sources.get(source) else {
            let count = self.sources.len();
            self.record(RangeError::SourceIndex { index: source, count }.into());
            return Ok(0);
        };

        let mut appended = 0;
        for index in 0..document.page_count() {
            if self.append_page(source, index)?.is_some() {
                appended += 1;
            }
        }
        Ok(appended)
    }

    /// Records a recovered defect
    pub fn record(&mut self, diagnostic: Diagnostic) {
        push_diagnostic(&mut self.diagnostics, diagnostic);
    }

    /// Finishes the document: a fresh Info dictionary naming this engine as
    /// producer, dated now.
    pub fn finish(self) -> Result<MergeOutput> {
        let mut document = self.dest;
        let now = Object::String(format_pdf_date(Utc::now()).into_bytes());

        let mut info = Dictionary::new();
        info.set("Producer", Object::String(encode_text(PRODUCER)));
        info.set("Creator", Object::String(encode_text(PRODUCER)));
        info.set("CreationDate", now.clone());
        info.set("ModDate", now);
        document.set_info(info);

        tracing::debug!(
            "Assembled {} pages from {} sources ({} objects copied, {} diagnostics)",
            document.page_count(),
            self.sources.len(),
            self.copy_map.len(),
            self.diagnostics.len()
        );
        Ok(MergeOutput {
            document,
            diagnostics: self.diagnostics,
        })
    }
}

fn push_diagnostic(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    tracing::warn!("{}, skipping", diagnostic);
    diagnostics.push(diagnostic);
}

/// Merges whole documents.
///
/// `order` lists indices into `sources`; each entry appends every page of
/// that source. Without an order the sources are taken as given. Indices
/// without a source are skipped. A source is parsed at most once, and only
/// when referenced; one that fails to parse aborts the merge.
///
/// The result is saved with object streams.
pub fn merge_documents<S: AsRef<[u8]>>(sources: &[S], order: Option<&[usize]>) -> Result<Vec<u8>> {
    let natural: Vec<usize>;
    let order = match order {
        Some(order) => order,
        None => {
            natural = (0..sources.len()).collect();
            &natural
        }
    };

    let mut merger = PdfMerger::new();
    let mut registered: HashMap<usize, SourceId> = HashMap::new();
    for &index in order {
        let Some(bytes) = sources.get(index) else {
            merger.record(
                RangeError::SourceIndex {
                    index,
                    count: sources.len(),
                }
                .into(),
            );
            continue;
        };

        let source_id = match registered.get(&index) {
            Some(&id) => id,
            None => {
                let document = Document::parse(bytes.as_ref())
                    .map_err(|source| PdfError::SourceParse { index, source })?;
                let id = merger.add_source(document);
                registered.insert(index, id);
                id
            }
        };
        merger.append_all_pages(source_id)?;
    }

    let mut output = merger.finish()?;
    output.save(&SaveOptions::default().with_object_streams(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Stream;
    use pretty_assertions::assert_eq;

    fn document_with_pages(count: usize) -> Document {
        let mut doc = Document::new();
        for i in 0..count {
            let content = doc.add_object(Stream::new(format!("BT (p{i}) Tj ET").into_bytes()));
            let mut page = Dictionary::new();
            page.set("Type", Object::name("Page"));
            page.set("Contents", content);
            let page = doc.add_object(page);
            doc.append_page(page).unwrap();
        }
        doc
    }

    #[test]
    fn test_merger_appends_in_call_order() {
        let mut merger = PdfMerger::new();
        let a = merger.add_source(document_with_pages(2));
        let b = merger.add_source(document_with_pages(3));

        assert_eq!(merger.append_all_pages(b).unwrap(), 3);
        assert!(merger.append_page(a, 1).unwrap().is_some());
        assert_eq!(merger.page_count(), 4);

        let output = merger.finish().unwrap();
        assert_eq!(output.page_count(), 4);
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_merger_skips_bad_indices() {
        let mut merger = PdfMerger::new();
        let a = merger.add_source(document_with_pages(1));

        assert_eq!(merger.append_page(a, 5).unwrap(), None);
        assert_eq!(merger.append_page(7, 0).unwrap(), None);
        assert_eq!(merger.append_all_pages(9).unwrap(), 0);

        let output = merger.finish().unwrap();
        assert_eq!(output.page_count(), 0);
        assert_eq!(
            output.diagnostics,
            vec![
                RangeError::PageIndex { index: 5, count: 1 }.into(),
                RangeError::SourceIndex { index: 7, count: 1 }.into(),
                RangeError::SourceIndex { index: 9, count: 1 }.into(),
            ]
        );
    }

    #[test]
    fn test_finish_writes_info() {
        let mut output = PdfMerger::new().finish().unwrap();
        let metadata = output.document.metadata().unwrap();

        assert_eq!(metadata.producer.as_deref(), Some(PRODUCER));
        assert_eq!(metadata.creator.as_deref(), Some(PRODUCER));
        assert!(metadata.creation_date.unwrap().starts_with("D:"));
        assert!(metadata.title.is_none());
    }

    #[test]
    fn test_merge_documents_order_and_skips() {
        let mut one = document_with_pages(1);
        let mut two = document_with_pages(2);
        let sources = vec![
            one.save(&SaveOptions::default()).unwrap(),
            two.save(&SaveOptions::default()).unwrap(),
        ];

        let merged = merge_documents(&sources, Some(&[1, 0, 4, 1])).unwrap();
        assert_eq!(Document::parse(&merged).unwrap().page_count(), 5);

        let merged = merge_documents(&sources, None).unwrap();
        assert_eq!(Document::parse(&merged).unwrap().page_count(), 3);

        let merged = merge_documents(&sources, Some(&[])).unwrap();
        assert_eq!(Document::parse(&merged).unwrap().page_count(), 0);
    }

    #[test]
    fn test_merge_documents_reports_failing_source() {
        let mut good = document_with_pages(1);
        let sources = vec![good.save(&SaveOptions::default()).unwrap(), b"garbage".to_vec()];

        let result = merge_documents(&sources, None);
        assert!(matches!(result, Err(PdfError::SourceParse { index: 1, .. })));

        // An unreferenced bad source is never parsed
        assert!(merge_documents(&sources, Some(&[0])).is_ok());
    }
}
