use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId};
use crate::parser::encoding::{decode_text, encode_text};
use crate::parser::page_tree::walk_page_tree;
use crate::parser::trailer::PdfTrailer;
use crate::parser::{ParseError, ParseResult, PdfReader, PdfVersion};
use crate::writer::{PdfWriter, WriterConfig};
use std::collections::{BTreeMap, HashSet};

pub use crate::parser::page_tree::PageNode;

/// Info dictionary entries that describe the document
pub const DESCRIPTIVE_INFO_KEYS: [&str; 6] =
    ["Title", "Author", "Subject", "Keywords", "Producer", "Creator"];

/// A PDF document held as a graph of indirect objects.
///
/// A parsed document keeps its source bytes and resolves objects lazily,
/// caching every object it loads. A document built in memory owns all of
/// its objects from the start.
///
/// # Example
///
/// ```rust
/// use pdfgraft::{Document, SaveOptions};
///
/// let mut doc = Document::new();
/// assert_eq!(doc.page_count(), 0);
///
/// let bytes = doc.save(&SaveOptions::default()).unwrap();
/// let reparsed = Document::parse(&bytes).unwrap();
/// assert_eq!(reparsed.page_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    version: PdfVersion,
    trailer: Dictionary,
    objects: BTreeMap<ObjectId, Object>,
    /// References already known not to resolve
    missing: HashSet<ObjectId>,
    pages: Vec<PageNode>,
    pages_root: Option<ObjectId>,
    reader: Option<PdfReader>,
    next_object_number: u32,
}

/// Descriptive metadata read from the Info dictionary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    /// Document title
    pub title: Option<String>,
    /// Document author
    pub author: Option<String>,
    /// Document subject
    pub subject: Option<String>,
    /// Document keywords
    pub keywords: Option<String>,
    /// Software that created the original document
    pub creator: Option<String>,
    /// Software that produced the PDF
    pub producer: Option<String>,
    /// Creation date, as written in the file
    pub creation_date: Option<String>,
    /// Modification date, as written in the file
    pub modification_date: Option<String>,
}

/// Options for [`Document::save`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    /// Blank the descriptive Info entries in the output
    pub strip_metadata: bool,
    /// Pack non-stream objects into object streams and write an xref stream
    pub use_object_streams: bool,
    /// Objects per object stream
    pub objects_per_stream: usize,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            strip_metadata: false,
            use_object_streams: false,
            objects_per_stream: 50,
        }
    }
}

impl SaveOptions {
    pub fn with_strip_metadata(mut self, strip: bool) -> Self {
        self.strip_metadata = strip;
        self
    }

    pub fn with_object_streams(mut self, enabled: bool) -> Self {
        self.use_object_streams = enabled;
        self
    }

    pub fn with_objects_per_stream(mut self, count: usize) -> Self {
        self.objects_per_stream = count.max(1);
        self
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a new empty document: a catalog and an empty page tree.
    pub fn new() -> Self {
        let mut document = Self {
            version: PdfVersion::default(),
            trailer: Dictionary::new(),
            objects: BTreeMap::new(),
            missing: HashSet::new(),
            pages: Vec::new(),
            pages_root: None,
            reader: None,
            next_object_number: 1,
        };

        let mut pages = Dictionary::new();
        pages.set("Type", Object::name("Pages"));
        pages.set("Kids", Vec::<Object>::new());
        pages.set("Count", 0);
        let pages_id = document.add_object(pages);

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::name("Catalog"));
        catalog.set("Pages", pages_id);
        let catalog_id = document.add_object(catalog);

        document.trailer.set("Root", catalog_id);
        document.pages_root = Some(pages_id);
        document
    }

    /// Parses a document from its bytes.
    ///
    /// The header, cross-reference chain, trailer and page tree are read
    /// eagerly. Every other object is loaded on first use.
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        let reader = PdfReader::new(data)?;
        let trailer = PdfTrailer::from_dict(reader.xref().trailer().clone())?;
        let root = trailer.root()?;

        let mut document = Self {
            version: reader.version(),
            next_object_number: reader.xref().max_object_number() + 1,
            trailer: trailer.into_dict(),
            objects: BTreeMap::new(),
            missing: HashSet::new(),
            pages: Vec::new(),
            pages_root: None,
            reader: Some(reader),
        };

        let catalog = match document.get_object(root)? {
            Some(obj) => obj.as_dict().cloned().ok_or_else(|| {
                ParseError::InvalidTrailer(format!("Root {root} is a {}", obj.type_name()))
            })?,
            None => {
                return Err(ParseError::InvalidTrailer(format!(
                    "Root {root} does not exist"
                )))
            }
        };

        // The catalog may declare a later version than the header
        if let Some(version) = catalog
            .get("Version")
            .and_then(|v| v.as_name())
            .and_then(parse_version_name)
        {
            document.version = document.version.max(version);
        }

        let pages_root = match catalog.get("Pages") {
            Some(Object::Reference(id)) => *id,
            Some(other) => {
                return Err(ParseError::SyntaxError {
                    position: 0,
                    message: format!("Catalog /Pages must be a reference, found {}", other.type_name()),
                })
            }
            None => return Err(ParseError::MissingKey("Pages".to_string())),
        };

        let pages = walk_page_tree(pages_root, |id| Ok(document.get_object(id)?.cloned()))?;
        tracing::debug!(
            "Parsed PDF {} with {} pages and {} xref entries",
            document.version,
            pages.len(),
            document.reader.as_ref().map_or(0, |r| r.xref().len())
        );

        document.pages = pages;
        document.pages_root = Some(pages_root);
        Ok(document)
    }

    pub fn version(&self) -> PdfVersion {
        self.version
    }

    pub fn set_version(&mut self, version: PdfVersion) {
        self.version = version;
    }

    /// Whether the document was read from bytes
    pub fn is_parsed(&self) -> bool {
        self.reader.is_some()
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// The catalog reference
    pub fn root(&self) -> Option<ObjectId> {
        self.trailer.get("Root").and_then(|obj| obj.as_reference())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages in reading order
    pub fn pages(&self) -> &[PageNode] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&PageNode> {
        self.pages.get(index)
    }

    /// Number of objects the document holds. For a parsed document this is
    /// the number of in-use xref entries.
    pub fn object_count(&self) -> usize {
        match &self.reader {
            Some(reader) => reader.object_ids().len(),
            None => self.objects.len(),
        }
    }

    /// Resolves `id`, loading it from the source bytes on first use.
    ///
    /// A reference that does not resolve yields `Ok(None)`; an object whose
    /// bytes are corrupt is an error.
    pub fn get_object(&mut self, id: ObjectId) -> ParseResult<Option<&Object>> {
        if !self.objects.contains_key(&id) {
            if self.missing.contains(&id) {
                return Ok(None);
            }
            let loaded = match self.reader.as_mut() {
                Some(reader) => reader.load_object(id)?,
                None => None,
            };
            match loaded {
                Some(object) => {
                    self.objects.insert(id, object);
                }
                None => {
                    self.missing.insert(id);
                    return Ok(None);
                }
            }
        }
        Ok(self.objects.get(&id))
    }

    /// Follows `object` when it is a reference, otherwise returns a copy of it
    pub fn resolve(&mut self, object: &Object) -> ParseResult<Option<Object>> {
        match object {
            Object::Reference(id) => Ok(self.get_object(*id)?.cloned()),
            other => Ok(Some(other.clone())),
        }
    }

    fn get_object_mut(&mut self, id: ObjectId) -> ParseResult<Option<&mut Object>> {
        if self.get_object(id)?.is_none() {
            return Ok(None);
        }
        Ok(self.objects.get_mut(&id))
    }

    /// Allocates a fresh object identity
    pub fn new_object_id(&mut self) -> ObjectId {
        let id = ObjectId::new(self.next_object_number, 0);
        self.next_object_number += 1;
        id
    }

    /// Adds `object` under a fresh identity
    pub fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        let id = self.new_object_id();
        self.set_object(id, object);
        id
    }

    /// Stores `object` under `id`, replacing any previous value
    pub fn set_object(&mut self, id: ObjectId, object: impl Into<Object>) {
        self.missing.remove(&id);
        self.objects.insert(id, object.into());
        if id.number() >= self.next_object_number {
            self.next_object_number = id.number() + 1;
        }
    }

    /// Appends the page object `page_id` to the end of the page tree.
    ///
    /// The page's `Parent` is pointed at the root `Pages` node, which gets
    /// the page in its `Kids` and an updated `Count`.
    pub fn append_page(&mut self, page_id: ObjectId) -> Result<()> {
        let pages_root = self
            .pages_root
            .ok_or_else(|| PdfError::Serialization("document has no page tree".to_string()))?;

        let page_dict = {
            let page = self
                .get_object_mut(page_id)?
                .and_then(|obj| obj.as_dict_mut())
                .ok_or_else(|| {
                    PdfError::Serialization(format!("page {page_id} is not a dictionary"))
                })?;
            page.set("Parent", pages_root);
            page.clone()
        };

        let count = self.pages.len() + 1;
        let root = self
            .get_object_mut(pages_root)?
            .and_then(|obj| obj.as_dict_mut())
            .ok_or_else(|| {
                PdfError::Serialization(format!("page tree root {pages_root} is not a dictionary"))
            })?;
        match root.get_mut("Kids") {
            Some(Object::Array(kids)) => kids.push(Object::Reference(page_id)),
            _ => root.set("Kids", vec![Object::Reference(page_id)]),
        }
        root.set("Count", count);

        self.pages.push(PageNode::new(page_id, page_dict));
        Ok(())
    }

    /// The Info dictionary, when the document has one
    pub fn info(&mut self) -> ParseResult<Option<Dictionary>> {
        let info = match self.trailer.get("Info") {
            Some(Object::Reference(id)) => *id,
            Some(Object::Dictionary(dict)) => return Ok(Some(dict.clone())),
            _ => return Ok(None),
        };
        Ok(self.get_object(info)?.and_then(|obj| obj.as_dict()).cloned())
    }

    /// Replaces the Info dictionary
    pub fn set_info(&mut self, info: Dictionary) {
        match self.trailer.get("Info").and_then(|obj| obj.as_reference()) {
            Some(id) => self.set_object(id, info),
            None => {
                let id = self.add_object(info);
                self.trailer.set("Info", id);
            }
        }
    }

    /// Sets one Info entry to a text string, creating the dictionary if needed
    pub fn set_info_entry(&mut self, key: &str, value: &str) -> ParseResult<()> {
        let mut info = self.info()?.unwrap_or_default();
        info.set(key, Object::String(encode_text(value)));
        self.set_info(info);
        Ok(())
    }

    /// Descriptive metadata from the Info dictionary
    pub fn metadata(&mut self) -> ParseResult<DocumentMetadata> {
        let Some(info) = self.info()? else {
            return Ok(DocumentMetadata::default());
        };

        let text = |key: &str| {
            info.get(key)
                .and_then(|obj| obj.as_string())
                .map(decode_text)
        };
        Ok(DocumentMetadata {
            title: text("Title"),
            author: text("Author"),
            subject: text("Subject"),
            keywords: text("Keywords"),
            creator: text("Creator"),
            producer: text("Producer"),
            creation_date: text("CreationDate"),
            modification_date: text("ModDate"),
        })
    }

    /// Serializes the document.
    ///
    /// Only objects reachable from the catalog and the Info dictionary are
    /// written, renumbered from 1.
    pub fn save(&mut self, options: &SaveOptions) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut writer = PdfWriter::new_with_writer(&mut buffer, WriterConfig::from(options));
        writer.write_document(self)?;
        Ok(buffer)
    }
}

/// `/1.7` style version names used by the catalog's `Version` entry
fn parse_version_name(name: &str) -> Option<PdfVersion> {
    let (major, minor) = name.split_once('.')?;
    Some(PdfVersion::new(major.parse().ok()?, minor.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page_dict() -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Page"));
        dict.set(
            "MediaBox",
            vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
        );
        dict
    }

    #[test]
    fn test_new_document_structure() {
        let mut doc = Document::new();
        assert_eq!(doc.page_count(), 0);
        assert!(!doc.is_parsed());

        let root = doc.root().unwrap();
        let catalog = doc.get_object(root).unwrap().unwrap().as_dict().unwrap().clone();
        assert_eq!(catalog.get_type(), Some("Catalog"));
        let pages = catalog.get("Pages").and_then(|p| p.as_reference()).unwrap();
        let pages = doc.get_object(pages).unwrap().unwrap().as_dict().unwrap();
        assert_eq!(pages.get("Count"), Some(&Object::Integer(0)));
    }

    #[test]
    fn test_object_allocation_is_per_document() {
        let mut a = Document::new();
        let mut b = Document::new();
        assert_eq!(a.new_object_id(), b.new_object_id());

        a.set_object(ObjectId::new(40, 0), Object::Null);
        assert_eq!(a.new_object_id(), ObjectId::new(41, 0));
    }

    #[test]
    fn test_append_page_updates_tree() {
        let mut doc = Document::new();
        let first = doc.add_object(page_dict());
        let second = doc.add_object(page_dict());
        doc.append_page(first).unwrap();
        doc.append_page(second).unwrap();

        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages()[0].id(), first);
        assert_eq!(doc.pages()[1].id(), second);

        let pages_root = doc.pages_root.unwrap();
        let page = doc.get_object(first).unwrap().unwrap().as_dict().unwrap();
        assert_eq!(page.get("Parent"), Some(&Object::Reference(pages_root)));

        let root = doc.get_object(pages_root).unwrap().unwrap().as_dict().unwrap();
        assert_eq!(root.get("Count"), Some(&Object::Integer(2)));
        assert_eq!(
            root.get("Kids"),
            Some(&Object::Array(vec![first.into(), second.into()]))
        );
    }

    #[test]
    fn test_append_non_dictionary_page_fails() {
        let mut doc = Document::new();
        let id = doc.add_object(42);
        assert!(matches!(
            doc.append_page(id),
            Err(PdfError::Serialization(_))
        ));
    }

    #[test]
    fn test_missing_object_reads_as_none() {
        let mut doc = Document::new();
        assert!(doc.get_object(ObjectId::new(99, 0)).unwrap().is_none());
        assert_eq!(
            doc.resolve(&Object::Reference(ObjectId::new(99, 0))).unwrap(),
            None
        );
        assert_eq!(doc.resolve(&Object::Integer(3)).unwrap(), Some(Object::Integer(3)));
    }

    #[test]
    fn test_metadata_round_trip() {
        let mut doc = Document::new();
        assert_eq!(doc.metadata().unwrap(), DocumentMetadata::default());

        doc.set_info_entry("Title", "Quarterly report").unwrap();
        doc.set_info_entry("Author", "Zoë").unwrap();
        let metadata = doc.metadata().unwrap();
        assert_eq!(metadata.title.as_deref(), Some("Quarterly report"));
        assert_eq!(metadata.author.as_deref(), Some("Zoë"));
        assert!(metadata.subject.is_none());
    }

    #[test]
    fn test_save_and_parse_round_trip() {
        let mut doc = Document::new();
        let page = doc.add_object(page_dict());
        doc.append_page(page).unwrap();

        let bytes = doc.save(&SaveOptions::default()).unwrap();
        let reparsed = Document::parse(&bytes).unwrap();
        assert_eq!(reparsed.page_count(), 1);
        assert_eq!(
            reparsed.pages()[0].media_box(),
            Some([0.0, 0.0, 612.0, 792.0])
        );
    }

    #[test]
    fn test_catalog_version_overrides_header() {
        let mut doc = Document::new();
        let root = doc.root().unwrap();
        if let Some(Object::Dictionary(catalog)) = doc.objects.get_mut(&root) {
            catalog.set("Version", Object::name("1.7"));
        }
        doc.set_version(PdfVersion::new(1, 4));

        let bytes = doc.save(&SaveOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
        let reparsed = Document::parse(&bytes).unwrap();
        assert_eq!(reparsed.version(), PdfVersion::new(1, 7));
    }

    #[test]
    fn test_parse_rejects_catalog_without_pages() {
        let mut doc = Document::new();
        let root = doc.root().unwrap();
        if let Some(Object::Dictionary(catalog)) = doc.objects.get_mut(&root) {
            catalog.remove("Pages");
        }
        let bytes = doc.save(&SaveOptions::default()).unwrap();
        assert!(matches!(
            Document::parse(&bytes),
            Err(ParseError::MissingKey(key)) if key == "Pages"
        ));
    }

    #[test]
    fn test_save_options_builders() {
        let options = SaveOptions::default()
            .with_strip_metadata(true)
            .with_object_streams(true)
            .with_objects_per_stream(0);
        assert!(options.strip_metadata);
        assert!(options.use_object_streams);
        assert_eq!(options.objects_per_stream, 1);
    }
}
