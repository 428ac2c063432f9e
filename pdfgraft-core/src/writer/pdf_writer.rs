use super::XRefStreamWriter;
use crate::document::{Document, SaveOptions, DESCRIPTIVE_INFO_KEYS};
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId, Stream};
use crate::parser::PdfVersion;
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use std::collections::HashMap;
use std::io::Write;

/// Output representation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// Pack non-stream objects into object streams and end the file with
    /// an xref stream instead of a classic table
    pub use_object_streams: bool,
    pub objects_per_stream: usize,
    /// Blank the descriptive Info entries
    pub strip_metadata: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig::from(&SaveOptions::default())
    }
}

impl From<&SaveOptions> for WriterConfig {
    fn from(options: &SaveOptions) -> Self {
        Self {
            use_object_streams: options.use_object_streams,
            objects_per_stream: options.objects_per_stream.max(1),
            strip_metadata: options.strip_metadata,
        }
    }
}

/// The reachable part of a document, renumbered for output. Object `i` of
/// `objects` is written as number `i + 1`.
struct OutputGraph {
    objects: Vec<Object>,
    root: ObjectId,
    info: Option<ObjectId>,
    id: Option<Object>,
}

pub struct PdfWriter<W: Write> {
    writer: W,
    config: WriterConfig,
    xref_positions: HashMap<u32, u64>,
    current_position: u64,
}

impl<W: Write> PdfWriter<W> {
    pub fn new_with_writer(writer: W, config: WriterConfig) -> Self {
        Self {
            writer,
            config,
            xref_positions: HashMap::new(),
            current_position: 0,
        }
    }

    pub fn write_document(&mut self, document: &mut Document) -> Result<()> {
        let mut graph = collect_reachable(document)?;
        if self.config.strip_metadata {
            strip_info(&mut graph);
        }

        let mut version = document.version();
        if self.config.use_object_streams {
            version = version.max(PdfVersion::new(1, 5));
        }

        self.write_header(version)?;
        if self.config.use_object_streams {
            self.write_compact(graph)?;
        } else {
            self.write_classic(graph)?;
        }

        self.writer.flush()?;
        Ok(())
    }

    fn write_header(&mut self, version: PdfVersion) -> Result<()> {
        self.write_bytes(format!("%PDF-{version}\n").as_bytes())?;
        // Binary comment to ensure file is treated as binary
        self.write_bytes(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n'])?;
        Ok(())
    }

    fn write_classic(&mut self, graph: OutputGraph) -> Result<()> {
        let size = graph.objects.len() as u32 + 1;
        for (index, object) in graph.objects.iter().enumerate() {
            self.write_object(ObjectId::new(index as u32 + 1, 0), object)?;
        }

        let xref_position = self.current_position;
        self.write_xref(size)?;

        let mut trailer = Dictionary::new();
        trailer.set("Size", size as i64);
        trailer.set("Root", graph.root);
        if let Some(info) = graph.info {
            trailer.set("Info", info);
        }
        if let Some(id) = graph.id {
            trailer.set("ID", id);
        }

        self.write_bytes(b"trailer\n")?;
        self.write_value(&Object::Dictionary(trailer))?;
        self.write_bytes(format!("\nstartxref\n{xref_position}\n%%EOF\n").as_bytes())?;
        Ok(())
    }

    /// Streams are written directly, everything else is packed into
    /// object streams. An xref stream closes the file.
    fn write_compact(&mut self, graph: OutputGraph) -> Result<()> {
        let count = graph.objects.len() as u32;
        let mut compressed: HashMap<u32, (u32, u32)> = HashMap::new();
        let mut packed: Vec<(u32, &Object)> = Vec::new();

        for (index, object) in graph.objects.iter().enumerate() {
            let number = index as u32 + 1;
            match object {
                Object::Stream(_) => self.write_object(ObjectId::new(number, 0), object)?,
                _ => packed.push((number, object)),
            }
        }

        let mut next_number = count + 1;
        for chunk in packed.chunks(self.config.objects_per_stream) {
            let stream_number = next_number;
            next_number += 1;

            let stream = build_object_stream(chunk)?;
            for (index, (number, _)) in chunk.iter().enumerate() {
                compressed.insert(*number, (stream_number, index as u32));
            }
            self.write_object(ObjectId::new(stream_number, 0), &Object::Stream(stream))?;
        }

        let xref_id = ObjectId::new(next_number, 0);
        let xref_position = self.current_position;
        self.xref_positions.insert(xref_id.number(), xref_position);

        let mut xref = XRefStreamWriter::new(xref_id);
        xref.set_trailer_info(graph.root, graph.info, graph.id);
        xref.add_free_entry(0, 65535);
        for number in 1..=xref_id.number() {
            match (compressed.get(&number), self.xref_positions.get(&number)) {
                (Some(&(stream, index)), _) => xref.add_compressed_entry(stream, index),
                (None, Some(&offset)) => xref.add_in_use_entry(offset, 0),
                (None, None) => xref.add_free_entry(0, 0),
            }
        }

        let stream = xref.to_stream()?;
        self.write_object(xref.stream_id(), &Object::Stream(stream))?;
        self.write_bytes(format!("startxref\n{xref_position}\n%%EOF\n").as_bytes())?;
        Ok(())
    }

    fn write_object(&mut self, id: ObjectId, object: &Object) -> Result<()> {
        self.xref_positions.insert(id.number(), self.current_position);

        let header = format!("{} {} obj\n", id.number(), id.generation());
        self.write_bytes(header.as_bytes())?;
        self.write_value(object)?;
        self.write_bytes(b"\nendobj\n")?;
        Ok(())
    }

    fn write_value(&mut self, object: &Object) -> Result<()> {
        let mut buffer = Vec::new();
        serialize_value(&mut buffer, object);
        self.write_bytes(&buffer)
    }

    fn write_xref(&mut self, size: u32) -> Result<()> {
        self.write_bytes(format!("xref\n0 {size}\n").as_bytes())?;
        self.write_bytes(b"0000000000 65535 f \n")?;

        for number in 1..size {
            match self.xref_positions.get(&number) {
                Some(position) => {
                    let entry = format!("{position:010} 00000 n \n");
                    self.write_bytes(entry.as_bytes())?;
                }
                None => self.write_bytes(b"0000000000 00000 f \n")?,
            }
        }
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.current_position += data.len() as u64;
        Ok(())
    }
}

/// Walks the graph from the catalog and the Info dictionary, numbering
/// objects in discovery order.
///
/// A reference that does not resolve is read as null when the document
/// was parsed. In a document built in memory it is a bug and fails the save.
fn collect_reachable(document: &mut Document) -> Result<OutputGraph> {
    let root = match document.trailer().get("Root") {
        Some(Object::Reference(id)) => *id,
        Some(other) => {
            return Err(PdfError::Serialization(format!(
                "trailer Root must be a reference, found {}",
                other.type_name()
            )))
        }
        None => return Err(PdfError::Serialization("trailer has no Root".to_string())),
    };
    let info = document.trailer().get("Info").and_then(|obj| obj.as_reference());
    let id = document
        .trailer()
        .get("ID")
        .filter(|obj| matches!(obj, Object::Array(_)))
        .cloned();

    let mut discovered: IndexSet<ObjectId> = IndexSet::new();
    discovered.insert(root);
    discovered.extend(info);

    let mut loaded: HashMap<ObjectId, Object> = HashMap::new();
    let mut cursor = 0;
    while let Some(&current) = discovered.get_index(cursor) {
        cursor += 1;

        let Some(object) = document.get_object(current)?.cloned() else {
            if current == root {
                return Err(PdfError::Serialization(format!(
                    "catalog {root} does not exist"
                )));
            }
            if !document.is_parsed() {
                return Err(PdfError::Serialization(format!(
                    "reference to absent object {current}"
                )));
            }
            tracing::debug!("Dangling reference {} written as null", current);
            continue;
        };

        discovered.extend(object.references());
        loaded.insert(current, object);
    }

    let mut renumber: HashMap<ObjectId, ObjectId> = HashMap::with_capacity(loaded.len());
    for old in discovered.iter().filter(|old| loaded.contains_key(old)) {
        let new = ObjectId::new(renumber.len() as u32 + 1, 0);
        renumber.insert(*old, new);
    }

    let mut objects = Vec::with_capacity(renumber.len());
    for old in discovered.iter() {
        let Some(mut object) = loaded.remove(old) else {
            continue;
        };
        object.rewrite_references(&mut |target| match renumber.get(&target) {
            Some(&new) => Object::Reference(new),
            None => Object::Null,
        });
        objects.push(object);
    }

    let root = renumber
        .get(&root)
        .copied()
        .ok_or_else(|| PdfError::Serialization(format!("catalog {root} was not collected")))?;
    Ok(OutputGraph {
        objects,
        root,
        info: info.and_then(|info| renumber.get(&info).copied()),
        id,
    })
}

/// Blanks the descriptive Info entries, creating the Info dictionary if
/// the document has none
fn strip_info(graph: &mut OutputGraph) {
    let info = match graph.info {
        Some(info) => info,
        None => {
            graph.objects.push(Object::Dictionary(Dictionary::new()));
            let id = ObjectId::new(graph.objects.len() as u32, 0);
            graph.info = Some(id);
            id
        }
    };

    let slot = &mut graph.objects[info.number() as usize - 1];
    if !matches!(slot, Object::Dictionary(_)) {
        *slot = Object::Dictionary(Dictionary::new());
    }
    if let Object::Dictionary(dict) = slot {
        for key in DESCRIPTIVE_INFO_KEYS {
            dict.set(key, Object::String(Vec::new()));
        }
    }
}

/// Packs `(number, object)` pairs into one FlateDecode object stream
fn build_object_stream(chunk: &[(u32, &Object)]) -> Result<Stream> {
    let mut header = Vec::new();
    let mut body = Vec::new();
    for (number, object) in chunk {
        if !body.is_empty() {
            body.push(b'\n');
        }
        header.extend_from_slice(format!("{} {} ", number, body.len()).as_bytes());
        serialize_value(&mut body, object);
    }
    header.push(b'\n');

    let mut dict = Dictionary::new();
    dict.set("Type", Object::name("ObjStm"));
    dict.set("N", chunk.len());
    dict.set("First", header.len());

    header.extend_from_slice(&body);
    Stream::flate(dict, &header)
}

/// Appends the PDF syntax for `object` to `out`
pub(crate) fn serialize_value(out: &mut Vec<u8>, object: &Object) {
    match object {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Object::Real(f) => out.extend_from_slice(format_real(*f).as_bytes()),
        Object::String(s) => serialize_string(out, s),
        Object::Name(n) => serialize_name(out, n),
        Object::Array(arr) => {
            out.push(b'[');
            for (i, obj) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                serialize_value(out, obj);
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => serialize_dictionary(out, dict),
        Object::Stream(stream) => {
            let mut dict = stream.dictionary().clone();
            dict.set("Length", stream.data().len());
            serialize_dictionary(out, &dict);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(stream.data());
            out.extend_from_slice(b"\nendstream");
        }
        Object::Reference(id) => {
            out.extend_from_slice(format!("{} {} R", id.number(), id.generation()).as_bytes())
        }
    }
}

fn serialize_dictionary(out: &mut Vec<u8>, dict: &Dictionary) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict.iter() {
        out.push(b' ');
        serialize_name(out, key);
        out.push(b' ');
        serialize_value(out, value);
    }
    out.extend_from_slice(b" >>");
}

/// Reals keep at most six decimals, without trailing zeros
fn format_real(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let formatted = format!("{value:.6}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Literal string when printable, hex string otherwise
fn serialize_string(out: &mut Vec<u8>, bytes: &[u8]) {
    let printable = bytes
        .iter()
        .all(|&b| (0x20..0x7F).contains(&b) || matches!(b, b'\n' | b'\r' | b'\t'));

    if printable {
        out.push(b'(');
        for &b in bytes {
            match b {
                b'(' | b')' | b'\\' => out.extend_from_slice(&[b'\\', b]),
                b'\n' => out.extend_from_slice(b"\\n"),
                b'\r' => out.extend_from_slice(b"\\r"),
                b'\t' => out.extend_from_slice(b"\\t"),
                _ => out.push(b),
            }
        }
        out.push(b')');
    } else {
        out.push(b'<');
        for &b in bytes {
            out.extend_from_slice(format!("{b:02X}").as_bytes());
        }
        out.push(b'>');
    }
}

/// Names hold one character per byte; anything outside the regular
/// printable range is written as `#xx`
fn serialize_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for ch in name.chars() {
        let mut utf8 = [0u8; 4];
        let bytes: &[u8] = if (ch as u32) < 0x100 {
            utf8[0] = ch as u8;
            &utf8[..1]
        } else {
            ch.encode_utf8(&mut utf8).as_bytes()
        };
        for &b in bytes {
            let regular = (0x21..0x7F).contains(&b)
                && !matches!(
                    b,
                    b'#' | b'/' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'%'
                );
            if regular {
                out.push(b);
            } else {
                out.extend_from_slice(format!("#{b:02X}").as_bytes());
            }
        }
    }
}

/// Format a DateTime as a PDF date string (D:YYYYMMDDHHmmSSOHH'mm)
pub fn format_pdf_date(date: DateTime<Utc>) -> String {
    let formatted = date.format("D:%Y%m%d%H%M%S");

    // For UTC, the offset is always +00'00
    format!("{formatted}+00'00")
}
