//! XRef Stream Writer for PDF 1.5+
//!
//! Builds the cross-reference stream (ISO 32000-1:2008 Section 7.5.8) that
//! closes a file written with object streams. Field widths are the smallest
//! that hold every entry.

use crate::error::Result;
use crate::objects::{Dictionary, Object, ObjectId, Stream};

/// Writer for XRef streams
pub struct XRefStreamWriter {
    /// One `[type, field2, field3]` row per object number, starting at 0
    rows: Vec<[u64; 3]>,
    /// Object ID for this XRef stream
    stream_id: ObjectId,
    /// Trailer entries carried by the stream dictionary
    trailer: Dictionary,
}

impl XRefStreamWriter {
    pub fn new(stream_id: ObjectId) -> Self {
        Self {
            rows: Vec::new(),
            stream_id,
            trailer: Dictionary::new(),
        }
    }

    /// Set the trailer entries (Root, and Info and ID when present)
    pub fn set_trailer_info(&mut self, root_id: ObjectId, info_id: Option<ObjectId>, id: Option<Object>) {
        self.trailer.set("Root", root_id);
        if let Some(info_id) = info_id {
            self.trailer.set("Info", info_id);
        }
        if let Some(id) = id {
            self.trailer.set("ID", id);
        }
    }

    pub fn add_free_entry(&mut self, next_free: u32, generation: u16) {
        self.rows.push([0, next_free as u64, generation as u64]);
    }

    pub fn add_in_use_entry(&mut self, offset: u64, generation: u16) {
        self.rows.push([1, offset, generation as u64]);
    }

    pub fn add_compressed_entry(&mut self, stream_object_number: u32, index: u32) {
        self.rows.push([2, stream_object_number as u64, index as u64]);
    }

    /// Calculate minimum bytes needed to represent a value
    fn bytes_needed(value: u64) -> usize {
        if value == 0 {
            1
        } else {
            ((value.ilog2() / 8) + 1) as usize
        }
    }

    /// Smallest widths that hold every row
    pub fn widths(&self) -> [usize; 3] {
        let mut widths = [1, 1, 1];
        for row in &self.rows {
            widths[1] = widths[1].max(Self::bytes_needed(row[1]));
            widths[2] = widths[2].max(Self::bytes_needed(row[2]));
        }
        widths
    }

    /// Encode entries into binary data
    pub fn encode_entries(&self) -> Vec<u8> {
        let widths = self.widths();
        let mut data = Vec::with_capacity(self.rows.len() * widths.iter().sum::<usize>());
        for row in &self.rows {
            for (value, width) in row.iter().zip(widths) {
                Self::write_field(&mut data, *value, width);
            }
        }
        data
    }

    /// Big-endian, `width` bytes
    fn write_field(data: &mut Vec<u8>, value: u64, width: usize) {
        for i in (0..width).rev() {
            data.push(((value >> (i * 8)) & 0xFF) as u8);
        }
    }

    /// Create the XRef stream dictionary. `Index` is left at its default
    /// of `[0 Size]`.
    pub fn create_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("XRef"));
        dict.set("Size", self.rows.len());
        for (key, value) in self.trailer.iter() {
            dict.set(key.clone(), value.clone());
        }
        dict.set(
            "W",
            self.widths()
                .iter()
                .map(|&w| Object::Integer(w as i64))
                .collect::<Vec<_>>(),
        );
        dict
    }

    /// The complete, FlateDecode-compressed XRef stream
    pub fn to_stream(&self) -> Result<Stream> {
        Stream::flate(self.create_dictionary(), &self.encode_entries())
    }

    pub fn entry_count(&self) -> usize {
        self.rows.len()
    }

    pub fn stream_id(&self) -> ObjectId {
        self.stream_id
    }
}
