//! Structural compaction
//!
//! Rewrites a document with object streams and an xref stream, drops
//! unreachable objects and blanks the descriptive metadata. Stream payloads
//! are copied as they are.

use crate::document::{Document, SaveOptions};
use crate::error::Result;

/// Options for [`compress_document_with`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressOptions {
    /// Desired output size in bytes. Advisory: it is reported against the
    /// actual size but never enforced.
    pub target_size: Option<u64>,
    /// Objects per object stream
    pub objects_per_stream: usize,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            target_size: None,
            objects_per_stream: SaveOptions::default().objects_per_stream,
        }
    }
}

impl CompressOptions {
    pub fn with_target_size(mut self, bytes: u64) -> Self {
        self.target_size = Some(bytes);
        self
    }

    pub fn with_objects_per_stream(mut self, count: usize) -> Self {
        self.objects_per_stream = count.max(1);
        self
    }
}

/// Compresses with default options
pub fn compress_document(source: &[u8]) -> Result<Vec<u8>> {
    compress_document_with(source, &CompressOptions::default())
}

pub fn compress_document_with(source: &[u8], options: &CompressOptions) -> Result<Vec<u8>> {
    let mut document = Document::parse(source)?;

    let save_options = SaveOptions::default()
        .with_strip_metadata(true)
        .with_object_streams(true)
        .with_objects_per_stream(options.objects_per_stream);
    let output = document.save(&save_options)?;

    match options.target_size {
        Some(target) if output.len() as u64 > target => tracing::info!(
            "Compressed {} bytes to {} bytes, above the requested {} bytes",
            source.len(),
            output.len(),
            target
        ),
        _ => tracing::debug!("Compressed {} bytes to {} bytes", source.len(), output.len()),
    }
    Ok(output)
}
