//! PDF Header Parser
//!
//! Parses PDF header and version according to ISO 32000-1 Section 7.5.2

use super::lexer::find_subsequence;
use super::{ParseError, ParseResult};

/// How far into the file the `%PDF-` marker may appear
const HEADER_SEARCH_WINDOW: usize = 1024;

/// PDF Version information
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl PdfVersion {
    /// Create a new PDF version
    pub fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Check if this version is supported
    pub fn is_supported(&self) -> bool {
        matches!((self.major, self.minor), (1, 0..=7) | (2, 0))
    }
}

impl Default for PdfVersion {
    fn default() -> Self {
        Self::new(1, 7)
    }
}

impl std::fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// PDF Header information
#[derive(Debug, Clone)]
pub struct PdfHeader {
    pub version: PdfVersion,
    /// Byte offset of `%PDF-`; xref offsets in the file are relative to it
    pub offset: usize,
    pub has_binary_marker: bool,
}

impl PdfHeader {
    /// Parse the PDF header from the start of `data`
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        if data.is_empty() {
            return Err(ParseError::EmptyFile);
        }

        let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
        let offset = find_subsequence(window, b"%PDF-").ok_or(ParseError::InvalidHeader)?;

        let rest = &data[offset + 5..];
        let line_end = rest
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
            .unwrap_or(rest.len());
        let line = String::from_utf8_lossy(&rest[..line_end]);

        let version = Self::parse_version(line.trim())?;
        if !version.is_supported() {
            tracing::warn!("Unusual PDF version {}, continuing", version);
        }

        let has_binary_marker = Self::check_binary_marker(&rest[line_end..]);

        Ok(PdfHeader {
            version,
            offset,
            has_binary_marker,
        })
    }

    fn parse_version(text: &str) -> ParseResult<PdfVersion> {
        // Some writers put the binary comment on the version line
        let text = text.split_whitespace().next().unwrap_or("");
        let (major, minor) = text.split_once('.').ok_or(ParseError::InvalidHeader)?;

        let major = major.parse::<u8>().map_err(|_| ParseError::InvalidHeader)?;
        let minor = minor.parse::<u8>().map_err(|_| ParseError::InvalidHeader)?;

        Ok(PdfVersion::new(major, minor))
    }

    /// A comment line with at least four bytes >= 128 right after the header
    fn check_binary_marker(after_header: &[u8]) -> bool {
        let start = after_header
            .iter()
            .position(|&b| b != b'\n' && b != b'\r')
            .unwrap_or(after_header.len());
        let line = &after_header[start..];

        if line.first() != Some(&b'%') {
            return false;
        }

        line.iter()
            .skip(1)
            .take_while(|&&b| b != b'\n' && b != b'\r')
            .filter(|&&b| b >= 128)
            .count()
            >= 4
    }
}
