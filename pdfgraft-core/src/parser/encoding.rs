//! Text string encoding
//!
//! PDF text strings (ISO 32000-1 Section 7.9.2.2) are either UTF-16BE with a
//! leading byte order mark or single-byte strings. Single-byte strings are
//! read as Latin-1, which agrees with PDFDocEncoding on the printable range.

const UTF16BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Decode a text string into a Rust string
pub fn decode_text(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&UTF16BE_BOM) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks(2)
                .map(|pair| match pair {
                    [hi, lo] => u16::from_be_bytes([*hi, *lo]),
                    [hi] => u16::from_be_bytes([*hi, 0]),
                    _ => 0,
                })
                .collect();
            char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
        None => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Encode a Rust string as a text string: Latin-1 when every character
/// fits in one byte, UTF-16BE with a byte order mark otherwise.
pub fn encode_text(text: &str) -> Vec<u8> {
    if text.chars().all(|c| (c as u32) < 0x100) {
        return text.chars().map(|c| c as u8).collect();
    }

    let mut bytes = UTF16BE_BOM.to_vec();
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}
