//! Text line extraction
//!
//! Pulls the text shown by a page's content streams (ISO 32000-1
//! Section 9.4) in drawing order and breaks it into lines on text
//! positioning operators. Glyph positions are not computed; a line break is
//! any operator that moves to a new line.

use crate::document::Document;
use crate::error::Result;
use crate::objects::{Object, ObjectId};
use crate::parser::encoding::decode_text;
use crate::parser::lexer::{is_whitespace, Lexer, Token};
use crate::parser::ParseResult;

/// `TJ` adjustments at least this large (in thousandths of a text space
/// unit) are read as a word gap
const WORD_GAP: f64 = 200.0;

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Number(f64),
    Text(Vec<u8>),
    Array(Vec<Operand>),
    Other,
}

impl Operand {
    fn number(&self) -> Option<f64> {
        match self {
            Operand::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Collects text into lines
#[derive(Debug, Default)]
struct LineBuilder {
    lines: Vec<String>,
    current: String,
}

impl LineBuilder {
    fn push_text(&mut self, bytes: &[u8]) {
        self.current.push_str(&decode_text(bytes));
    }

    fn push_space(&mut self) {
        if !self.current.is_empty() && !self.current.ends_with(' ') {
            self.current.push(' ');
        }
    }

    fn break_line(&mut self) {
        let line = self.current.trim_end();
        if !line.is_empty() {
            self.lines.push(line.to_string());
        }
        self.current.clear();
    }

    fn finish(mut self) -> Vec<String> {
        self.break_line();
        self.lines
    }
}

/// Text lines of every page in reading order. Pages are separated by an
/// empty line.
pub fn extract_text_lines(document: &mut Document) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for index in 0..document.page_count() {
        let page_lines = extract_page_lines(document, index)?;
        if page_lines.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.extend(page_lines);
    }
    Ok(lines)
}

/// Text lines of the page at 0-based `index`; empty when out of range
pub fn extract_page_lines(document: &mut Document, index: usize) -> Result<Vec<String>> {
    let Some(page) = document.page(index) else {
        return Ok(Vec::new());
    };
    let page_id = page.id();
    let contents = page.contents();

    let mut content = Vec::new();
    for id in contents {
        match content_stream_data(document, id)? {
            Some(data) => {
                content.extend_from_slice(&data);
                content.push(b'\n');
            }
            None => continue,
        }
    }

    match text_lines(&content) {
        Ok(lines) => Ok(lines),
        Err(e) => {
            tracing::warn!("Skipping text of page {}: {}", page_id, e);
            Ok(Vec::new())
        }
    }
}

/// Decoded bytes of one content stream, `None` when it cannot be used
fn content_stream_data(document: &mut Document, id: ObjectId) -> Result<Option<Vec<u8>>> {
    let stream = match document.get_object(id)? {
        Some(Object::Stream(stream)) => stream,
        Some(other) => {
            tracing::warn!("Content {} is a {}, not a stream", id, other.type_name());
            return Ok(None);
        }
        None => return Ok(None),
    };
    match stream.decode() {
        Ok(data) => Ok(Some(data)),
        Err(e) => {
            tracing::warn!("Cannot decode content stream {}: {}", id, e);
            Ok(None)
        }
    }
}

/// Runs the text operators of one content stream
fn text_lines(content: &[u8]) -> ParseResult<Vec<String>> {
    let mut lexer = Lexer::new(content);
    let mut builder = LineBuilder::default();
    let mut operands: Vec<Operand> = Vec::new();
    let mut line_y: Option<f64> = None;

    loop {
        let token = lexer.next_token()?;
        let operator = match token {
            Token::Eof => break,
            Token::Keyword(op) => op,
            Token::ArrayStart => {
                operands.push(read_array(&mut lexer)?);
                continue;
            }
            Token::Comment(_) => continue,
            other => {
                operands.push(operand(other));
                continue;
            }
        };

        match operator.as_str() {
            "Tj" => {
                if let Some(Operand::Text(text)) = operands.last() {
                    builder.push_text(text);
                }
            }
            "'" | "\"" => {
                builder.break_line();
                if let Some(Operand::Text(text)) = operands.last() {
                    builder.push_text(text);
                }
            }
            "TJ" => {
                if let Some(Operand::Array(items)) = operands.last() {
                    for item in items {
                        match item {
                            Operand::Text(text) => builder.push_text(text),
                            Operand::Number(n) if -n >= WORD_GAP => builder.push_space(),
                            _ => {}
                        }
                    }
                }
            }
            "T*" | "ET" => builder.break_line(),
            "BT" => line_y = None,
            "Td" | "TD" => {
                let ty = operands.get(1).and_then(Operand::number).unwrap_or(0.0);
                if ty != 0.0 {
                    builder.break_line();
                } else {
                    builder.push_space();
                }
            }
            "Tm" => {
                let y = operands.get(5).and_then(Operand::number);
                if line_y.is_some() && y != line_y {
                    builder.break_line();
                }
                line_y = y;
            }
            "BI" => skip_inline_image(&mut lexer),
            _ => {}
        }
        operands.clear();
    }

    Ok(builder.finish())
}

fn operand(token: Token) -> Operand {
    match token {
        Token::Integer(i) => Operand::Number(i as f64),
        Token::Real(r) => Operand::Number(r),
        Token::String(s) => Operand::Text(s),
        _ => Operand::Other,
    }
}

fn read_array(lexer: &mut Lexer<'_>) -> ParseResult<Operand> {
    let mut items = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::ArrayEnd | Token::Eof => break,
            Token::ArrayStart => items.push(read_array(lexer)?),
            other => items.push(operand(other)),
        }
    }
    Ok(Operand::Array(items))
}

/// Moves past `ID <binary data> EI`. The data is raw bytes, so the end is
/// found by scanning for `EI` surrounded by whitespace.
fn skip_inline_image(lexer: &mut Lexer<'_>) {
    let data = lexer.data();
    let Some(id) = find_operator(data, lexer.position(), b"ID") else {
        lexer.seek(data.len());
        return;
    };

    // One whitespace byte separates ID from the image data
    let mut position = id + 3;
    while position + 2 <= data.len() {
        if &data[position..position + 2] == b"EI"
            && is_whitespace(data[position - 1])
            && data.get(position + 2).map_or(true, |&b| is_whitespace(b))
        {
            lexer.seek(position + 2);
            return;
        }
        position += 1;
    }
    lexer.seek(data.len());
}

/// Position of `op` as a standalone word at or after `from`
fn find_operator(data: &[u8], from: usize, op: &[u8]) -> Option<usize> {
    let mut position = from;
    while position + op.len() <= data.len() {
        if &data[position..position + op.len()] == op
            && (position == 0 || is_whitespace(data[position - 1]))
            && data.get(position + op.len()).map_or(true, |&b| is_whitespace(b))
        {
            return Some(position);
        }
        position += 1;
    }
    None
}
