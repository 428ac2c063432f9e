//! PDF Lexer
//!
//! Tokenizes PDF syntax according to ISO 32000-1 Section 7.2. The lexer works
//! over an in-memory byte slice so callers can jump to xref offsets and
//! rewind after speculative reads.

use super::{ParseError, ParseResult};

/// PDF Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Boolean: true or false
    Boolean(bool),

    /// Integer number
    Integer(i64),

    /// Real number
    Real(f64),

    /// String (literal or hexadecimal)
    String(Vec<u8>),

    /// Name object (e.g., /Type)
    Name(String),

    /// Left square bracket [
    ArrayStart,

    /// Right square bracket ]
    ArrayEnd,

    /// Dictionary start <<
    DictStart,

    /// Dictionary end >>
    DictEnd,

    /// Stream keyword
    Stream,

    /// Endstream keyword
    EndStream,

    /// Obj keyword
    Obj,

    /// Endobj keyword
    EndObj,

    /// StartXRef keyword
    StartXRef,

    /// Null object
    Null,

    /// Any other bare word: `R`, `xref`, `trailer`, content operators
    Keyword(String),

    /// Comment (usually ignored)
    Comment(Vec<u8>),

    /// End of input
    Eof,
}

/// Whitespace as defined by ISO 32000-1 Table 1
pub fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C' | b'\0')
}

/// Delimiters as defined by ISO 32000-1 Table 2
pub fn is_delimiter(ch: u8) -> bool {
    matches!(
        ch,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// PDF Lexer for tokenizing PDF content
pub struct Lexer<'a> {
    data: &'a [u8],
    position: usize,
    token_buffer: Vec<Token>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    /// Create a new lexer positioned at `position`
    pub fn at(data: &'a [u8], position: usize) -> Self {
        Self {
            data,
            position: position.min(data.len()),
            token_buffer: Vec::new(),
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> ParseResult<Token> {
        if let Some(token) = self.token_buffer.pop() {
            return Ok(token);
        }

        self.skip_whitespace();

        let ch = match self.peek_byte() {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };

        match ch {
            b'%' => Ok(self.read_comment()),
            b'/' => self.read_name(),
            b'(' => self.read_literal_string(),
            b'<' => self.read_angle_bracket(),
            b'>' => {
                self.position += 1;
                if self.peek_byte() == Some(b'>') {
                    self.position += 1;
                    Ok(Token::DictEnd)
                } else {
                    Err(ParseError::syntax(self.position, "Expected '>' after '>'"))
                }
            }
            b'[' => {
                self.position += 1;
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.position += 1;
                Ok(Token::ArrayEnd)
            }
            b'{' | b'}' | b'\'' | b'"' => {
                self.position += 1;
                Ok(Token::Keyword((ch as char).to_string()))
            }
            b'+' | b'-' | b'0'..=b'9' | b'.' => self.read_number(),
            _ if ch.is_ascii_alphabetic() || ch == b'*' => Ok(self.read_keyword()),
            _ => Err(ParseError::syntax(
                self.position,
                format!("Unexpected character: {}", ch as char),
            )),
        }
    }

    /// Peek at the next token without consuming it
    pub fn peek_token(&mut self) -> ParseResult<Token> {
        let token = self.next_token()?;
        self.token_buffer.push(token.clone());
        Ok(token)
    }

    /// Push a token back so the next call to `next_token` returns it
    pub fn push_token(&mut self, token: Token) {
        self.token_buffer.push(token);
    }

    /// Get current byte position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move to an absolute byte position, discarding pushed-back tokens
    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.data.len());
        self.token_buffer.clear();
    }

    /// The underlying input
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    fn next_byte(&mut self) -> Option<u8> {
        let ch = self.peek_byte()?;
        self.position += 1;
        Some(ch)
    }

    /// Skip whitespace and return the number of bytes skipped
    pub fn skip_whitespace(&mut self) -> usize {
        let start = self.position;
        while self.peek_byte().is_some_and(is_whitespace) {
            self.position += 1;
        }
        self.position - start
    }

    /// Read a comment (from % to end of line)
    fn read_comment(&mut self) -> Token {
        self.position += 1;
        let start = self.position;
        while let Some(ch) = self.peek_byte() {
            if ch == b'\n' || ch == b'\r' {
                break;
            }
            self.position += 1;
        }
        Token::Comment(self.data[start..self.position].to_vec())
    }

    /// Read a name object (e.g., /Type). Bytes are kept one char per byte.
    fn read_name(&mut self) -> ParseResult<Token> {
        self.position += 1;
        let mut name = String::new();

        while let Some(ch) = self.peek_byte() {
            if is_whitespace(ch) || is_delimiter(ch) {
                break;
            }
            self.position += 1;

            if ch == b'#' {
                let high = self.next_byte().and_then(super::filters::hex_digit_value);
                let low = self.next_byte().and_then(super::filters::hex_digit_value);
                match (high, low) {
                    (Some(high), Some(low)) => name.push(((high << 4) | low) as char),
                    _ => {
                        return Err(ParseError::syntax(
                            self.position,
                            "Invalid hex code in name",
                        ))
                    }
                }
            } else {
                name.push(ch as char);
            }
        }

        Ok(Token::Name(name))
    }

    /// Read a literal string (parentheses)
    fn read_literal_string(&mut self) -> ParseResult<Token> {
        self.position += 1;
        let mut string = Vec::new();
        let mut paren_depth = 1;

        while paren_depth > 0 {
            let ch = self
                .next_byte()
                .ok_or_else(|| ParseError::syntax(self.position, "Unterminated string"))?;

            match ch {
                b'\\' => {
                    let escaped = self
                        .next_byte()
                        .ok_or_else(|| ParseError::syntax(self.position, "Unterminated string"))?;
                    match escaped {
                        b'n' => string.push(b'\n'),
                        b'r' => string.push(b'\r'),
                        b't' => string.push(b'\t'),
                        b'b' => string.push(b'\x08'),
                        b'f' => string.push(b'\x0C'),
                        b'0'..=b'7' => {
                            let mut value = (escaped - b'0') as u32;
                            for _ in 0..2 {
                                match self.peek_byte() {
                                    Some(next @ b'0'..=b'7') => {
                                        self.position += 1;
                                        value = value * 8 + (next - b'0') as u32;
                                    }
                                    _ => break,
                                }
                            }
                            string.push(value as u8);
                        }
                        // Line continuation
                        b'\r' => {
                            if self.peek_byte() == Some(b'\n') {
                                self.position += 1;
                            }
                        }
                        b'\n' => {}
                        other => string.push(other),
                    }
                }
                b'(' => {
                    paren_depth += 1;
                    string.push(ch);
                }
                b')' => {
                    paren_depth -= 1;
                    if paren_depth > 0 {
                        string.push(ch);
                    }
                }
                _ => string.push(ch),
            }
        }

        Ok(Token::String(string))
    }

    /// Read angle bracket tokens (hex strings or dict markers)
    fn read_angle_bracket(&mut self) -> ParseResult<Token> {
        self.position += 1;

        if self.peek_byte() == Some(b'<') {
            self.position += 1;
            return Ok(Token::DictStart);
        }

        let mut bytes = Vec::new();
        let mut pending: Option<u8> = None;

        loop {
            let ch = self
                .next_byte()
                .ok_or_else(|| ParseError::syntax(self.position, "Unterminated hex string"))?;
            if ch == b'>' {
                break;
            }
            if is_whitespace(ch) {
                continue;
            }
            let value = super::filters::hex_digit_value(ch).ok_or_else(|| {
                ParseError::syntax(self.position, "Invalid character in hex string")
            })?;
            match pending.take() {
                Some(high) => bytes.push((high << 4) | value),
                None => pending = Some(value),
            }
        }

        // Odd number of digits: the last one is padded with 0
        if let Some(high) = pending {
            bytes.push(high << 4);
        }

        Ok(Token::String(bytes))
    }

    /// Read a number (integer or real)
    fn read_number(&mut self) -> ParseResult<Token> {
        let start = self.position;
        let mut has_dot = false;

        if matches!(self.peek_byte(), Some(b'+') | Some(b'-')) {
            self.position += 1;
        }

        while let Some(ch) = self.peek_byte() {
            match ch {
                b'0'..=b'9' => self.position += 1,
                b'.' if !has_dot => {
                    has_dot = true;
                    self.position += 1;
                }
                _ => break,
            }
        }

        let text = std::str::from_utf8(&self.data[start..self.position])
            .map_err(|_| ParseError::syntax(start, "Invalid number"))?;

        if has_dot {
            // Lone signs or dots such as "-." read as zero
            if !text.bytes().any(|b| b.is_ascii_digit()) {
                return Ok(Token::Real(0.0));
            }
            let value = text
                .parse::<f64>()
                .map_err(|_| ParseError::syntax(start, format!("Invalid real number: '{text}'")))?;
            Ok(Token::Real(value))
        } else {
            if !text.bytes().any(|b| b.is_ascii_digit()) {
                return Err(ParseError::syntax(start, "Expected digit after sign"));
            }
            match text.parse::<i64>() {
                Ok(value) => Ok(Token::Integer(value)),
                // Out-of-range integers degrade to reals
                Err(_) => text
                    .parse::<f64>()
                    .map(Token::Real)
                    .map_err(|_| ParseError::syntax(start, format!("Invalid integer: '{text}'"))),
            }
        }
    }

    /// Read a keyword
    fn read_keyword(&mut self) -> Token {
        let word = self.read_word();
        match word.as_str() {
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            "null" => Token::Null,
            "stream" => Token::Stream,
            "endstream" => Token::EndStream,
            "obj" => Token::Obj,
            "endobj" => Token::EndObj,
            "startxref" => Token::StartXRef,
            _ => Token::Keyword(word),
        }
    }

    /// Read a word (sequence of non-delimiter characters)
    fn read_word(&mut self) -> String {
        let start = self.position;
        while let Some(ch) = self.peek_byte() {
            if is_whitespace(ch) || is_delimiter(ch) {
                break;
            }
            self.position += 1;
        }
        self.data[start..self.position]
            .iter()
            .map(|&b| b as char)
            .collect()
    }

    /// Skip the end-of-line marker after the `stream` keyword (CRLF or LF;
    /// a bare CR is tolerated)
    pub fn skip_stream_eol(&mut self) {
        self.token_buffer.clear();
        // Some writers leave spaces between `stream` and the EOL
        while self.peek_byte() == Some(b' ') {
            self.position += 1;
        }
        match self.peek_byte() {
            Some(b'\r') => {
                self.position += 1;
                if self.peek_byte() == Some(b'\n') {
                    self.position += 1;
                }
            }
            Some(b'\n') => self.position += 1,
            _ => {}
        }
    }

    /// Read exactly `n` bytes
    pub fn read_bytes(&mut self, n: usize) -> ParseResult<&'a [u8]> {
        let end = self
            .position
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(ParseError::TruncatedStream(self.position))?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Offset of the next occurrence of `sequence` at or after the current
    /// position, without moving
    pub fn find_ahead(&self, sequence: &[u8]) -> Option<usize> {
        find_subsequence(&self.data[self.position..], sequence).map(|i| self.position + i)
    }

    /// Consume the next token and require it to be the keyword `keyword`
    pub fn expect_keyword(&mut self, keyword: &str) -> ParseResult<()> {
        let token = self.next_token()?;
        let matches = match (&token, keyword) {
            (Token::Keyword(word), _) => word == keyword,
            (Token::Obj, "obj") | (Token::EndObj, "endobj") => true,
            (Token::Stream, "stream") | (Token::EndStream, "endstream") => true,
            (Token::StartXRef, "startxref") => true,
            _ => false,
        };
        if matches {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: keyword.to_string(),
                found: format!("{token:?}"),
            })
        }
    }
}

/// First index of `needle` in `haystack`
pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Last index of `needle` in `haystack`
pub fn rfind_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(input: &[u8]) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            match lexer.next_token().unwrap() {
                Token::Eof => break,
                token => out.push(token),
            }
        }
        out
    }

    #[test]
    fn test_lexer_basic_tokens() {
        assert_eq!(
            tokens(b"true false null 123 -456 3.14 /Name"),
            vec![
                Token::Boolean(true),
                Token::Boolean(false),
                Token::Null,
                Token::Integer(123),
                Token::Integer(-456),
                Token::Real(3.14),
                Token::Name("Name".to_string()),
            ]
        );
    }

    #[test]
    fn test_lexer_real_edge_cases() {
        assert_eq!(
            tokens(b".5 -.25 4. +7"),
            vec![
                Token::Real(0.5),
                Token::Real(-0.25),
                Token::Real(4.0),
                Token::Integer(7),
            ]
        );
    }

    #[test]
    fn test_lexer_strings() {
        assert_eq!(
            tokens(b"(Hello World) <48656C6C6F> <4>"),
            vec![
                Token::String(b"Hello World".to_vec()),
                Token::String(b"Hello".to_vec()),
                Token::String(vec![0x40]),
            ]
        );
    }

    #[test]
    fn test_lexer_string_literal_escapes() {
        assert_eq!(
            tokens(b"(a\\nb\\(c\\)\\\\d\\101\\\nend)"),
            vec![Token::String(b"a\nb(c)\\dAend".to_vec())]
        );
        assert_eq!(
            tokens(b"(outer (inner) text)"),
            vec![Token::String(b"outer (inner) text".to_vec())]
        );
    }

    #[test]
    fn test_lexer_names_with_hex_escapes() {
        assert_eq!(
            tokens(b"/A#20B /Name#2F1"),
            vec![
                Token::Name("A B".to_string()),
                Token::Name("Name/1".to_string()),
            ]
        );
    }

    #[test]
    fn test_lexer_structures() {
        assert_eq!(
            tokens(b"<< /Kids [1 0 R] >>"),
            vec![
                Token::DictStart,
                Token::Name("Kids".to_string()),
                Token::ArrayStart,
                Token::Integer(1),
                Token::Integer(0),
                Token::Keyword("R".to_string()),
                Token::ArrayEnd,
                Token::DictEnd,
            ]
        );
    }

    #[test]
    fn test_lexer_keywords_and_operators() {
        assert_eq!(
            tokens(b"obj endobj stream endstream startxref xref T* ' \""),
            vec![
                Token::Obj,
                Token::EndObj,
                Token::Stream,
                Token::EndStream,
                Token::StartXRef,
                Token::Keyword("xref".to_string()),
                Token::Keyword("T*".to_string()),
                Token::Keyword("'".to_string()),
                Token::Keyword("\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_lexer_comments() {
        assert_eq!(
            tokens(b"%PDF-1.7\n42 % trailing\n"),
            vec![
                Token::Comment(b"PDF-1.7".to_vec()),
                Token::Integer(42),
                Token::Comment(b" trailing".to_vec()),
            ]
        );
    }

    #[test]
    fn test_lexer_errors() {
        assert!(Lexer::new(b"(unterminated").next_token().is_err());
        assert!(Lexer::new(b"<4G>").next_token().is_err());
        assert!(Lexer::new(b"> ").next_token().is_err());
        assert!(Lexer::new(b")").next_token().is_err());
        assert!(Lexer::new(b"- 5").next_token().is_err());
    }

    #[test]
    fn test_peek_and_push_token() {
        let mut lexer = Lexer::new(b"1 2");
        assert_eq!(lexer.peek_token().unwrap(), Token::Integer(1));
        assert_eq!(lexer.next_token().unwrap(), Token::Integer(1));

        let two = lexer.next_token().unwrap();
        lexer.push_token(two.clone());
        assert_eq!(lexer.next_token().unwrap(), two);
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn test_stream_eol_and_read_bytes() {
        let mut lexer = Lexer::new(b"stream\r\nABCDendstream");
        assert_eq!(lexer.next_token().unwrap(), Token::Stream);
        lexer.skip_stream_eol();
        assert_eq!(lexer.read_bytes(4).unwrap(), b"ABCD");
        assert_eq!(lexer.find_ahead(b"endstream"), Some(lexer.position()));
        assert!(lexer.read_bytes(100).is_err());
    }

    #[test]
    fn test_subsequence_search() {
        assert_eq!(find_subsequence(b"abcabc", b"bc"), Some(1));
        assert_eq!(rfind_subsequence(b"abcabc", b"bc"), Some(4));
        assert_eq!(find_subsequence(b"abc", b"xyz"), None);
        assert_eq!(find_subsequence(b"ab", b"abc"), None);
    }
}
