//! PDF Object Parser
//!
//! Builds [`Object`] values from lexer tokens according to ISO 32000-1
//! Section 7.3, including `N G R` references and indirect objects with
//! stream payloads.

use super::lexer::{is_whitespace, Lexer, Token};
use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId, Stream};

/// Maximum nesting of arrays and dictionaries inside one object
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parse one direct object at the lexer's position
pub fn parse_object(lexer: &mut Lexer<'_>) -> ParseResult<Object> {
    let token = next_significant(lexer)?;
    parse_from_token(lexer, token, 0)
}

/// Parse the object that starts with `token`
pub fn parse_from_token(lexer: &mut Lexer<'_>, token: Token, depth: usize) -> ParseResult<Object> {
    match token {
        Token::Null => Ok(Object::Null),
        Token::Boolean(b) => Ok(Object::Boolean(b)),
        Token::Integer(i) => Ok(maybe_reference(lexer, i)),
        Token::Real(r) => Ok(Object::Real(r)),
        Token::String(s) => Ok(Object::String(s)),
        Token::Name(n) => Ok(Object::Name(n)),
        Token::ArrayStart => parse_array(lexer, depth + 1),
        Token::DictStart => parse_dictionary(lexer, depth + 1).map(Object::Dictionary),
        Token::Eof => Err(ParseError::syntax(lexer.position(), "Unexpected end of file")),
        other => Err(ParseError::UnexpectedToken {
            expected: "PDF object".to_string(),
            found: format!("{other:?}"),
        }),
    }
}

/// `N G R` lookahead after an integer; rewinds when the pattern does not match
fn maybe_reference(lexer: &mut Lexer<'_>, first: i64) -> Object {
    let saved = lexer.position();
    if let (Ok(number), Ok(Token::Integer(generation)), Ok(Token::Keyword(r))) = (
        u32::try_from(first),
        lexer.next_token(),
        lexer.next_token(),
    ) {
        if r == "R" {
            if let Ok(generation) = u16::try_from(generation) {
                return Object::Reference(ObjectId::new(number, generation));
            }
        }
    }
    lexer.seek(saved);
    Object::Integer(first)
}

fn next_significant(lexer: &mut Lexer<'_>) -> ParseResult<Token> {
    loop {
        match lexer.next_token()? {
            Token::Comment(_) => continue,
            token => return Ok(token),
        }
    }
}

fn check_depth(lexer: &Lexer<'_>, depth: usize) -> ParseResult<()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(ParseError::syntax(
            lexer.position(),
            format!("Maximum nesting depth exceeded (limit: {MAX_NESTING_DEPTH})"),
        ));
    }
    Ok(())
}

fn parse_array(lexer: &mut Lexer<'_>, depth: usize) -> ParseResult<Object> {
    check_depth(lexer, depth)?;
    let mut elements = Vec::new();

    loop {
        match next_significant(lexer)? {
            Token::ArrayEnd => break,
            token => elements.push(parse_from_token(lexer, token, depth)?),
        }
    }

    Ok(Object::Array(elements))
}

/// Parse dictionary entries after the opening `<<`
pub fn parse_dictionary(lexer: &mut Lexer<'_>, depth: usize) -> ParseResult<Dictionary> {
    check_depth(lexer, depth)?;
    let mut dict = Dictionary::new();

    loop {
        match next_significant(lexer)? {
            Token::DictEnd => break,
            Token::Name(key) => {
                let token = next_significant(lexer)?;
                // A key directly followed by >> has no value; treat it as null
                if token == Token::DictEnd {
                    dict.set(key, Object::Null);
                    break;
                }
                let value = parse_from_token(lexer, token, depth)?;
                dict.set(key, value);
            }
            token => {
                return Err(ParseError::UnexpectedToken {
                    expected: "dictionary key (name) or >>".to_string(),
                    found: format!("{token:?}"),
                })
            }
        }
    }

    Ok(dict)
}

/// Parse an `N G obj ... endobj` block starting at the lexer's position.
///
/// `resolve_length` is asked for the value of an indirect `/Length`. When the
/// declared length is missing or does not land on `endstream`, the payload
/// runs up to the next `endstream` keyword instead.
pub fn parse_indirect_object(
    lexer: &mut Lexer<'_>,
    resolve_length: &dyn Fn(ObjectId) -> Option<i64>,
) -> ParseResult<(ObjectId, Object)> {
    let id = parse_object_header(lexer)?;

    let token = next_significant(lexer)?;
    let object = match token {
        // An empty object body reads as null
        Token::EndObj => return Ok((id, Object::Null)),
        token => parse_from_token(lexer, token, 0)?,
    };

    let object = match object {
        Object::Dictionary(dict) => match next_significant(lexer)? {
            Token::Stream => {
                let data = read_stream_data(lexer, &dict, resolve_length)?;
                Object::Stream(Stream::with_dictionary(dict, data))
            }
            _ => Object::Dictionary(dict),
        },
        other => other,
    };

    Ok((id, object))
}

/// Parse `N G obj`
pub fn parse_object_header(lexer: &mut Lexer<'_>) -> ParseResult<ObjectId> {
    let number = match next_significant(lexer)? {
        Token::Integer(n) if n >= 0 && n <= u32::MAX as i64 => n as u32,
        other => {
            return Err(ParseError::UnexpectedToken {
                expected: "object number".to_string(),
                found: format!("{other:?}"),
            })
        }
    };
    let generation = match lexer.next_token()? {
        Token::Integer(g) if g >= 0 && g <= u16::MAX as i64 => g as u16,
        other => {
            return Err(ParseError::UnexpectedToken {
                expected: "generation number".to_string(),
                found: format!("{other:?}"),
            })
        }
    };
    lexer.expect_keyword("obj")?;
    Ok(ObjectId::new(number, generation))
}

fn read_stream_data(
    lexer: &mut Lexer<'_>,
    dict: &Dictionary,
    resolve_length: &dyn Fn(ObjectId) -> Option<i64>,
) -> ParseResult<Vec<u8>> {
    lexer.skip_stream_eol();
    let start = lexer.position();

    let declared = match dict.get("Length") {
        Some(Object::Integer(len)) => Some(*len),
        Some(Object::Reference(id)) => resolve_length(*id),
        _ => None,
    };

    if let Some(len) = declared.and_then(|len| usize::try_from(len).ok()) {
        if let Ok(bytes) = lexer.read_bytes(len) {
            lexer.skip_whitespace();
            if lexer.data()[lexer.position()..].starts_with(b"endstream") {
                lexer.expect_keyword("endstream")?;
                return Ok(bytes.to_vec());
            }
        }
        tracing::debug!(
            "Stream /Length {} at offset {} is wrong, scanning for endstream",
            len,
            start
        );
        lexer.seek(start);
    }

    let end = lexer
        .find_ahead(b"endstream")
        .ok_or(ParseError::TruncatedStream(start))?;

    let data = lexer.data();
    let mut data_end = end;
    // The EOL before endstream belongs to the keyword, not the payload
    if data_end > start && data[data_end - 1] == b'\n' {
        data_end -= 1;
    }
    if data_end > start && data[data_end - 1] == b'\r' {
        data_end -= 1;
    }

    lexer.seek(end);
    lexer.expect_keyword("endstream")?;
    Ok(data[start..data_end].to_vec())
}

/// Whether the bytes at `position` look like the start of `N G obj`
pub fn looks_like_object_header(data: &[u8], position: usize) -> bool {
    let mut lexer = Lexer::at(data, position);
    matches!(
        (lexer.next_token(), lexer.next_token(), lexer.next_token()),
        (Ok(Token::Integer(_)), Ok(Token::Integer(_)), Ok(Token::Obj))
    )
}

/// Skip leading whitespace and comments, returning the new position
pub fn skip_filler(data: &[u8], mut position: usize) -> usize {
    while position < data.len() {
        if is_whitespace(data[position]) {
            position += 1;
        } else if data[position] == b'%' {
            while position < data.len() && data[position] != b'\n' && data[position] != b'\r' {
                position += 1;
            }
        } else {
            break;
        }
    }
    position
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(input: &[u8]) -> ParseResult<Object> {
        parse_object(&mut Lexer::new(input))
    }

    fn no_lengths(_: ObjectId) -> Option<i64> {
        None
    }

    #[test]
    fn test_parse_primitives() {
        assert_eq!(parse(b"null").unwrap(), Object::Null);
        assert_eq!(parse(b"true").unwrap(), Object::Boolean(true));
        assert_eq!(parse(b"42").unwrap(), Object::Integer(42));
        assert_eq!(parse(b"-1.5").unwrap(), Object::Real(-1.5));
        assert_eq!(parse(b"(text)").unwrap(), Object::String(b"text".to_vec()));
        assert_eq!(parse(b"/Type").unwrap(), Object::name("Type"));
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(
            parse(b"12 0 R").unwrap(),
            Object::Reference(ObjectId::new(12, 0))
        );
    }

    #[test]
    fn test_integers_that_are_not_references() {
        assert_eq!(
            parse(b"[1 2 3 0 R 4]").unwrap(),
            Object::Array(vec![
                Object::Integer(1),
                Object::Integer(2),
                Object::Reference(ObjectId::new(3, 0)),
                Object::Integer(4),
            ])
        );
        assert_eq!(
            parse(b"[0 0 612 792]").unwrap(),
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ])
        );
    }

    #[test]
    fn test_parse_nested_dictionary() {
        let obj = parse(b"<< /Type /Page /Resources << /Font << /F1 5 0 R >> >> % note\n /Rotate 90 >>")
            .unwrap();
        let dict = obj.as_dict().unwrap();

        assert_eq!(dict.get_type(), Some("Page"));
        assert_eq!(dict.get("Rotate"), Some(&Object::Integer(90)));
        let font = dict
            .get_dict("Resources")
            .and_then(|res| res.get_dict("Font"))
            .unwrap();
        assert_eq!(font.get("F1"), Some(&Object::Reference(ObjectId::new(5, 0))));
    }

    #[test]
    fn test_dictionary_key_without_value() {
        let obj = parse(b"<< /A 1 /B >>").unwrap();
        assert_eq!(obj.as_dict().unwrap().get("B"), Some(&Object::Null));
    }

    #[test]
    fn test_nesting_depth_limit() {
        let mut deep = Vec::new();
        deep.extend(std::iter::repeat(b'[').take(MAX_NESTING_DEPTH + 10));
        deep.extend(std::iter::repeat(b']').take(MAX_NESTING_DEPTH + 10));
        assert!(parse(&deep).is_err());

        let mut ok = Vec::new();
        ok.extend(std::iter::repeat(b'[').take(10));
        ok.extend(std::iter::repeat(b']').take(10));
        assert!(parse(&ok).is_ok());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(b"").is_err());
        assert!(parse(b"<< 1 2 >>").is_err());
        assert!(parse(b"[1 2").is_err());
        assert!(parse(b"]").is_err());
    }

    #[test]
    fn test_indirect_object() {
        let input = b"7 0 obj\n<< /Type /Font >>\nendobj\n";
        let (id, obj) = parse_indirect_object(&mut Lexer::new(input), &no_lengths).unwrap();
        assert_eq!(id, ObjectId::new(7, 0));
        assert_eq!(obj.as_dict().unwrap().get_type(), Some("Font"));
    }

    #[test]
    fn test_indirect_stream_with_direct_length() {
        let input = b"4 0 obj\n<< /Length 5 >>\nstream\r\nhello\r\nendstream\nendobj";
        let (_, obj) = parse_indirect_object(&mut Lexer::new(input), &no_lengths).unwrap();
        let stream = obj.as_stream().unwrap();
        assert_eq!(stream.data(), b"hello");
    }

    #[test]
    fn test_indirect_stream_with_indirect_length() {
        let input = b"4 0 obj\n<< /Length 9 0 R >>\nstream\nhello world\nendstream\nendobj";
        let resolve = |id: ObjectId| (id == ObjectId::new(9, 0)).then_some(11i64);
        let (_, obj) = parse_indirect_object(&mut Lexer::new(input), &resolve).unwrap();
        let stream = obj.as_stream().unwrap();
        assert_eq!(stream.data(), b"hello world");
        assert_eq!(stream.dictionary().get("Length"), Some(&Object::Integer(11)));
    }

    #[test]
    fn test_stream_with_wrong_length_falls_back_to_scan() {
        let input = b"4 0 obj\n<< /Length 2 >>\nstream\nabcdef\nendstream\nendobj";
        let (_, obj) = parse_indirect_object(&mut Lexer::new(input), &no_lengths).unwrap();
        assert_eq!(obj.as_stream().unwrap().data(), b"abcdef");

        let input = b"4 0 obj\n<< >>\nstream\nxyz\r\nendstream\nendobj";
        let (_, obj) = parse_indirect_object(&mut Lexer::new(input), &no_lengths).unwrap();
        assert_eq!(obj.as_stream().unwrap().data(), b"xyz");
    }

    #[test]
    fn test_truncated_stream() {
        let input = b"4 0 obj\n<< /Length 100 >>\nstream\nabc";
        let result = parse_indirect_object(&mut Lexer::new(input), &no_lengths);
        assert!(matches!(result, Err(ParseError::TruncatedStream(_))));
    }

    #[test]
    fn test_object_header_helpers() {
        let data = b"%c\n 3 0 obj null endobj";
        let pos = skip_filler(data, 0);
        assert_eq!(pos, 4);
        assert!(looks_like_object_header(data, pos));
        assert!(!looks_like_object_header(b"trailer", 0));
    }
}
