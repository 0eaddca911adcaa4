//! Single-pass JSON parser with a heap frame stack.
//!
//! Open containers live in a `Vec<Frame>`, never on the call stack. A
//! container that closes right after it opens (`{}` or `[]`) is produced as a
//! leaf without a frame. Every byte is looked at once, so the cost is linear
//! in the input size regardless of shape.

use crate::config::ParserConfig;
use crate::document::Document;
use crate::error::{ParseError, ParseErrorKind};

/// An open container and the children collected so far.
enum Frame {
    Object {
        members: Vec<(String, Document)>,
        key: String,
    },
    Array {
        items: Vec<Document>,
    },
}

/// Parse a complete JSON document.
///
/// # Errors
///
/// Returns a [`ParseError`] naming the first fault and its byte offset. The
/// parse stops at the first fault.
///
/// ```
/// use dynagate_json::{ParseErrorKind, ParserConfig, parse};
///
/// let err = parse(br#"{"a":[1,2"#, &ParserConfig::default()).unwrap_err();
/// assert_eq!(err.kind, ParseErrorKind::UnexpectedEof);
/// assert_eq!(err.offset, 9);
/// ```
pub fn parse(input: &[u8], config: &ParserConfig) -> Result<Document, ParseError> {
    Parser {
        input,
        pos: 0,
        max_depth: config.max_depth,
        stack: Vec::new(),
    }
    .run()
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    max_depth: usize,
    stack: Vec<Frame>,
}

impl Parser<'_> {
    fn run(mut self) -> Result<Document, ParseError> {
        self.skip_whitespace();
        if self.pos == self.input.len() {
            return Err(self.error(ParseErrorKind::EmptyInput));
        }

        loop {
            let Some(mut completed) = self.parse_value()? else {
                // A container was opened; its first child comes next.
                continue;
            };

            loop {
                match self.stack.last_mut() {
                    None => {
                        self.skip_whitespace();
                        if self.pos < self.input.len() {
                            return Err(self.error(ParseErrorKind::TrailingCharacters));
                        }
                        return Ok(completed);
                    }
                    Some(Frame::Array { items }) => items.push(completed),
                    Some(Frame::Object { members, key }) => {
                        members.push((std::mem::take(key), completed));
                    }
                }

                self.skip_whitespace();
                let offset = self.pos;
                let byte = self.next_byte()?;
                let in_object = matches!(self.stack.last(), Some(Frame::Object { .. }));
                let unexpected = ParseError::new(ParseErrorKind::UnexpectedByte(byte), offset);
                match byte {
                    b',' => {
                        if in_object {
                            self.parse_member_key()?;
                        }
                        break;
                    }
                    b']' | b'}' if in_object == (byte == b'}') => {}
                    _ => return Err(unexpected),
                }
                completed = match self.stack.pop() {
                    Some(Frame::Array { items }) => Document::Array(items),
                    Some(Frame::Object { members, .. }) => Document::Object(members),
                    None => return Err(unexpected),
                };
            }
        }
    }

    /// Parse one value. Returns `None` when a non-empty container was opened.
    fn parse_value(&mut self) -> Result<Option<Document>, ParseError> {
        self.skip_whitespace();
        let Some(&byte) = self.input.get(self.pos) else {
            return Err(self.error(ParseErrorKind::UnexpectedEof));
        };

        match byte {
            b'{' | b'[' => {
                if self.stack.len() >= self.max_depth {
                    return Err(self.error(ParseErrorKind::DepthLimitExceeded {
                        max_depth: self.max_depth,
                    }));
                }
                self.pos += 1;
                self.skip_whitespace();
                if byte == b'{' {
                    if self.peek() == Some(b'}') {
                        self.pos += 1;
                        return Ok(Some(Document::Object(Vec::new())));
                    }
                    self.stack.push(Frame::Object {
                        members: Vec::new(),
                        key: String::new(),
                    });
                    self.parse_member_key()?;
                } else {
                    if self.peek() == Some(b']') {
                        self.pos += 1;
                        return Ok(Some(Document::Array(Vec::new())));
                    }
                    self.stack.push(Frame::Array { items: Vec::new() });
                }
                Ok(None)
            }
            b'"' => self.parse_string().map(|s| Some(Document::String(s))),
            b'-' | b'0'..=b'9' => self.parse_number().map(Some),
            b't' => self.parse_literal(b"true", Document::Bool(true)).map(Some),
            b'f' => self.parse_literal(b"false", Document::Bool(false)).map(Some),
            b'n' => self.parse_literal(b"null", Document::Null).map(Some),
            other => Err(self.error(ParseErrorKind::UnexpectedByte(other))),
        }
    }

    /// Parse `"key" :` and store the key in the innermost object frame.
    fn parse_member_key(&mut self) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'"') => {}
            Some(other) => return Err(self.error(ParseErrorKind::UnexpectedByte(other))),
            None => return Err(self.error(ParseErrorKind::UnexpectedEof)),
        }
        let parsed = self.parse_string()?;

        self.skip_whitespace();
        let offset = self.pos;
        match self.next_byte()? {
            b':' => {}
            other => return Err(ParseError::new(ParseErrorKind::UnexpectedByte(other), offset)),
        }

        if let Some(Frame::Object { key, .. }) = self.stack.last_mut() {
            *key = parsed;
        }
        Ok(())
    }

    /// Parse a string starting at the opening quote.
    fn parse_string(&mut self) -> Result<String, ParseError> {
        self.pos += 1;
        let mut out = String::new();

        loop {
            let start = self.pos;
            while let Some(&b) = self.input.get(self.pos) {
                if b == b'"' || b == b'\\' || b < 0x20 {
                    break;
                }
                self.pos += 1;
            }
            if self.pos > start {
                let segment = std::str::from_utf8(&self.input[start..self.pos]).map_err(|e| {
                    ParseError::new(ParseErrorKind::InvalidUtf8, start + e.valid_up_to())
                })?;
                out.push_str(segment);
            }

            let offset = self.pos;
            match self.next_byte()? {
                b'"' => return Ok(out),
                b'\\' => self.parse_escape(&mut out)?,
                _ => {
                    return Err(ParseError::new(
                        ParseErrorKind::ControlCharacterInString,
                        offset,
                    ));
                }
            }
        }
    }

    /// Parse the escape after a backslash and append the decoded character.
    fn parse_escape(&mut self, out: &mut String) -> Result<(), ParseError> {
        let offset = self.pos;
        let decoded = match self.next_byte()? {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => self.parse_unicode_escape(offset - 1)?,
            _ => return Err(ParseError::new(ParseErrorKind::InvalidEscape, offset - 1)),
        };
        out.push(decoded);
        Ok(())
    }

    /// Decode `XXXX` (after `\u`), pairing surrogates when needed.
    fn parse_unicode_escape(&mut self, escape_offset: usize) -> Result<char, ParseError> {
        let invalid = ParseError::new(ParseErrorKind::InvalidUnicodeEscape, escape_offset);
        let high = self.parse_hex4()?.ok_or_else(|| invalid.clone())?;

        let code = match high {
            0xD800..=0xDBFF => {
                if self.input.get(self.pos..self.pos + 2) != Some(b"\\u".as_slice()) {
                    if self.pos + 2 > self.input.len() {
                        return Err(self.eof());
                    }
                    return Err(invalid);
                }
                self.pos += 2;
                let low = self.parse_hex4()?.ok_or_else(|| invalid.clone())?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(invalid);
                }
                0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(low) - 0xDC00)
            }
            0xDC00..=0xDFFF => return Err(invalid),
            _ => u32::from(high),
        };

        char::from_u32(code).ok_or(invalid)
    }

    /// Read four hex digits. `Ok(None)` means a non-hex digit was found.
    fn parse_hex4(&mut self) -> Result<Option<u16>, ParseError> {
        let Some(digits) = self.input.get(self.pos..self.pos + 4) else {
            return Err(self.eof());
        };
        let mut value: u16 = 0;
        for &d in digits {
            let Some(nibble) = char::from(d).to_digit(16) else {
                return Ok(None);
            };
            value = (value << 4) | u16::try_from(nibble).unwrap_or(0);
        }
        self.pos += 4;
        Ok(Some(value))
    }

    /// Parse `-? (0 | [1-9][0-9]*) (. [0-9]+)? ([eE] [+-]? [0-9]+)?`.
    fn parse_number(&mut self) -> Result<Document, ParseError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }

        match self.peek() {
            Some(b'0') => self.pos += 1,
            Some(b'1'..=b'9') => self.skip_digits(),
            _ => return Err(self.number_error()),
        }

        if self.peek() == Some(b'.') {
            self.pos += 1;
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(self.number_error());
            }
            self.skip_digits();
        }

        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(self.number_error());
            }
            self.skip_digits();
        }

        // The matched bytes are ASCII digits and signs.
        let text = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
        Ok(Document::Number(text))
    }

    fn parse_literal(&mut self, literal: &[u8], value: Document) -> Result<Document, ParseError> {
        for &expected in literal {
            match self.peek() {
                Some(b) if b == expected => self.pos += 1,
                Some(b) => return Err(self.error(ParseErrorKind::UnexpectedByte(b))),
                None => return Err(self.eof()),
            }
        }
        Ok(value)
    }

    fn skip_digits(&mut self) {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn next_byte(&mut self) -> Result<u8, ParseError> {
        let byte = self.peek().ok_or_else(|| self.eof())?;
        self.pos += 1;
        Ok(byte)
    }

    fn number_error(&self) -> ParseError {
        if self.pos == self.input.len() {
            self.eof()
        } else {
            self.error(ParseErrorKind::InvalidNumber)
        }
    }

    fn eof(&self) -> ParseError {
        ParseError::new(ParseErrorKind::UnexpectedEof, self.input.len())
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gen_json(n: usize) -> String {
        format!("{}{{}}{}", r#"{"":"#.repeat(n), "}".repeat(n))
    }

    fn parse_default(input: &[u8]) -> Result<Document, ParseError> {
        parse(input, &ParserConfig::default())
    }

    fn err_of(input: &[u8]) -> (ParseErrorKind, usize) {
        let err = parse_default(input).unwrap_err();
        (err.kind, err.offset)
    }

    #[test]
    fn test_should_parse_dynamodb_request() {
        let body = br#"{
            "TableName": "users",
            "Item": {"id": {"S": "42"}, "score": {"N": "1.50"}, "tags": {"L": [{"BOOL": true}, {"NULL": true}]}},
            "ReturnValues": "NONE"
        }"#;
        let doc = parse_default(body).unwrap();

        assert_eq!(doc.get("TableName").and_then(Document::as_str), Some("users"));
        let item = doc.get("Item").unwrap();
        assert_eq!(
            item.get("score").and_then(|s| s.get("N")).and_then(Document::as_str),
            Some("1.50")
        );
        assert_eq!(
            item.get("tags")
                .and_then(|t| t.get("L"))
                .and_then(Document::as_array)
                .map(<[Document]>::len),
            Some(2)
        );
    }

    #[test]
    fn test_should_agree_with_serde_json_on_shallow_input() {
        let body = r#"{"a":[1,-2.5e3,0.25,true,false,null,"xé😀\n\ud83d\ude00"],"b":{},"c":[]}"#
            .as_bytes();
        let doc = parse_default(body).unwrap();

        let ours: serde_json::Value = serde_json::from_slice(&doc.to_json_vec()).unwrap();
        let theirs: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(ours, theirs);
    }

    #[test]
    fn test_should_parse_50k_levels_and_write_back_identically() {
        let input = gen_json(50_000);
        let doc = parse_default(input.as_bytes()).unwrap();

        assert_eq!(doc.depth(), 50_001);
        assert_eq!(doc.to_json_string(), input);
        assert_eq!(parse_default(&doc.to_json_vec()).unwrap(), doc);
    }

    #[test]
    fn test_should_parse_200k_levels_and_write_back_identically() {
        let input = gen_json(200_000);
        let doc = parse_default(input.as_bytes()).unwrap();

        assert_eq!(doc.depth(), 200_001);
        assert_eq!(doc.to_json_string(), input);
        assert_eq!(parse_default(&doc.to_json_vec()).unwrap(), doc);
    }

    /// Fastest of three parses; the tree is dropped outside the timed region.
    fn fastest_parse(input: &[u8]) -> std::time::Duration {
        (0..3)
            .map(|_| {
                let start = std::time::Instant::now();
                let doc = parse_default(input).unwrap();
                let elapsed = start.elapsed();
                drop(doc);
                elapsed
            })
            .min()
            .unwrap()
    }

    #[test]
    fn test_should_parse_in_time_linear_in_depth() {
        let small = fastest_parse(gen_json(100_000).as_bytes());
        let large = fastest_parse(gen_json(400_000).as_bytes());

        // Four times the input; quadratic work would take about sixteen times as long.
        assert!(
            large < small * 10,
            "100k levels took {small:?}, 400k levels took {large:?}"
        );
    }

    #[test]
    fn test_should_parse_deep_arrays() {
        let input = format!("{}{}", "[".repeat(100_000), "]".repeat(100_000));
        let doc = parse_default(input.as_bytes()).unwrap();
        assert_eq!(doc.depth(), 100_000);
        assert_eq!(doc.to_json_string(), input);
    }

    #[test]
    fn test_should_enforce_depth_limit_including_empty_containers() {
        let config = ParserConfig::with_max_depth(10);
        assert_eq!(parse(gen_json(9).as_bytes(), &config).unwrap().depth(), 10);

        let err = parse(gen_json(10).as_bytes(), &config).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::DepthLimitExceeded { max_depth: 10 });
        assert_eq!(err.offset, 40);
    }

    #[test]
    fn test_should_report_eof_offset_for_truncated_deep_input() {
        let input = gen_json(50_000);
        let truncated = &input.as_bytes()[..input.len() - 1];
        assert_eq!(
            err_of(truncated),
            (ParseErrorKind::UnexpectedEof, truncated.len())
        );
    }

    #[test]
    fn test_should_fail_every_truncation_of_a_request() {
        let body = br#"{"TableName":"t","Key":{"id":{"S":"a\"b"}},"Limit":10}"#;
        for end in 0..body.len() {
            let err = parse_default(&body[..end]).unwrap_err();
            assert!(err.offset <= end, "offset {} beyond {end}", err.offset);
        }
    }

    #[test]
    fn test_should_reject_empty_input() {
        assert_eq!(err_of(b""), (ParseErrorKind::EmptyInput, 0));
        assert_eq!(err_of(b"  \n"), (ParseErrorKind::EmptyInput, 3));
    }

    #[test]
    fn test_should_reject_trailing_characters() {
        assert_eq!(err_of(b"{} {}"), (ParseErrorKind::TrailingCharacters, 3));
        assert_eq!(err_of(b"truex"), (ParseErrorKind::TrailingCharacters, 4));
        assert!(parse_default(b" {} \r\n").is_ok());
    }

    #[test]
    fn test_should_reject_unexpected_bytes() {
        assert_eq!(err_of(br#"{"a" 1}"#), (ParseErrorKind::UnexpectedByte(b'1'), 5));
        assert_eq!(err_of(b"[1 2]"), (ParseErrorKind::UnexpectedByte(b'2'), 3));
        assert_eq!(err_of(b"[1,]"), (ParseErrorKind::UnexpectedByte(b']'), 3));
        assert_eq!(err_of(b"{1:2}"), (ParseErrorKind::UnexpectedByte(b'1'), 1));
        assert_eq!(err_of(b"[}"), (ParseErrorKind::UnexpectedByte(b'}'), 1));
        assert_eq!(err_of(b"nul!"), (ParseErrorKind::UnexpectedByte(b'!'), 3));
    }

    #[test]
    fn test_should_reject_invalid_numbers() {
        assert_eq!(err_of(b"01"), (ParseErrorKind::TrailingCharacters, 1));
        assert_eq!(err_of(b"-x"), (ParseErrorKind::InvalidNumber, 1));
        assert_eq!(err_of(b"[1.]"), (ParseErrorKind::InvalidNumber, 3));
        assert_eq!(err_of(b"[1e+]"), (ParseErrorKind::InvalidNumber, 4));
        assert_eq!(err_of(b"-"), (ParseErrorKind::UnexpectedEof, 1));
    }

    #[test]
    fn test_should_keep_number_text_verbatim() {
        let doc = parse_default(b"[12345678901234567890123, -0.000, 1E5]").unwrap();
        let numbers: Vec<&str> = doc
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Document::as_number)
            .collect();
        assert_eq!(numbers, ["12345678901234567890123", "-0.000", "1E5"]);
    }

    #[test]
    fn test_should_reject_bad_strings() {
        assert_eq!(err_of(br#""\x""#), (ParseErrorKind::InvalidEscape, 1));
        assert_eq!(err_of(br#""\u12g4""#), (ParseErrorKind::InvalidUnicodeEscape, 1));
        assert_eq!(err_of(br#""\udc00""#), (ParseErrorKind::InvalidUnicodeEscape, 1));
        assert_eq!(err_of(br#""\ud800x""#), (ParseErrorKind::InvalidUnicodeEscape, 1));
        assert_eq!(err_of(b"\"a\nb\""), (ParseErrorKind::ControlCharacterInString, 2));
        assert_eq!(err_of(b"\"ab\xffcd\""), (ParseErrorKind::InvalidUtf8, 3));
        assert_eq!(err_of(br#""\u00"#), (ParseErrorKind::UnexpectedEof, 5));
    }

    #[test]
    fn test_should_keep_duplicate_keys_in_order() {
        let doc = parse_default(br#"{"k":1,"k":2}"#).unwrap();
        assert_eq!(doc.as_object().unwrap().len(), 2);
        assert_eq!(doc.to_json_string(), r#"{"k":1,"k":2}"#);
    }
}
