//! Compact JSON output for [`Document`].

use std::io;
use std::slice;

use crate::document::Document;

/// A container whose children are still being written.
enum Open<'a> {
    Array {
        items: slice::Iter<'a, Document>,
        first: bool,
    },
    Object {
        members: slice::Iter<'a, (String, Document)>,
        first: bool,
    },
}

impl Document {
    /// Serialize to compact JSON.
    ///
    /// ```
    /// use dynagate_json::Document;
    ///
    /// let doc = Document::object([("S", Document::from("a\"b"))]);
    /// assert_eq!(doc.to_json_string(), r#"{"S":"a\"b"}"#);
    /// ```
    #[must_use]
    pub fn to_json_string(&self) -> String {
        let mut out = String::new();
        self.write_compact(&mut out);
        out
    }

    /// Serialize to compact JSON bytes.
    #[must_use]
    pub fn to_json_vec(&self) -> Vec<u8> {
        self.to_json_string().into_bytes()
    }

    /// Serialize to compact JSON and write it to `writer`.
    pub fn write_json<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.to_json_string().as_bytes())
    }

    /// Append compact JSON for `self` to `out`.
    pub fn write_compact(&self, out: &mut String) {
        self.emit(out);
    }

    /// Length in bytes of the compact JSON for `self`, without building it.
    ///
    /// ```
    /// use dynagate_json::Document;
    ///
    /// let doc = Document::object([("S", Document::from("a\"b"))]);
    /// assert_eq!(doc.encoded_len(), doc.to_json_string().len());
    /// ```
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let mut counter = ByteCounter(0);
        self.emit(&mut counter);
        counter.0
    }

    fn emit<S: Sink>(&self, out: &mut S) {
        let mut stack: Vec<Open<'_>> = Vec::new();
        let mut next = Some(self);

        loop {
            if let Some(doc) = next.take() {
                match doc {
                    Document::Null => out.push_str("null"),
                    Document::Bool(true) => out.push_str("true"),
                    Document::Bool(false) => out.push_str("false"),
                    Document::Number(n) => out.push_str(n),
                    Document::String(s) => write_escaped(out, s),
                    Document::Array(items) => {
                        out.push_str("[");
                        stack.push(Open::Array {
                            items: items.iter(),
                            first: true,
                        });
                    }
                    Document::Object(members) => {
                        out.push_str("{");
                        stack.push(Open::Object {
                            members: members.iter(),
                            first: true,
                        });
                    }
                }
            }

            match stack.last_mut() {
                None => break,
                Some(Open::Array { items, first }) => match items.next() {
                    Some(item) => {
                        if !std::mem::replace(first, false) {
                            out.push_str(",");
                        }
                        next = Some(item);
                    }
                    None => {
                        out.push_str("]");
                        stack.pop();
                    }
                },
                Some(Open::Object { members, first }) => match members.next() {
                    Some((key, value)) => {
                        if !std::mem::replace(first, false) {
                            out.push_str(",");
                        }
                        write_escaped(out, key);
                        out.push_str(":");
                        next = Some(value);
                    }
                    None => {
                        out.push_str("}");
                        stack.pop();
                    }
                },
            }
        }
    }
}

/// Destination for compact JSON text.
trait Sink {
    fn push_str(&mut self, s: &str);
}

impl Sink for String {
    fn push_str(&mut self, s: &str) {
        String::push_str(self, s);
    }
}

/// Counts bytes instead of storing them.
struct ByteCounter(usize);

impl Sink for ByteCounter {
    fn push_str(&mut self, s: &str) {
        self.0 += s.len();
    }
}

fn write_escaped<S: Sink>(out: &mut S, s: &str) {
    out.push_str("\"");
    let mut start = 0;
    for (i, b) in s.bytes().enumerate() {
        let escape = match b {
            b'"' => "\\\"",
            b'\\' => "\\\\",
            b'\n' => "\\n",
            b'\r' => "\\r",
            b'\t' => "\\t",
            0x08 => "\\b",
            0x0c => "\\f",
            0x00..=0x1f => "",
            _ => continue,
        };
        out.push_str(&s[start..i]);
        if escape.is_empty() {
            out.push_str(&format!("\\u{b:04x}"));
        } else {
            out.push_str(escape);
        }
        start = i + 1;
    }
    out.push_str(&s[start..]);
    out.push_str("\"");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_write_scalars() {
        assert_eq!(Document::Null.to_json_string(), "null");
        assert_eq!(Document::from(true).to_json_string(), "true");
        assert_eq!(
            Document::Number("-1.5e10".to_owned()).to_json_string(),
            "-1.5e10"
        );
        assert_eq!(Document::from("héllo").to_json_string(), "\"héllo\"");
    }

    #[test]
    fn test_should_escape_control_characters() {
        let doc = Document::from("a\u{1}b\n\"\\");
        assert_eq!(doc.to_json_string(), r#""a\u0001b\n\"\\""#);
    }

    #[test]
    fn test_should_write_containers_with_separators() {
        let doc = Document::object([
            (
                "a",
                Document::from(vec![Document::from(1u64), Document::Null, Document::from(Vec::new())]),
            ),
            ("b", Document::object::<&str>([])),
        ]);
        assert_eq!(doc.to_json_string(), r#"{"a":[1,null,[]],"b":{}}"#);
    }

    #[test]
    fn test_should_match_serde_json_output_for_shallow_documents() {
        let doc = Document::object([
            ("k\u{7f}", Document::from("tab\there")),
            ("n", Document::from(-3i64)),
        ]);
        let ours: serde_json::Value = serde_json::from_slice(&doc.to_json_vec()).unwrap();
        assert_eq!(ours, serde_json::json!({"k\u{7f}": "tab\there", "n": -3}));
    }

    #[test]
    fn test_should_count_encoded_length_without_writing() {
        let mut deep = Document::object::<&str>([]);
        for _ in 0..10_000 {
            deep = Document::object([("", deep)]);
        }
        let docs = [
            Document::from("a\u{1}b\n\"\\é😀"),
            Document::object([
                ("k\t", Document::from(vec![Document::Null, Document::from(-3i64)])),
                ("b", Document::from(false)),
            ]),
            deep,
        ];
        for doc in &docs {
            assert_eq!(doc.encoded_len(), doc.to_json_string().len());
        }
    }

    #[test]
    fn test_should_write_to_io_writer() {
        let mut buf = Vec::new();
        Document::from(vec![Document::from(false)])
            .write_json(&mut buf)
            .unwrap();
        assert_eq!(buf, b"[false]");
    }
}
