//! The parsed JSON tree.
//!
//! `Document` implements `Drop`, `PartialEq` and `Debug` by hand. The derived
//! versions would recurse once per nesting level. Because of the `Drop` impl a
//! `Document` cannot be destructured by value; use [`Document::take`] or the
//! `take_*` helpers to move children out.

use std::fmt;

/// A JSON value.
///
/// Numbers keep their source text so no precision is lost; object members
/// keep their source order, and duplicate keys are kept as-is.
#[derive(Default)]
pub enum Document {
    /// `null`
    #[default]
    Null,
    /// `true` or `false`
    Bool(bool),
    /// A number, exactly as written.
    Number(String),
    /// A string, unescaped.
    String(String),
    /// An array.
    Array(Vec<Document>),
    /// An object as ordered `(key, value)` pairs.
    Object(Vec<(String, Document)>),
}

impl Document {
    /// Build an object from `(key, value)` pairs.
    pub fn object<K: Into<String>>(members: impl IntoIterator<Item = (K, Document)>) -> Self {
        Self::Object(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Look up the first member named `key`. Returns `None` for non-objects.
    ///
    /// ```
    /// use dynagate_json::{ParserConfig, parse};
    ///
    /// let doc = parse(br#"{"a":1,"a":2}"#, &ParserConfig::default()).unwrap();
    /// assert_eq!(doc.get("a").and_then(|v| v.as_number()), Some("1"));
    /// ```
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Document> {
        self.as_object()?
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Remove and return the first member named `key`.
    pub fn take_member(&mut self, key: &str) -> Option<Document> {
        let Self::Object(members) = self else {
            return None;
        };
        let index = members.iter().position(|(k, _)| k == key)?;
        let (_, value) = members.remove(index);
        Some(value)
    }

    /// Replace `self` with `null` and return the previous value.
    pub fn take(&mut self) -> Document {
        std::mem::take(self)
    }

    /// The string value, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The number text, if this is a number.
    #[must_use]
    pub fn as_number(&self) -> Option<&str> {
        match self {
            Self::Number(n) => Some(n),
            _ => None,
        }
    }

    /// The number as a `u64`, if this is a non-negative integer that fits.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        self.as_number()?.parse().ok()
    }

    /// The boolean value, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The elements, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Document]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The members, if this is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&[(String, Document)]> {
        match self {
            Self::Object(members) => Some(members),
            _ => None,
        }
    }

    /// Returns `true` for `null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The JSON type name, for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Number of nested containers on the deepest path. Scalars have depth 0
    /// and `{}` has depth 1.
    ///
    /// ```
    /// use dynagate_json::{ParserConfig, parse};
    ///
    /// let doc = parse(br#"{"a":[{}]}"#, &ParserConfig::default()).unwrap();
    /// assert_eq!(doc.depth(), 3);
    /// ```
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((doc, level)) = stack.pop() {
            match doc {
                Self::Array(items) => {
                    max = max.max(level);
                    stack.extend(items.iter().map(|item| (item, level + 1)));
                }
                Self::Object(members) => {
                    max = max.max(level);
                    stack.extend(members.iter().map(|(_, value)| (value, level + 1)));
                }
                _ => {}
            }
        }
        max
    }

    fn has_children(&self) -> bool {
        match self {
            Self::Array(items) => !items.is_empty(),
            Self::Object(members) => !members.is_empty(),
            _ => false,
        }
    }

    fn drain_children_into(&mut self, out: &mut Vec<Document>) {
        match self {
            Self::Array(items) => out.append(items),
            Self::Object(members) => out.extend(members.drain(..).map(|(_, value)| value)),
            _ => {}
        }
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        if !self.has_children() {
            return;
        }
        let mut stack = Vec::new();
        self.drain_children_into(&mut stack);
        while let Some(mut doc) = stack.pop() {
            doc.drain_children_into(&mut stack);
        }
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some(pair) = stack.pop() {
            match pair {
                (Self::Null, Self::Null) => {}
                (Self::Bool(a), Self::Bool(b)) if a == b => {}
                (Self::Number(a), Self::Number(b)) | (Self::String(a), Self::String(b))
                    if a == b => {}
                (Self::Array(a), Self::Array(b)) if a.len() == b.len() => {
                    stack.extend(a.iter().zip(b));
                }
                (Self::Object(a), Self::Object(b)) if a.len() == b.len() => {
                    for ((ka, va), (kb, vb)) in a.iter().zip(b) {
                        if ka != kb {
                            return false;
                        }
                        stack.push((va, vb));
                    }
                }
                _ => return false,
            }
        }
        true
    }
}

impl Eq for Document {}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Document({self})")
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json_string())
    }
}

impl From<&str> for Document {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Document {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Document {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u64> for Document {
    fn from(value: u64) -> Self {
        Self::Number(value.to_string())
    }
}

impl From<i64> for Document {
    fn from(value: i64) -> Self {
        Self::Number(value.to_string())
    }
}

impl From<Vec<Document>> for Document {
    fn from(value: Vec<Document>) -> Self {
        Self::Array(value)
    }
}
