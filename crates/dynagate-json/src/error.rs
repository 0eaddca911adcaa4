//! Parse errors.

/// What went wrong while parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    /// The input ended before the document was complete.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A byte that cannot appear at this position.
    #[error("unexpected byte 0x{0:02x}")]
    UnexpectedByte(u8),

    /// A backslash followed by something other than a JSON escape.
    #[error("invalid escape sequence")]
    InvalidEscape,

    /// A malformed `\uXXXX` escape or an unpaired surrogate.
    #[error("invalid unicode escape")]
    InvalidUnicodeEscape,

    /// A number that does not follow the JSON grammar.
    #[error("invalid number")]
    InvalidNumber,

    /// A string containing bytes that are not valid UTF-8.
    #[error("invalid UTF-8 in string")]
    InvalidUtf8,

    /// An unescaped control character (below U+0020) inside a string.
    #[error("control character in string")]
    ControlCharacterInString,

    /// The document nests more containers than allowed.
    #[error("nesting depth exceeds the limit of {max_depth}")]
    DepthLimitExceeded {
        /// The configured limit.
        max_depth: usize,
    },

    /// Non-whitespace after the root value.
    #[error("trailing characters after document")]
    TrailingCharacters,

    /// The input is empty or only whitespace.
    #[error("empty input")]
    EmptyInput,
}

/// A parse failure and the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at offset {offset}")]
pub struct ParseError {
    /// The kind of fault.
    pub kind: ParseErrorKind,
    /// Zero-based byte offset into the input.
    pub offset: usize,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}
