//! JSON request parsing for Dynagate.
//!
//! DynamoDB request bodies may nest attribute values far deeper than a native
//! call stack can follow. Everything in this crate (parsing, dropping,
//! comparing, measuring and writing a [`Document`]) runs on explicit heap
//! stacks, so the only limit on nesting is [`ParserConfig::max_depth`].
//!
//! ```rust
//! use dynagate_json::{Document, ParserConfig, parse};
//!
//! let doc = parse(br#"{"TableName":"users","Key":{"id":{"S":"42"}}}"#, &ParserConfig::default())
//!     .unwrap();
//! assert_eq!(doc.get("TableName").and_then(Document::as_str), Some("users"));
//! assert_eq!(doc.depth(), 3);
//! assert_eq!(doc.to_json_string(), r#"{"TableName":"users","Key":{"id":{"S":"42"}}}"#);
//! ```

mod config;
mod document;
mod error;
mod parser;
mod writer;

pub use config::{DEFAULT_MAX_DEPTH, ParserConfig};
pub use document::Document;
pub use error::{ParseError, ParseErrorKind};
pub use parser::parse;
