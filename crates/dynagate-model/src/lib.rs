//! DynamoDB model types for Dynagate.
//!
//! Only the shapes the gateway itself produces or consumes are modelled here:
//! the operation enum used for routing, the error codes written to the wire,
//! and the table and endpoint types of the operations the in-memory handler
//! supports. Item payloads are never modelled; they stay as parsed
//! [`Document`](https://docs.rs/dynagate-json) trees so their nesting depth
//! is not limited by serde's recursion.
// "DynamoDB" appears in virtually every doc comment in this crate.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod input;
pub mod operations;
pub mod output;
pub mod types;

pub use error::{DynamoDBError, DynamoDBErrorCode};
pub use operations::DynamoDBOperation;
