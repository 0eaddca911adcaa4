//! DynamoDB HTTP service layer for Dynagate.
//!
//! This crate implements the `awsJson1_0` protocol front end:
//!
//! - **Service**: Hyper `Service` running the request pipeline (method gate,
//!   body limit, SigV4 verification, routing, parsing, dispatch)
//! - **Router**: Extracts the operation from `X-Amz-Target` header
//! - **Handler trait**: Defines the boundary between HTTP and business logic
//! - **Response helpers**: JSON success/error response formatting

pub mod body;
pub mod dispatch;
pub mod response;
pub mod router;
pub mod service;

pub use body::DynamoDBResponseBody;
pub use dispatch::{DynamoDBHandler, RequestContext};
pub use service::{DynamoDBHttpConfig, DynamoDBHttpService};
