//! DynamoDB handler trait and operation dispatch.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;

use dynagate_json::Document;
use dynagate_model::error::DynamoDBError;
use dynagate_model::operations::DynamoDBOperation;
use futures::FutureExt;

use crate::body::DynamoDBResponseBody;

/// Per-request facts the handler may need besides the body.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Request id echoed in `x-amzn-requestid`.
    pub request_id: String,
    /// The `Host` header (or HTTP/2 authority), if any.
    pub host: Option<String>,
    /// Access key that signed the request; `None` when authorization is not
    /// enforced.
    pub access_key_id: Option<String>,
}

/// Trait that the DynamoDB business logic provider must implement.
///
/// The handler receives the routed operation, the parsed request document
/// and the request context, and returns a complete HTTP response. This trait
/// is the boundary between the HTTP transport layer and the business logic.
pub trait DynamoDBHandler: Send + Sync + 'static {
    /// Handle a DynamoDB operation and produce an HTTP response.
    fn handle_operation(
        &self,
        op: DynamoDBOperation,
        body: Document,
        ctx: RequestContext,
    ) -> Pin<
        Box<
            dyn Future<Output = Result<http::Response<DynamoDBResponseBody>, DynamoDBError>> + Send,
        >,
    >;
}

/// Dispatch a DynamoDB operation to the handler.
///
/// A panic inside the handler is turned into `InternalServerError` instead of
/// tearing down the connection.
pub async fn dispatch_operation<H: DynamoDBHandler>(
    handler: &H,
    op: DynamoDBOperation,
    body: Document,
    ctx: RequestContext,
) -> Result<http::Response<DynamoDBResponseBody>, DynamoDBError> {
    tracing::debug!(operation = %op, request_id = %ctx.request_id, "dispatching DynamoDB operation");

    let outcome = AssertUnwindSafe(async move { handler.handle_operation(op, body, ctx).await })
        .catch_unwind()
        .await;

    outcome.unwrap_or_else(|panic| {
        let reason = panic
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_owned());
        tracing::error!(operation = %op, %reason, "handler panicked");
        Err(DynamoDBError::internal_error(format!(
            "Internal error while handling {op}"
        )))
    })
}
