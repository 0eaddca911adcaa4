//! DynamoDB request router.
//!
//! All API calls are `POST /` with the operation in the `X-Amz-Target`
//! header:
//!
//! ```text
//! X-Amz-Target: DynamoDB_20120810.PutItem
//! ```

use dynagate_model::error::DynamoDBError;
use dynagate_model::operations::DynamoDBOperation;

/// The expected prefix for the `X-Amz-Target` header value.
pub const TARGET_PREFIX: &str = "DynamoDB_20120810.";

/// Resolve the DynamoDB operation named by the `X-Amz-Target` header.
///
/// A missing or non-text header is `MissingAction`; anything that does not
/// name a routed operation is `UnknownOperationException`.
pub fn resolve_operation(headers: &http::HeaderMap) -> Result<DynamoDBOperation, DynamoDBError> {
    let target = headers
        .get("x-amz-target")
        .ok_or_else(DynamoDBError::missing_action)?
        .to_str()
        .map_err(|_| DynamoDBError::missing_action())?;

    target
        .strip_prefix(TARGET_PREFIX)
        .and_then(DynamoDBOperation::from_name)
        .ok_or_else(|| DynamoDBError::unknown_operation(target))
}
