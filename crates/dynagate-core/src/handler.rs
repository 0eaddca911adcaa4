//! DynamoDB handler implementation bridging HTTP to business logic.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dynagate_http::body::DynamoDBResponseBody;
use dynagate_http::dispatch::{DynamoDBHandler, RequestContext};
use dynagate_http::response::json_response;
use dynagate_json::Document;
use dynagate_model::error::DynamoDBError;
use dynagate_model::operations::DynamoDBOperation;

use crate::error::serde_error_to_dynamodb;
use crate::provider::DynagateProvider;

/// Handler that bridges the HTTP layer to the in-memory provider.
#[derive(Debug)]
pub struct DynagateHandler {
    provider: Arc<DynagateProvider>,
}

impl DynagateHandler {
    /// Create a new handler wrapping a provider.
    #[must_use]
    pub fn new(provider: Arc<DynagateProvider>) -> Self {
        Self { provider }
    }
}

impl DynamoDBHandler for DynagateHandler {
    fn handle_operation(
        &self,
        op: DynamoDBOperation,
        body: Document,
        ctx: RequestContext,
    ) -> Pin<
        Box<
            dyn Future<Output = Result<http::Response<DynamoDBResponseBody>, DynamoDBError>> + Send,
        >,
    > {
        let provider = Arc::clone(&self.provider);
        Box::pin(async move { dispatch(provider.as_ref(), op, body, &ctx) })
    }
}

/// Dispatch a DynamoDB operation to the appropriate provider method.
fn dispatch(
    provider: &DynagateProvider,
    op: DynamoDBOperation,
    body: Document,
    ctx: &RequestContext,
) -> Result<http::Response<DynamoDBResponseBody>, DynamoDBError> {
    let request_id = ctx.request_id.as_str();

    match op {
        DynamoDBOperation::DescribeEndpoints => {
            let output = provider.handle_describe_endpoints(ctx.host.as_deref())?;
            serialize(&output, request_id)
        }
        DynamoDBOperation::CreateTable => {
            let input = deserialize(&body)?;
            let output = provider.handle_create_table(input)?;
            serialize(&output, request_id)
        }
        DynamoDBOperation::DeleteTable => {
            let input = deserialize(&body)?;
            let output = provider.handle_delete_table(input)?;
            serialize(&output, request_id)
        }
        DynamoDBOperation::DescribeTable => {
            let input = deserialize(&body)?;
            let output = provider.handle_describe_table(input)?;
            serialize(&output, request_id)
        }
        DynamoDBOperation::ListTables => {
            let input = deserialize(&body)?;
            let output = provider.handle_list_tables(input)?;
            serialize(&output, request_id)
        }
        DynamoDBOperation::PutItem => {
            let old = provider.handle_put_item(body)?;
            Ok(item_response("Attributes", old.as_deref(), request_id))
        }
        DynamoDBOperation::GetItem => {
            let item = provider.handle_get_item(&body)?;
            Ok(item_response("Item", item.as_deref(), request_id))
        }
        DynamoDBOperation::DeleteItem => {
            let old = provider.handle_delete_item(&body)?;
            Ok(item_response("Attributes", old.as_deref(), request_id))
        }
    }
}

/// Decode a shallow table request through serde.
fn deserialize<T: serde::de::DeserializeOwned>(body: &Document) -> Result<T, DynamoDBError> {
    serde_json::from_str(&body.to_json_string()).map_err(serde_error_to_dynamodb)
}

/// Serialize an output type into a JSON HTTP response.
fn serialize<T: serde::Serialize>(
    output: &T,
    request_id: &str,
) -> Result<http::Response<DynamoDBResponseBody>, DynamoDBError> {
    let json = serde_json::to_vec(output)
        .map_err(|e| DynamoDBError::internal_error(format!("Failed to serialize response: {e}")))?;
    Ok(json_response(json, request_id))
}

/// `{"<field>": item}`, or `{}` without an item.
fn item_response(
    field: &str,
    item: Option<&Document>,
    request_id: &str,
) -> http::Response<DynamoDBResponseBody> {
    let mut json = String::from("{");
    if let Some(item) = item {
        json.push('"');
        json.push_str(field);
        json.push_str("\":");
        item.write_compact(&mut json);
    }
    json.push('}');
    json_response(json.into_bytes(), request_id)
}
