//! DynamoDB response serialization and error formatting.

use dynagate_model::error::DynamoDBError;

use crate::body::DynamoDBResponseBody;

/// Content type for DynamoDB JSON responses.
pub const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

/// Serialize a DynamoDB error into a JSON response body.
///
/// SDKs disagree on the casing of the message field, so both are written:
///
/// ```json
/// {
///   "__type": "com.amazonaws.dynamodb.v20120810#ResourceNotFoundException",
///   "message": "Requested resource not found",
///   "Message": "Requested resource not found"
/// }
/// ```
#[must_use]
pub fn error_to_json(error: &DynamoDBError) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "__type": error.error_type(),
        "message": error.message,
        "Message": error.message,
    }))
    .expect("JSON serialization of error cannot fail")
}

/// Convert a `DynamoDBError` into a complete HTTP error response.
#[must_use]
pub fn error_to_response(
    error: &DynamoDBError,
    request_id: &str,
) -> http::Response<DynamoDBResponseBody> {
    build_response(error.status_code, error_to_json(error), request_id)
}

/// Build a success response from JSON bytes.
#[must_use]
pub fn json_response(json: Vec<u8>, request_id: &str) -> http::Response<DynamoDBResponseBody> {
    build_response(http::StatusCode::OK, json, request_id)
}

fn build_response(
    status: http::StatusCode,
    json: Vec<u8>,
    request_id: &str,
) -> http::Response<DynamoDBResponseBody> {
    let crc = crc32fast::hash(&json);

    let mut response = http::Response::new(DynamoDBResponseBody::from_json(json));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static(CONTENT_TYPE),
    );
    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.insert("x-amzn-requestid", hv);
    }
    headers.insert("x-amz-crc32", http::HeaderValue::from(crc));

    response
}
