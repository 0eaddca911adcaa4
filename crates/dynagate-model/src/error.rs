//! DynamoDB error types.
//!
//! DynamoDB errors use JSON format with a `__type` field containing the
//! fully-qualified error type name.

use std::fmt;

/// Message sent for every signature failure, whatever the cause.
pub const INVALID_SECURITY_TOKEN_MESSAGE: &str =
    "The security token included in the request is invalid.";

/// Well-known DynamoDB error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum DynamoDBErrorCode {
    /// Table already exists.
    ResourceInUseException,
    /// Table not found.
    ResourceNotFoundException,
    /// Validation error.
    #[default]
    ValidationException,
    /// The request body is not well-formed JSON.
    SerializationException,
    /// Internal server error.
    InternalServerError,
    /// Missing `X-Amz-Target` header.
    MissingAction,
    /// `X-Amz-Target` names an operation that does not exist.
    UnknownOperationException,
    /// The request signature could not be verified.
    UnrecognizedClientException,
    /// The request carries no `Authorization` header.
    MissingAuthenticationTokenException,
}

impl DynamoDBErrorCode {
    /// Returns the fully-qualified error type string for JSON `__type` field.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::ResourceInUseException => {
                "com.amazonaws.dynamodb.v20120810#ResourceInUseException"
            }
            Self::ResourceNotFoundException => {
                "com.amazonaws.dynamodb.v20120810#ResourceNotFoundException"
            }
            Self::ValidationException => "com.amazonaws.dynamodb.v20120810#ValidationException",
            Self::SerializationException => {
                "com.amazonaws.dynamodb.v20120810#SerializationException"
            }
            Self::InternalServerError => "com.amazonaws.dynamodb.v20120810#InternalServerError",
            Self::MissingAction => "com.amazonaws.dynamodb.v20120810#MissingAction",
            Self::UnknownOperationException => {
                "com.amazonaws.dynamodb.v20120810#UnknownOperationException"
            }
            Self::UnrecognizedClientException => {
                "com.amazonaws.dynamodb.v20120810#UnrecognizedClientException"
            }
            Self::MissingAuthenticationTokenException => {
                "com.amazonaws.dynamodb.v20120810#MissingAuthenticationTokenException"
            }
        }
    }

    /// Returns the short error code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceInUseException => "ResourceInUseException",
            Self::ResourceNotFoundException => "ResourceNotFoundException",
            Self::ValidationException => "ValidationException",
            Self::SerializationException => "SerializationException",
            Self::InternalServerError => "InternalServerError",
            Self::MissingAction => "MissingAction",
            Self::UnknownOperationException => "UnknownOperationException",
            Self::UnrecognizedClientException => "UnrecognizedClientException",
            Self::MissingAuthenticationTokenException => "MissingAuthenticationTokenException",
        }
    }

    /// Returns the default HTTP status code for this error.
    #[must_use]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::InternalServerError => http::StatusCode::INTERNAL_SERVER_ERROR,
            _ => http::StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for DynamoDBErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DynamoDB error response.
#[derive(Debug)]
pub struct DynamoDBError {
    /// The error code.
    pub code: DynamoDBErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The HTTP status code.
    pub status_code: http::StatusCode,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for DynamoDBError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DynamoDBError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for DynamoDBError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl DynamoDBError {
    /// Create a new `DynamoDBError` from an error code.
    #[must_use]
    pub fn new(code: DynamoDBErrorCode) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: code.as_str().to_owned(),
            code,
            source: None,
        }
    }

    /// Create a new `DynamoDBError` with a custom message.
    #[must_use]
    pub fn with_message(code: DynamoDBErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Override the HTTP status code.
    #[must_use]
    pub fn with_status(mut self, status_code: http::StatusCode) -> Self {
        self.status_code = status_code;
        self
    }

    /// Returns the `__type` string for the JSON error response.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        self.code.error_type()
    }

    // -- Convenience constructors --

    /// Table already exists.
    #[must_use]
    pub fn resource_in_use(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::ResourceInUseException, message)
    }

    /// Table or resource not found.
    #[must_use]
    pub fn resource_not_found(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::ResourceNotFoundException, message)
    }

    /// Validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::ValidationException, message)
    }

    /// Serialization error.
    #[must_use]
    pub fn serialization_exception(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::SerializationException, message)
    }

    /// Internal server error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::InternalServerError, message)
    }

    /// Missing action header.
    #[must_use]
    pub fn missing_action() -> Self {
        Self::with_message(
            DynamoDBErrorCode::MissingAction,
            "Missing required header: X-Amz-Target",
        )
    }

    /// Unknown operation.
    #[must_use]
    pub fn unknown_operation(target: &str) -> Self {
        Self::with_message(
            DynamoDBErrorCode::UnknownOperationException,
            format!("Unsupported operation {target}"),
        )
    }

    /// Signature verification failed. The message never names the cause.
    #[must_use]
    pub fn unrecognized_client() -> Self {
        Self::with_message(
            DynamoDBErrorCode::UnrecognizedClientException,
            INVALID_SECURITY_TOKEN_MESSAGE,
        )
    }

    /// No `Authorization` header was sent.
    #[must_use]
    pub fn missing_authentication_token() -> Self {
        Self::with_message(
            DynamoDBErrorCode::MissingAuthenticationTokenException,
            "Request is missing Authentication Token",
        )
    }

    /// The body is larger than the configured content-length limit.
    #[must_use]
    pub fn request_too_large(limit: usize) -> Self {
        Self::validation(format!(
            "Request content length exceeds the limit of {limit} bytes"
        ))
        .with_status(http::StatusCode::PAYLOAD_TOO_LARGE)
    }
}

/// Create a `DynamoDBError` from an error code.
///
/// # Examples
///
/// ```
/// use dynagate_model::dynamodb_error;
/// use dynagate_model::error::DynamoDBErrorCode;
///
/// let err = dynamodb_error!(ValidationException);
/// assert_eq!(err.code, DynamoDBErrorCode::ValidationException);
///
/// let err = dynamodb_error!(ResourceNotFoundException, "Table not found");
/// assert_eq!(err.message, "Table not found");
/// ```
#[macro_export]
macro_rules! dynamodb_error {
    ($code:ident) => {
        $crate::error::DynamoDBError::new($crate::error::DynamoDBErrorCode::$code)
    };
    ($code:ident, $msg:expr) => {
        $crate::error::DynamoDBError::with_message($crate::error::DynamoDBErrorCode::$code, $msg)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_prefix_every_error_type_with_dynamodb_namespace() {
        let codes = [
            DynamoDBErrorCode::ResourceInUseException,
            DynamoDBErrorCode::ResourceNotFoundException,
            DynamoDBErrorCode::ValidationException,
            DynamoDBErrorCode::SerializationException,
            DynamoDBErrorCode::InternalServerError,
            DynamoDBErrorCode::MissingAction,
            DynamoDBErrorCode::UnknownOperationException,
            DynamoDBErrorCode::UnrecognizedClientException,
            DynamoDBErrorCode::MissingAuthenticationTokenException,
        ];
        for code in codes {
            assert_eq!(
                code.error_type(),
                format!("com.amazonaws.dynamodb.v20120810#{}", code.as_str())
            );
        }
    }

    #[test]
    fn test_should_use_500_only_for_internal_errors() {
        assert_eq!(
            DynamoDBError::internal_error("boom").status_code,
            http::StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            DynamoDBError::unrecognized_client().status_code,
            http::StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_should_report_oversized_body_as_413_validation_error() {
        let err = DynamoDBError::request_too_large(16);
        assert_eq!(err.code, DynamoDBErrorCode::ValidationException);
        assert_eq!(err.status_code, http::StatusCode::PAYLOAD_TOO_LARGE);
        assert!(err.message.contains("16 bytes"));
    }

    #[test]
    fn test_should_not_reveal_cause_in_auth_failure_message() {
        let err = DynamoDBError::unrecognized_client();
        assert_eq!(err.message, INVALID_SECURITY_TOKEN_MESSAGE);
        assert_eq!(
            err.to_string(),
            format!("DynamoDBError(UnrecognizedClientException): {INVALID_SECURITY_TOKEN_MESSAGE}")
        );
    }
}
