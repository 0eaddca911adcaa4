//! Core error type.

use dynagate_model::error::DynamoDBError;

/// Errors raised while assembling the gateway from its environment.
#[derive(Debug, thiserror::Error)]
pub enum DynagateError {
    /// An environment variable holds a value that cannot be used.
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A `DYNAGATE_CREDENTIALS` entry is not `akid:secret`.
    #[error("malformed credential entry {0:?}, expected ACCESS_KEY_ID:SECRET")]
    MalformedCredential(String),

    /// Authorization is enforced but no credential is configured.
    #[error("authorization is enforced but no credentials are configured")]
    NoCredentials,
}

/// Convert a serde failure on a table request into a `SerializationException`.
///
/// Takes `e` by value because this is used as a closure argument to `.map_err()`.
#[must_use]
#[allow(clippy::needless_pass_by_value)]
pub fn serde_error_to_dynamodb(e: serde_json::Error) -> DynamoDBError {
    DynamoDBError::serialization_exception(format!("Failed to deserialize request body: {e}"))
}
