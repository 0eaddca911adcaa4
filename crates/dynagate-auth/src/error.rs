//! Error types for SigV4 authentication.
//!
//! The variants exist for logging and tests. At the wire level the HTTP layer
//! collapses all of them except [`AuthError::MissingAuthHeader`] into a single
//! `UnrecognizedClientException`, so a client learns nothing about which check
//! failed.

/// Errors that can occur while signing or verifying a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header is missing from the request.
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    /// The `Authorization` header could not be parsed.
    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    /// The signing algorithm is not supported (only AWS4-HMAC-SHA256 is).
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A header named in `SignedHeaders` (or required for signing) is missing.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// The `Credential` component is not `AKID/date/region/service/aws4_request`,
    /// or its date does not match `X-Amz-Date`.
    #[error("Invalid credential format")]
    InvalidCredential,

    /// The credential scope names a region or service this endpoint does not
    /// serve.
    #[error("Credential should be scoped to {expected}, not {actual}")]
    CredentialScopeMismatch {
        /// `region/service` the endpoint accepts.
        expected: String,
        /// `region/service` from the request.
        actual: String,
    },

    /// The access key ID was not found in the credential store.
    ///
    /// Only credential providers return this. The verifier turns it into
    /// [`AuthError::SignatureDoesNotMatch`].
    #[error("Access key not found: {0}")]
    AccessKeyNotFound(String),

    /// The computed signature does not match the provided signature.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,

    /// `X-Amz-Date` is not a valid `YYYYMMDD'T'HHMMSS'Z'` timestamp.
    #[error("Invalid X-Amz-Date: {0}")]
    InvalidTimestamp(String),

    /// `X-Amz-Date` is further from the server clock than the allowed skew.
    #[error("Request time {request_time} is too skewed from server time {server_time}")]
    RequestTimeTooSkewed {
        /// The request timestamp as sent.
        request_time: String,
        /// The server time used for the comparison.
        server_time: String,
    },

    /// A computed header value could not be encoded as an HTTP header.
    #[error("Invalid header value for {0}")]
    InvalidHeaderValue(String),
}
