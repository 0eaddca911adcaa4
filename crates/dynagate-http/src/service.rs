//! DynamoDB HTTP service implementing the hyper `Service` trait.
//!
//! Every request runs through the same pipeline, and a failure at any step
//! ends it with an error response:
//!
//! 1. health check and method gate
//! 2. body collection under the content-length limit
//! 3. SigV4 verification (when enforced)
//! 4. `X-Amz-Target` routing
//! 5. JSON parsing (on the blocking pool for large bodies)
//! 6. dispatch to the handler

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use dynagate_auth::{
    AuthError, AuthResult, CredentialProvider, StaticCredentialProvider, check_credential_scope,
    check_request_time, hash_payload, verify_sigv4,
};
use dynagate_json::{Document, ParserConfig};
use dynagate_model::error::DynamoDBError;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use tracing::debug;

use crate::body::DynamoDBResponseBody;
use crate::dispatch::{DynamoDBHandler, RequestContext, dispatch_operation};
use crate::response::{CONTENT_TYPE, error_to_response, json_response};
use crate::router::resolve_operation;

/// Default content-length limit (16 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Default allowed distance between `X-Amz-Date` and the server clock.
pub const DEFAULT_MAX_CLOCK_SKEW_SECS: i64 = 900;

/// Service name a request's credential scope must carry.
pub const SIGNING_SERVICE: &str = "dynamodb";

/// Bodies larger than this are parsed on the blocking thread pool.
pub const BLOCKING_PARSE_THRESHOLD: usize = 1024 * 1024;

const HEALTH_BODY: &[u8] = br#"{"status":"running","service":"dynamodb"}"#;

/// Configuration for the DynamoDB HTTP service.
#[derive(Clone)]
pub struct DynamoDBHttpConfig {
    /// Whether requests must carry a valid SigV4 signature.
    pub enforce_authorization: bool,
    /// The AWS region this service is running in. Requests must be signed
    /// for it.
    pub region: String,
    /// Credential provider for signature validation.
    pub credential_provider: Arc<dyn CredentialProvider>,
    /// Allowed `X-Amz-Date` skew; `None` disables the check.
    pub max_clock_skew: Option<chrono::Duration>,
    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
    /// Limits for the JSON parser.
    pub parser: ParserConfig,
}

impl std::fmt::Debug for DynamoDBHttpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoDBHttpConfig")
            .field("enforce_authorization", &self.enforce_authorization)
            .field("region", &self.region)
            .field("credential_provider", &"...")
            .field("max_clock_skew", &self.max_clock_skew)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("parser", &self.parser)
            .finish()
    }
}

impl Default for DynamoDBHttpConfig {
    fn default() -> Self {
        Self {
            enforce_authorization: true,
            region: "us-east-1".to_owned(),
            credential_provider: Arc::new(StaticCredentialProvider::default()),
            max_clock_skew: Some(chrono::Duration::seconds(DEFAULT_MAX_CLOCK_SKEW_SECS)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            parser: ParserConfig::default(),
        }
    }
}

/// Hyper `Service` implementation for DynamoDB.
///
/// Wraps a [`DynamoDBHandler`] implementation and routes incoming HTTP
/// requests to the appropriate DynamoDB operation handler.
#[derive(Debug)]
pub struct DynamoDBHttpService<H: DynamoDBHandler> {
    handler: Arc<H>,
    config: Arc<DynamoDBHttpConfig>,
}

impl<H: DynamoDBHandler> DynamoDBHttpService<H> {
    /// Create a new `DynamoDBHttpService`.
    pub fn new(handler: Arc<H>, config: DynamoDBHttpConfig) -> Self {
        Self {
            handler,
            config: Arc::new(config),
        }
    }

    /// Run one request through the pipeline. Never fails; every error
    /// becomes a DynamoDB JSON error response.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<DynamoDBResponseBody>
    where
        B: http_body::Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request_id = uuid::Uuid::new_v4().to_string();
        let response = process_request(req, self.handler.as_ref(), &self.config, &request_id).await;
        add_common_headers(response, &request_id)
    }
}

impl<H: DynamoDBHandler> Clone for DynamoDBHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H: DynamoDBHandler> hyper::service::Service<http::Request<Incoming>>
    for DynamoDBHttpService<H>
{
    type Response = http::Response<DynamoDBResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

/// Process a single DynamoDB HTTP request through the full pipeline.
async fn process_request<H, B>(
    req: http::Request<B>,
    handler: &H,
    config: &DynamoDBHttpConfig,
    request_id: &str,
) -> http::Response<DynamoDBResponseBody>
where
    H: DynamoDBHandler,
    B: http_body::Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, incoming) = req.into_parts();

    // 1. Health check, then POST only.
    if parts.method == http::Method::GET && matches!(parts.uri.path(), "/health" | "/_health") {
        return json_response(HEALTH_BODY.to_vec(), request_id);
    }
    if parts.method != http::Method::POST {
        let err = DynamoDBError::validation(format!(
            "DynamoDB requires POST method, got {}",
            parts.method,
        ));
        return error_to_response(&err, request_id);
    }

    // 2. Collect body under the size limit.
    let body = match collect_body(&parts.headers, incoming, config.max_body_bytes).await {
        Ok(body) => body,
        Err(err) => return error_to_response(&err, request_id),
    };

    // 3. Authenticate.
    let access_key_id = if config.enforce_authorization {
        match authenticate(&parts, &body, config) {
            Ok(auth) => Some(auth.access_key_id),
            Err(auth_err) => {
                debug!(request_id, error = %auth_err, "request authentication failed");
                return error_to_response(&auth_error_to_dynamodb(&auth_err), request_id);
            }
        }
    } else {
        None
    };

    // 4. Route.
    let op = match resolve_operation(&parts.headers) {
        Ok(op) => op,
        Err(err) => return error_to_response(&err, request_id),
    };

    // 5. Parse.
    let document = match parse_body(body, config.parser).await {
        Ok(document) => document,
        Err(err) => return error_to_response(&err, request_id),
    };

    // 6. Dispatch.
    let ctx = RequestContext {
        request_id: request_id.to_owned(),
        host: request_host(&parts),
        access_key_id,
    };
    match dispatch_operation(handler, op, document, ctx).await {
        Ok(response) => response,
        Err(err) => error_to_response(&err, request_id),
    }
}

/// Collect the body, refusing anything larger than `limit` bytes.
///
/// A declared `Content-Length` over the limit is refused before any of the
/// body is read.
async fn collect_body<B>(
    headers: &http::HeaderMap,
    incoming: B,
    limit: usize,
) -> Result<Bytes, DynamoDBError>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let declared = headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(DynamoDBError::request_too_large(limit));
    }

    match Limited::new(incoming, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(DynamoDBError::request_too_large(limit))
        }
        Err(e) => Err(DynamoDBError::internal_error(format!(
            "Failed to read request body: {e}"
        ))),
    }
}

fn authenticate(
    parts: &http::request::Parts,
    body: &Bytes,
    config: &DynamoDBHttpConfig,
) -> Result<AuthResult, AuthError> {
    if !parts.headers.contains_key(http::header::AUTHORIZATION) {
        return Err(AuthError::MissingAuthHeader);
    }
    if let Some(max_skew) = config.max_clock_skew {
        check_request_time(parts, Utc::now(), max_skew)?;
    }
    let auth = verify_sigv4(parts, &hash_payload(body), config.credential_provider.as_ref())?;
    check_credential_scope(&auth, &config.region, SIGNING_SERVICE)?;
    Ok(auth)
}

/// Collapse every authentication failure except a missing header into one
/// indistinguishable response.
fn auth_error_to_dynamodb(err: &AuthError) -> DynamoDBError {
    match err {
        AuthError::MissingAuthHeader => DynamoDBError::missing_authentication_token(),
        _ => DynamoDBError::unrecognized_client(),
    }
}

async fn parse_body(body: Bytes, config: ParserConfig) -> Result<Document, DynamoDBError> {
    let result = if body.len() > BLOCKING_PARSE_THRESHOLD {
        tokio::task::spawn_blocking(move || dynagate_json::parse(&body, &config))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "request parser task failed");
                DynamoDBError::internal_error("Internal error while parsing request")
            })?
    } else {
        dynagate_json::parse(&body, &config)
    };

    result.map_err(|e| {
        debug!(error = %e, "malformed request body");
        DynamoDBError::serialization_exception(format!("Malformed JSON request body: {e}"))
            .with_source(e)
    })
}

fn request_host(parts: &http::request::Parts) -> Option<String> {
    parts
        .headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| parts.uri.authority().map(ToString::to_string))
}

/// Add common response headers to every DynamoDB response.
fn add_common_headers(
    mut response: http::Response<DynamoDBResponseBody>,
    request_id: &str,
) -> http::Response<DynamoDBResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry("x-amzn-requestid").or_insert(hv);
    }

    headers
        .entry(http::header::CONTENT_TYPE)
        .or_insert(http::HeaderValue::from_static(CONTENT_TYPE));

    headers.insert(http::header::SERVER, http::HeaderValue::from_static("Dynagate"));

    response
}
