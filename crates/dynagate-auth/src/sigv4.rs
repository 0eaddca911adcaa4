//! AWS Signature Version 4 verification.
//!
//! 1. Parse the `Authorization` header into algorithm, credential scope,
//!    signed headers and signature.
//! 2. Resolve the secret key for the access key ID.
//! 3. Rebuild the canonical request and the string to sign.
//! 4. Derive the signing key and compare signatures in constant time.
//!
//! An unknown access key takes the same path as a known one: a placeholder
//! secret is used for the derivation and the comparison still runs, so the
//! two failures cost the same and produce the same error.

use chrono::{DateTime, NaiveDateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::canonical::build_canonical_request;
use crate::credentials::CredentialProvider;
use crate::error::AuthError;

/// The only algorithm supported by this implementation.
pub(crate) const SUPPORTED_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Format of the `X-Amz-Date` header.
pub(crate) const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Secret used when the access key is unknown. Never matches a real signature
/// because no client can know it was chosen.
const PLACEHOLDER_SECRET: &str = "dynagate-unknown-access-key";

type HmacSha256 = Hmac<Sha256>;

/// The result of a successful SigV4 verification.
#[derive(Debug, Clone)]
pub struct AuthResult {
    /// The access key ID that signed the request.
    pub access_key_id: String,
    /// The region from the credential scope.
    pub region: String,
    /// The service from the credential scope.
    pub service: String,
    /// The headers that were covered by the signature.
    pub signed_headers: Vec<String>,
}

/// Parsed components of an AWS SigV4 `Authorization` header.
///
/// ```text
/// AWS4-HMAC-SHA256 Credential=AKID/20240101/us-east-1/dynamodb/aws4_request,
///   SignedHeaders=content-type;host;x-amz-date;x-amz-target,
///   Signature=<hex-signature>
/// ```
#[derive(Debug, Clone)]
pub struct ParsedAuth {
    /// The signing algorithm (must be `AWS4-HMAC-SHA256`).
    pub algorithm: String,
    /// The access key ID.
    pub access_key_id: String,
    /// The date component of the credential scope (YYYYMMDD).
    pub date: String,
    /// The region from the credential scope.
    pub region: String,
    /// The service from the credential scope.
    pub service: String,
    /// The signed header names (lowercase).
    pub signed_headers: Vec<String>,
    /// The hex-encoded signature.
    pub signature: String,
}

impl ParsedAuth {
    /// The credential scope string, `date/region/service/aws4_request`.
    #[must_use]
    pub fn credential_scope(&self) -> String {
        credential_scope(&self.date, &self.region, &self.service)
    }
}

/// Parse an AWS SigV4 `Authorization` header value into its components.
///
/// # Errors
///
/// Returns [`AuthError::InvalidAuthHeader`] if the header format is invalid or
/// `host` is not among the signed headers, [`AuthError::UnsupportedAlgorithm`] if the algorithm is not
/// `AWS4-HMAC-SHA256`, or [`AuthError::InvalidCredential`] for a malformed scope.
pub fn parse_authorization_header(header: &str) -> Result<ParsedAuth, AuthError> {
    let (algorithm, rest) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;

    if algorithm != SUPPORTED_ALGORITHM {
        return Err(AuthError::UnsupportedAlgorithm(algorithm.to_owned()));
    }

    let mut credential = None;
    let mut signed_headers = None;
    let mut signature = None;

    for part in rest.split(',') {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("Credential=") {
            credential = Some(value);
        } else if let Some(value) = part.strip_prefix("SignedHeaders=") {
            signed_headers = Some(value);
        } else if let Some(value) = part.strip_prefix("Signature=") {
            signature = Some(value);
        }
    }

    let credential = credential.ok_or(AuthError::InvalidAuthHeader)?;
    let signed_headers = signed_headers.ok_or(AuthError::InvalidAuthHeader)?;
    let signature = signature.ok_or(AuthError::InvalidAuthHeader)?;

    let cred_parts: Vec<&str> = credential.splitn(5, '/').collect();
    if cred_parts.len() != 5 || cred_parts[4] != "aws4_request" || cred_parts[0].is_empty() {
        return Err(AuthError::InvalidCredential);
    }

    let parsed_signed_headers: Vec<String> = signed_headers
        .split(';')
        .filter(|h| !h.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    if !parsed_signed_headers.iter().any(|h| h == "host") {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(ParsedAuth {
        algorithm: algorithm.to_owned(),
        access_key_id: cred_parts[0].to_owned(),
        date: cred_parts[1].to_owned(),
        region: cred_parts[2].to_owned(),
        service: cred_parts[3].to_owned(),
        signed_headers: parsed_signed_headers,
        signature: signature.to_owned(),
    })
}

/// Build the credential scope string.
///
/// ```
/// use dynagate_auth::sigv4::credential_scope;
///
/// assert_eq!(
///     credential_scope("20240101", "us-east-1", "dynamodb"),
///     "20240101/us-east-1/dynamodb/aws4_request"
/// );
/// ```
#[must_use]
pub fn credential_scope(date: &str, region: &str, service: &str) -> String {
    format!("{date}/{region}/{service}/aws4_request")
}

/// Build the SigV4 string to sign.
///
/// ```text
/// AWS4-HMAC-SHA256\n
/// <X-Amz-Date>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{SUPPORTED_ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key using the HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, b"aws4_request")
}

/// Compute the hex-encoded HMAC-SHA256 signature of `data`.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Verify an AWS SigV4-signed HTTP request.
///
/// `body_hash` is the hex SHA-256 of the request body (see [`hash_payload`]).
///
/// # Errors
///
/// - [`AuthError::MissingAuthHeader`] when there is no `Authorization` header
/// - [`AuthError::InvalidAuthHeader`], [`AuthError::UnsupportedAlgorithm`] or
///   [`AuthError::InvalidCredential`] when it cannot be parsed
/// - [`AuthError::MissingHeader`] when a signed header is absent
/// - [`AuthError::SignatureDoesNotMatch`] for an unknown access key or a wrong
///   signature alike
pub fn verify_sigv4(
    parts: &http::request::Parts,
    body_hash: &str,
    credential_provider: &dyn CredentialProvider,
) -> Result<AuthResult, AuthError> {
    let auth_header = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let parsed = parse_authorization_header(auth_header)?;

    let timestamp = header_value(parts, "x-amz-date")?;
    if !timestamp.starts_with(parsed.date.as_str()) {
        debug!(
            scope_date = %parsed.date,
            amz_date = %timestamp,
            "credential scope date does not match X-Amz-Date"
        );
        return Err(AuthError::InvalidCredential);
    }

    let (secret_key, key_known) = match credential_provider.get_secret_key(&parsed.access_key_id)
    {
        Ok(secret) => (secret, true),
        Err(AuthError::AccessKeyNotFound(_)) => (PLACEHOLDER_SECRET.to_owned(), false),
        Err(e) => return Err(e),
    };

    debug!(
        access_key_id = %parsed.access_key_id,
        date = %parsed.date,
        region = %parsed.region,
        service = %parsed.service,
        "verifying SigV4 signature"
    );

    let signed_header_refs: Vec<&str> = parsed.signed_headers.iter().map(String::as_str).collect();
    let header_pairs = collect_signed_headers(parts, &signed_header_refs)?;

    let canonical_request = build_canonical_request(
        parts.method.as_str(),
        parts.uri.path(),
        parts.uri.query().unwrap_or(""),
        &header_pairs,
        &signed_header_refs,
        body_hash,
    );

    let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    let string_to_sign =
        build_string_to_sign(timestamp, &parsed.credential_scope(), &canonical_hash);

    let signing_key =
        derive_signing_key(&secret_key, &parsed.date, &parsed.region, &parsed.service);
    let expected_signature = compute_signature(&signing_key, &string_to_sign);

    let matches: bool = parsed
        .signature
        .as_bytes()
        .ct_eq(expected_signature.as_bytes())
        .into();

    if matches && key_known {
        debug!(access_key_id = %parsed.access_key_id, "signature verification succeeded");
        Ok(AuthResult {
            access_key_id: parsed.access_key_id,
            region: parsed.region,
            service: parsed.service,
            signed_headers: parsed.signed_headers,
        })
    } else {
        debug!(
            access_key_id = %parsed.access_key_id,
            key_known,
            %canonical_request,
            "signature verification failed"
        );
        Err(AuthError::SignatureDoesNotMatch)
    }
}

/// Check that a verified request was signed for `region` and `service`.
///
/// # Errors
///
/// Returns [`AuthError::CredentialScopeMismatch`] when either differs.
pub fn check_credential_scope(
    auth: &AuthResult,
    region: &str,
    service: &str,
) -> Result<(), AuthError> {
    if auth.region == region && auth.service == service {
        return Ok(());
    }
    Err(AuthError::CredentialScopeMismatch {
        expected: format!("{region}/{service}"),
        actual: format!("{}/{}", auth.region, auth.service),
    })
}

/// Check that the request's `X-Amz-Date` lies within `max_skew` of `now`.
///
/// # Errors
///
/// Returns [`AuthError::MissingHeader`] without `X-Amz-Date`,
/// [`AuthError::InvalidTimestamp`] if it cannot be parsed, and
/// [`AuthError::RequestTimeTooSkewed`] if it is too far from `now`.
pub fn check_request_time(
    parts: &http::request::Parts,
    now: DateTime<Utc>,
    max_skew: chrono::Duration,
) -> Result<(), AuthError> {
    let timestamp = header_value(parts, "x-amz-date")?;
    let request_time = NaiveDateTime::parse_from_str(timestamp, AMZ_DATE_FORMAT)
        .map_err(|_| AuthError::InvalidTimestamp(timestamp.to_owned()))?
        .and_utc();

    if (now - request_time).abs() > max_skew {
        return Err(AuthError::RequestTimeTooSkewed {
            request_time: timestamp.to_owned(),
            server_time: now.format(AMZ_DATE_FORMAT).to_string(),
        });
    }
    Ok(())
}

/// Compute the hex SHA-256 of a request payload.
///
/// ```
/// use dynagate_auth::sigv4::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

fn header_value<'a>(parts: &'a http::request::Parts, name: &str) -> Result<&'a str, AuthError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| AuthError::MissingHeader(name.to_owned()))?
        .to_str()
        .map_err(|_| AuthError::MissingHeader(name.to_owned()))
}

/// Collect name-value pairs for the signed headers.
///
/// Over HTTP/2 the host travels as the `:authority` pseudo-header, which
/// hyper exposes through the URI rather than the header map.
fn collect_signed_headers<'a>(
    parts: &'a http::request::Parts,
    signed_headers: &[&'a str],
) -> Result<Vec<(&'a str, &'a str)>, AuthError> {
    let mut result = Vec::with_capacity(signed_headers.len());

    for &name in signed_headers {
        let values = parts.headers.get_all(name);
        let mut found = false;
        for value in values {
            let value = value
                .to_str()
                .map_err(|_| AuthError::MissingHeader(name.to_owned()))?;
            result.push((name, value));
            found = true;
        }
        if found {
            continue;
        }
        match (name, parts.uri.authority()) {
            ("host", Some(authority)) => result.push((name, authority.as_str())),
            _ => return Err(AuthError::MissingHeader(name.to_owned())),
        }
    }

    Ok(result)
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
