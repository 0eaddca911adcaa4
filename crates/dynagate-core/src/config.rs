//! Gateway configuration.
//!
//! All configuration is driven by environment variables. Unset variables
//! fall back to the defaults in [`DynagateConfig::default`].

use std::sync::Arc;
use std::time::Duration;

use dynagate_auth::{CachingCredentialProvider, CredentialProvider, StaticCredentialProvider};
use dynagate_http::service::{DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_CLOCK_SKEW_SECS};
use dynagate_http::DynamoDBHttpConfig;
use dynagate_json::{DEFAULT_MAX_DEPTH, ParserConfig};

use crate::error::DynagateError;

/// Dynagate configuration.
#[derive(Clone)]
pub struct DynagateConfig {
    /// HTTP bind address.
    pub gateway_listen: String,
    /// HTTPS bind address; HTTPS is off when unset.
    pub https_listen: Option<String>,
    /// PEM certificate chain for HTTPS.
    pub tls_cert_path: Option<String>,
    /// PEM private key for HTTPS.
    pub tls_key_path: Option<String>,
    /// Verify SigV4 signatures.
    pub enforce_authorization: bool,
    /// `(access_key_id, secret_key)` pairs accepted by the verifier.
    pub credentials: Vec<(String, String)>,
    /// How long a resolved secret is cached in seconds; 0 disables the cache.
    pub credential_cache_ttl_secs: u64,
    /// Allowed `X-Amz-Date` skew in seconds; 0 disables the check.
    pub max_clock_skew_secs: u64,
    /// Parser depth limit.
    pub json_max_depth: usize,
    /// Content-length limit.
    pub max_body_bytes: usize,
    /// Address advertised by `DescribeEndpoints` instead of the `Host` header.
    pub endpoint_address: Option<String>,
    /// Region used in table ARNs and required in credential scopes.
    pub default_region: String,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl std::fmt::Debug for DynagateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let access_keys: Vec<&str> = self.credentials.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("DynagateConfig")
            .field("gateway_listen", &self.gateway_listen)
            .field("https_listen", &self.https_listen)
            .field("tls_cert_path", &self.tls_cert_path)
            .field("tls_key_path", &self.tls_key_path)
            .field("enforce_authorization", &self.enforce_authorization)
            .field("access_keys", &access_keys)
            .field("credential_cache_ttl_secs", &self.credential_cache_ttl_secs)
            .field("max_clock_skew_secs", &self.max_clock_skew_secs)
            .field("json_max_depth", &self.json_max_depth)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("endpoint_address", &self.endpoint_address)
            .field("default_region", &self.default_region)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Default for DynagateConfig {
    fn default() -> Self {
        Self {
            gateway_listen: "0.0.0.0:8000".to_owned(),
            https_listen: None,
            tls_cert_path: None,
            tls_key_path: None,
            enforce_authorization: true,
            credentials: Vec::new(),
            credential_cache_ttl_secs: 0,
            max_clock_skew_secs: DEFAULT_MAX_CLOCK_SKEW_SECS.unsigned_abs(),
            json_max_depth: DEFAULT_MAX_DEPTH,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            endpoint_address: None,
            default_region: "us-east-1".to_owned(),
            log_level: "info".to_owned(),
        }
    }
}

impl DynagateConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, DynagateError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DynagateError> {
        let mut config = Self::default();

        if let Some(v) = lookup("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        config.https_listen = lookup("HTTPS_LISTEN").filter(|v| !v.is_empty());
        config.tls_cert_path = lookup("TLS_CERT_PATH").filter(|v| !v.is_empty());
        config.tls_key_path = lookup("TLS_KEY_PATH").filter(|v| !v.is_empty());
        if let Some(v) = lookup("DYNAGATE_ENFORCE_AUTHORIZATION") {
            config.enforce_authorization = parse_bool("DYNAGATE_ENFORCE_AUTHORIZATION", &v)?;
        }

        if let Some(v) = lookup("DYNAGATE_CREDENTIALS").filter(|v| !v.trim().is_empty()) {
            config.credentials = parse_credentials(&v)?;
        } else if let (Some(akid), Some(secret)) =
            (lookup("AWS_ACCESS_KEY_ID"), lookup("AWS_SECRET_ACCESS_KEY"))
        {
            config.credentials = vec![(akid, secret)];
        }

        if let Some(v) = lookup("DYNAGATE_CREDENTIAL_CACHE_TTL_SECS") {
            config.credential_cache_ttl_secs =
                parse_number("DYNAGATE_CREDENTIAL_CACHE_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("DYNAGATE_MAX_CLOCK_SKEW_SECS") {
            config.max_clock_skew_secs = parse_number("DYNAGATE_MAX_CLOCK_SKEW_SECS", &v)?;
        }
        if let Some(v) = lookup("DYNAGATE_JSON_MAX_DEPTH") {
            config.json_max_depth = parse_number("DYNAGATE_JSON_MAX_DEPTH", &v)?;
            if config.json_max_depth == 0 {
                return Err(invalid("DYNAGATE_JSON_MAX_DEPTH", &v, "must be at least 1"));
            }
        }
        if let Some(v) = lookup("DYNAGATE_MAX_BODY_BYTES") {
            config.max_body_bytes = parse_number("DYNAGATE_MAX_BODY_BYTES", &v)?;
        }
        config.endpoint_address = lookup("DYNAGATE_ENDPOINT_ADDRESS").filter(|v| !v.is_empty());
        if let Some(v) = lookup("DEFAULT_REGION") {
            config.default_region = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        Ok(config)
    }

    /// Reject combinations the server cannot run with.
    pub fn validate(&self) -> Result<(), DynagateError> {
        if self.enforce_authorization && self.credentials.is_empty() {
            return Err(DynagateError::NoCredentials);
        }
        if self.https_listen.is_some() {
            if self.tls_cert_path.is_none() {
                return Err(invalid("TLS_CERT_PATH", "", "required when HTTPS_LISTEN is set"));
            }
            if self.tls_key_path.is_none() {
                return Err(invalid("TLS_KEY_PATH", "", "required when HTTPS_LISTEN is set"));
            }
        }
        Ok(())
    }

    /// Cache lifetime for resolved secrets, if caching is on.
    #[must_use]
    pub fn credential_cache_ttl(&self) -> Option<Duration> {
        (self.credential_cache_ttl_secs > 0)
            .then(|| Duration::from_secs(self.credential_cache_ttl_secs))
    }

    /// Build the credential provider the verifier consults.
    #[must_use]
    pub fn credential_provider(&self) -> Arc<dyn CredentialProvider> {
        let keys = StaticCredentialProvider::new(self.credentials.iter().cloned());
        match self.credential_cache_ttl() {
            Some(ttl) => Arc::new(CachingCredentialProvider::new(keys, ttl)),
            None => Arc::new(keys),
        }
    }

    /// Build the HTTP service configuration.
    #[must_use]
    pub fn http_config(&self) -> DynamoDBHttpConfig {
        let max_clock_skew = (self.max_clock_skew_secs > 0).then(|| {
            chrono::Duration::seconds(i64::try_from(self.max_clock_skew_secs).unwrap_or(i64::MAX))
        });
        DynamoDBHttpConfig {
            enforce_authorization: self.enforce_authorization,
            region: self.default_region.clone(),
            credential_provider: self.credential_provider(),
            max_clock_skew,
            max_body_bytes: self.max_body_bytes,
            parser: ParserConfig::with_max_depth(self.json_max_depth),
        }
    }
}

/// Parse `akid:secret[,akid:secret...]`. Secrets may contain `:`.
fn parse_credentials(raw: &str) -> Result<Vec<(String, String)>, DynagateError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((akid, secret)) if !akid.is_empty() && !secret.is_empty() => {
                Ok((akid.to_owned(), secret.to_owned()))
            }
            _ => Err(DynagateError::MalformedCredential(entry.to_owned())),
        })
        .collect()
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, DynagateError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, value, "expected a boolean")),
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, DynagateError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(name, value, e.to_string()))
}

fn invalid(name: &'static str, value: &str, reason: impl Into<String>) -> DynagateError {
    DynagateError::InvalidEnv {
        name,
        value: value.to_owned(),
        reason: reason.into(),
    }
}
