//! Credential provider trait and implementations.
//!
//! The verifier only ever reads from a provider, so implementations must be
//! safe to share across worker threads (`Send + Sync`).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::error::AuthError;

/// Trait for looking up secret access keys by access key ID.
pub trait CredentialProvider: Send + Sync {
    /// Retrieve the secret access key for the given access key ID.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccessKeyNotFound`] if the access key ID is not recognized.
    fn get_secret_key(&self, access_key_id: &str) -> Result<String, AuthError>;
}

/// An in-memory credential provider backed by a `HashMap`.
///
/// # Examples
///
/// ```
/// use dynagate_auth::credentials::{CredentialProvider, StaticCredentialProvider};
///
/// let provider = StaticCredentialProvider::new(vec![
///     ("alternator".to_owned(), "secret_pass".to_owned()),
/// ]);
///
/// assert_eq!(provider.get_secret_key("alternator").unwrap(), "secret_pass");
/// assert!(provider.get_secret_key("whatever").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    credentials: HashMap<String, String>,
}

impl StaticCredentialProvider {
    /// Create a provider from (access_key_id, secret_key) pairs.
    pub fn new(credentials: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            credentials: credentials.into_iter().collect(),
        }
    }

    /// Number of configured access keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Returns `true` if no access keys are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn get_secret_key(&self, access_key_id: &str) -> Result<String, AuthError> {
        self.credentials
            .get(access_key_id)
            .cloned()
            .ok_or_else(|| AuthError::AccessKeyNotFound(access_key_id.to_owned()))
    }
}

/// A time-bounded cache in front of a slower credential provider.
///
/// Successful lookups are kept for `ttl`; misses always go to the inner
/// provider so a freshly created key becomes usable immediately.
#[derive(Debug)]
pub struct CachingCredentialProvider<P> {
    inner: P,
    ttl: Duration,
    entries: DashMap<String, CachedSecret>,
}

#[derive(Debug, Clone)]
struct CachedSecret {
    secret: String,
    fetched_at: Instant,
}

impl<P: CredentialProvider> CachingCredentialProvider<P> {
    /// Wrap `inner`, caching each resolved secret for `ttl`.
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    fn cached(&self, access_key_id: &str) -> Option<String> {
        let entry = self.entries.get(access_key_id)?;
        (entry.fetched_at.elapsed() < self.ttl).then(|| entry.secret.clone())
    }
}

impl<P: CredentialProvider> CredentialProvider for CachingCredentialProvider<P> {
    fn get_secret_key(&self, access_key_id: &str) -> Result<String, AuthError> {
        if let Some(secret) = self.cached(access_key_id) {
            return Ok(secret);
        }

        let secret = self.inner.get_secret_key(access_key_id)?;
        self.entries.insert(
            access_key_id.to_owned(),
            CachedSecret {
                secret: secret.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(secret)
    }
}
