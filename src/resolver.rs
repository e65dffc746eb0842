//! Signing-key resolution with a time-bounded cache.
//!
//! Bridges the `kid` found in a token's protected header to verified
//! public-key material. Cache hits are served without network access;
//! a miss or an expired entry triggers one synchronous refetch of the
//! realm's whole key set, and every fetched key is inserted with a
//! fresh TTL so one fetch amortizes across all keys in rotation.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use jsonwebtoken::DecodingKey;
use tracing::debug;
use url::Url;

use crate::certs::{Certs, KeyEntry};
use crate::config::KeycloakConfig;
use crate::error::KeyError;

/// Resolves key identifiers to verification key material.
///
/// The cache is the only state in this crate that outlives a single
/// request. It supports concurrent read/insert from arbitrarily many
/// in-flight requests; two simultaneous misses for the same key may
/// both fetch, and the second insert just refreshes the TTL.
pub struct KeyResolver {
    cache: DashMap<String, CachedKey>,
    http: reqwest::Client,
    base_url: String,
    realm: String,
    full_certs_path: Option<String>,
    ttl: Duration,
}

/// Cache value: one published key with its absolute expiry.
struct CachedKey {
    entry: KeyEntry,
    expires_at: Instant,
}

impl CachedKey {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

impl KeyResolver {
    /// Create a resolver for the configured provider and realm.
    #[must_use]
    pub fn new(config: &KeycloakConfig) -> Self {
        Self {
            cache: DashMap::new(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: config.url.clone(),
            realm: config.realm.clone(),
            full_certs_path: config.full_certs_path.clone(),
            ttl: config.key_cache_ttl,
        }
    }

    /// Resolve `kid` to verification key material.
    ///
    /// # Errors
    ///
    /// [`KeyError::NotFound`] if the key is absent even after a fresh
    /// fetch, [`KeyError::Fetch`] when the fetch fails, or a
    /// key-material error when the entry cannot be turned into a key.
    pub async fn resolve(&self, kid: &str) -> Result<DecodingKey, KeyError> {
        if let Some(entry) = self.lookup(kid) {
            return entry.decoding_key();
        }

        let certs = self.fetch_certs().await?;
        debug!(keys = certs.keys.len(), realm = %self.realm, "refreshed public key cache");

        let expires_at = Instant::now() + self.ttl;
        for key in certs.keys {
            self.cache.insert(
                key.kid.clone(),
                CachedKey {
                    entry: key,
                    expires_at,
                },
            );
        }

        match self.lookup(kid) {
            Some(entry) => entry.decoding_key(),
            None => Err(KeyError::NotFound(kid.to_string())),
        }
    }

    /// Cached entry for `kid`, evicting it when past its TTL.
    fn lookup(&self, kid: &str) -> Option<KeyEntry> {
        let cached = self.cache.get(kid)?;
        if cached.is_expired() {
            drop(cached);
            self.cache.remove(kid);
            return None;
        }
        Some(cached.entry.clone())
    }

    async fn fetch_certs(&self) -> Result<Certs, KeyError> {
        let url = self.certs_url()?;
        let certs = self.http.get(url).send().await?.json().await?;
        Ok(certs)
    }

    /// Location of the realm certs document: the standard
    /// realm-scoped path joined onto any base path, unless the
    /// configuration overrides the path wholesale.
    fn certs_url(&self) -> Result<Url, KeyError> {
        let mut url = Url::parse(&self.base_url)?;
        let path = match &self.full_certs_path {
            Some(path) => path.clone(),
            None => format!(
                "{}/auth/realms/{}/protocol/openid-connect/certs",
                url.path().trim_end_matches('/'),
                self.realm
            ),
        };
        url.set_path(&path);
        Ok(url)
    }
}
