//! Nonce resolution for signers and an in-process nonce store for verifiers.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::RngCore;
use std::fmt;
use std::sync::Arc;

use crate::collaborators::{BoxError, NonceStore};
use crate::errors::ProtocolError;

/// Number of random bytes in a generated nonce.
pub const RANDOM_NONCE_BYTES: usize = 16;

/// Derives the replay key for a `(keyid, nonce)` pair.
pub type NonceKeyFn = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Where a signer's nonce comes from.
#[derive(Clone, Default)]
pub enum NonceSource {
    /// 16 random bytes, base64url without padding.
    #[default]
    Random,
    /// A caller-chosen value.
    Explicit(String),
    /// A caller-supplied generator, invoked once per signature.
    Generator(Arc<dyn Fn() -> String + Send + Sync>),
}

impl NonceSource {
    /// Produces the nonce for one signature.
    pub fn resolve(&self) -> Result<String, ProtocolError> {
        let nonce = match self {
            NonceSource::Random => random_nonce(),
            NonceSource::Explicit(value) => value.clone(),
            NonceSource::Generator(generate) => generate(),
        };
        if nonce.is_empty() {
            return Err(ProtocolError::InvalidOptions(
                "nonce must not be empty".to_string(),
            ));
        }
        Ok(nonce)
    }
}

impl fmt::Debug for NonceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonceSource::Random => f.write_str("Random"),
            NonceSource::Explicit(value) => f.debug_tuple("Explicit").field(value).finish(),
            NonceSource::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

/// Generates a fresh random nonce.
pub fn random_nonce() -> String {
    let mut bytes = [0u8; RANDOM_NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Default replay key: `<keyid>:<nonce>`.
pub fn default_nonce_key(keyid: &str, nonce: &str) -> String {
    format!("{}:{}", keyid, nonce)
}

/// Thread-safe nonce store for single-process deployments and tests.
///
/// Each key maps to the unix second its reservation ends. Expired entries are
/// overwritten on the next `consume`; `purge_expired` drops them eagerly.
#[derive(Debug, Default)]
pub struct MemoryNonceStore {
    inner: DashMap<String, i64>,
}

impl MemoryNonceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Reserves `key` as of `now`; returns `false` while an earlier
    /// reservation is still live.
    pub fn consume_at(&self, key: &str, ttl_seconds: u64, now: i64) -> bool {
        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        let until = now.saturating_add(ttl);
        match self.inner.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if *occupied.get() >= now {
                    return false;
                }
                occupied.insert(until);
                true
            }
            Entry::Vacant(vacant) => {
                vacant.insert(until);
                true
            }
        }
    }

    /// Removes reservations that ended before `now`.
    pub fn purge_expired(&self, now: i64) {
        self.inner.retain(|_, until| *until >= now);
    }

    /// Number of stored reservations, live or not yet purged.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl NonceStore for MemoryNonceStore {
    async fn consume(&self, key: &str, ttl_seconds: u64) -> Result<bool, BoxError> {
        Ok(self.consume_at(key, ttl_seconds, Utc::now().timestamp()))
    }
}
