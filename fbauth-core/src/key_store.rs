use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::config::{Config, KeyStoreOptions};

#[derive(thiserror::Error, Debug)]
pub enum KeyStoreError {
    #[error("key source returned an unexpected response")]
    InvalidResponse,
    #[error("key source response is not a map of key IDs to PEM strings")]
    DecodingFailed,
    #[error("no signing key found for the requested key ID")]
    KeyNotFound,
    #[error("failed to fetch signing keys: {0}")]
    Network(#[from] reqwest::Error),
}

impl KeyStoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            KeyStoreError::InvalidResponse => "invalid_response",
            KeyStoreError::DecodingFailed => "decoding_failed",
            KeyStoreError::KeyNotFound => "key_not_found",
            KeyStoreError::Network(_) => "network_error",
        }
    }
}

/// Signing keys by key ID, with the time they were fetched.
///
/// Never mutated once published; a refresh swaps in a whole new value.
#[derive(Default)]
struct CacheState {
    keys: HashMap<String, String>,
    fetched_at: Option<Instant>,
}

impl CacheState {
    fn is_stale(&self, options: &KeyStoreOptions) -> bool {
        match self.fetched_at {
            None => true,
            Some(fetched_at) => fetched_at.elapsed() > options.validity,
        }
    }
}

/// Serves PEM-encoded public keys by key ID, refreshing from a remote key
/// source when the cache is stale or does not know the requested ID.
pub struct KeyStore {
    client: reqwest::Client,
    keys_url: String,
    options: KeyStoreOptions,
    cache: ArcSwap<CacheState>,
}

impl KeyStore {
    pub fn new(client: reqwest::Client, keys_url: &str, options: KeyStoreOptions) -> Self {
        Self {
            client,
            keys_url: keys_url.to_string(),
            options,
            cache: ArcSwap::from_pointee(CacheState::default()),
        }
    }

    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        Self::new(client, config.keys_url(), config.key_store_options().clone())
    }

    pub fn keys_url(&self) -> &str {
        &self.keys_url
    }

    /// Returns the public key for `kid`.
    ///
    /// A fresh cache hit returns without any I/O. Otherwise one refresh is
    /// attempted before looking again.
    pub async fn get_key(&self, kid: &str) -> Result<String, KeyStoreError> {
        {
            let state = self.cache.load();
            if !state.is_stale(&self.options) {
                if let Some(key) = state.keys.get(kid) {
                    return Ok(key.clone());
                }
            }
        }

        self.refresh().await?;

        self.cache
            .load()
            .keys
            .get(kid)
            .cloned()
            .ok_or(KeyStoreError::KeyNotFound)
    }

    /// Fetches the key set and replaces the cache with it.
    ///
    /// When the fetch fails and keys are already cached, the old keys are
    /// kept and this returns `Ok(())`.
    pub async fn refresh(&self) -> Result<(), KeyStoreError> {
        match self.fetch().await {
            Ok(keys) => {
                tracing::debug!(
                    url = self.keys_url.as_str(),
                    count = keys.len(),
                    "refreshed signing keys"
                );
                self.cache.store(Arc::new(CacheState {
                    keys,
                    fetched_at: Some(Instant::now()),
                }));
                Ok(())
            }
            Err(e) => {
                let cached = self.cache.load().keys.len();
                if cached == 0 {
                    tracing::warn!(
                        url = self.keys_url.as_str(),
                        kind = e.kind(),
                        err = format!("{}", e),
                        "failed to fetch signing keys"
                    );
                    Err(e)
                } else {
                    tracing::warn!(
                        url = self.keys_url.as_str(),
                        kind = e.kind(),
                        err = format!("{}", e),
                        cached,
                        "failed to refresh signing keys, serving stale keys"
                    );
                    Ok(())
                }
            }
        }
    }

    /// Key IDs currently cached, sorted.
    pub fn key_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.cache.load().keys.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Whether the next lookup will go to the network.
    pub fn is_stale(&self) -> bool {
        self.cache.load().is_stale(&self.options)
    }

    async fn fetch(&self) -> Result<HashMap<String, String>, KeyStoreError> {
        let mut response = self
            .client
            .get(&self.keys_url)
            .header(ACCEPT, "application/json")
            .timeout(self.options.request_timeout)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            tracing::debug!(
                status = response.status().as_u16(),
                "key source returned non-success status"
            );
            return Err(KeyStoreError::InvalidResponse);
        }

        let limit = self.options.max_response_bytes;
        if let Some(length) = response.content_length() {
            if length > limit as u64 {
                tracing::debug!(length, limit, "key source response too large");
                return Err(KeyStoreError::InvalidResponse);
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                tracing::debug!(limit, "key source response too large");
                return Err(KeyStoreError::InvalidResponse);
            }
            body.extend_from_slice(&chunk);
        }

        let entries: KeyEntries =
            serde_json::from_slice(&body).map_err(|_| KeyStoreError::DecodingFailed)?;
        Ok(entries.into_key_set(self.options.max_keys))
    }
}

/// Key source entries in document order.
struct KeyEntries(Vec<(String, String)>);

impl KeyEntries {
    /// Keeps the first `max_keys` distinct key IDs; the first value seen for
    /// a repeated ID wins.
    fn into_key_set(self, max_keys: usize) -> HashMap<String, String> {
        let mut keys = HashMap::new();
        for (kid, pem) in self.0 {
            if keys.len() >= max_keys {
                break;
            }
            keys.entry(kid).or_insert(pem);
        }
        keys
    }
}

impl<'de> Deserialize<'de> for KeyEntries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = KeyEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping key IDs to PEM strings")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((kid, pem)) = map.next_entry::<String, String>()? {
                    entries.push((kid, pem));
                }
                Ok(KeyEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}
