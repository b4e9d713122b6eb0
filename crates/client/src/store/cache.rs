//! Page caches, the search cache and the session id.
//!
//! Pages keep their last inputs and results under a namespace prefix
//! (`marketing_produits`, `journal_filtres`, ...) so they come back as the
//! user left them.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::backend::StorageBackend;
use crate::error::StorageError;

/// Key holding the visitor's session id.
pub const SESSION_KEY: &str = "marketplace_session_id";
/// Prefix of search cache keys.
pub const SEARCH_PREFIX: &str = "jumia_search_";
/// Default lifetime of a cached search.
pub const DEFAULT_SEARCH_TTL: Duration = Duration::from_secs(3600);

/// Page whose state is cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    Alibaba,
    Analyse,
    Marketing,
    Journal,
    GoogleTrends,
}

impl CacheNamespace {
    /// Key prefix of the namespace.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Alibaba => "alibaba_",
            Self::Analyse => "analyse_",
            Self::Marketing => "marketing_",
            Self::Journal => "journal_",
            Self::GoogleTrends => "googletrends_",
        }
    }
}

/// JSON values of one page, under its namespace prefix.
#[derive(Clone)]
pub struct PageCache {
    backend: Arc<dyn StorageBackend>,
    namespace: CacheNamespace,
}

impl PageCache {
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>, namespace: CacheNamespace) -> Self {
        Self { backend, namespace }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{name}", self.namespace.prefix())
    }

    /// The cached value of `name`. Missing, unreadable or mistyped values
    /// are misses.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let key = self.key(name);
        let text = match self.backend.get(&key) {
            Ok(text) => text?,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read page cache");
                return None;
            }
        };
        serde_json::from_str(&text)
            .inspect_err(|e| tracing::debug!(key, error = %e, "Ignoring stale page cache entry"))
            .ok()
    }

    /// Cache `value` under `name`.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized or stored.
    pub fn set<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)?;
        self.backend.set(&self.key(name), &text)
    }

    /// Forget `name`.
    ///
    /// # Errors
    ///
    /// Returns error if the key cannot be removed.
    pub fn remove(&self, name: &str) -> Result<(), StorageError> {
        self.backend.remove(&self.key(name))
    }

    /// Forget everything in the namespace. Returns how many keys were removed.
    ///
    /// # Errors
    ///
    /// Returns error if the keys cannot be listed or removed.
    pub fn clear(&self) -> Result<usize, StorageError> {
        let prefix = self.namespace.prefix();
        let mut removed = 0;
        for key in self.backend.keys()? {
            if key.starts_with(prefix) {
                self.backend.remove(&key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for PageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize, Deserialize)]
struct CachedSearch {
    stored_at: DateTime<Utc>,
    data: Value,
}

/// Search results keyed by their parameters, with an expiry.
#[derive(Clone)]
pub struct SearchCache {
    backend: Arc<dyn StorageBackend>,
    ttl: chrono::Duration,
}

impl SearchCache {
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_ttl(backend, DEFAULT_SEARCH_TTL)
    }

    #[must_use]
    pub fn with_ttl(backend: Arc<dyn StorageBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Storage key for a parameter set. Parameter order does not matter and
    /// empty values are ignored.
    #[must_use]
    pub fn key(params: &[(&str, &str)]) -> String {
        let canonical: BTreeMap<&str, &str> = params
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .copied()
            .collect();
        let joined = canonical
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{SEARCH_PREFIX}{joined}")
    }

    /// Cached results for `params`, unless expired.
    #[must_use]
    pub fn get(&self, params: &[(&str, &str)]) -> Option<Value> {
        self.get_at(params, Utc::now())
    }

    fn get_at(&self, params: &[(&str, &str)], now: DateTime<Utc>) -> Option<Value> {
        let key = Self::key(params);
        let text = self.backend.get(&key).ok()??;
        let Ok(cached) = serde_json::from_str::<CachedSearch>(&text) else {
            self.evict(&key);
            return None;
        };

        if now.signed_duration_since(cached.stored_at) > self.ttl {
            tracing::debug!(key, "Search cache entry expired");
            self.evict(&key);
            return None;
        }
        Some(cached.data)
    }

    /// Cache `data` as the results for `params`.
    ///
    /// # Errors
    ///
    /// Returns error if the entry cannot be stored.
    pub fn set(&self, params: &[(&str, &str)], data: Value) -> Result<(), StorageError> {
        self.set_at(params, data, Utc::now())
    }

    fn set_at(
        &self,
        params: &[(&str, &str)],
        data: Value,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let text = serde_json::to_string(&CachedSearch {
            stored_at: now,
            data,
        })?;
        self.backend.set(&Self::key(params), &text)
    }

    fn evict(&self, key: &str) {
        if let Err(e) = self.backend.remove(key) {
            tracing::warn!(key, error = %e, "Failed to evict search cache entry");
        }
    }
}

impl std::fmt::Debug for SearchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// The visitor's session id, created and stored on first use.
///
/// # Errors
///
/// Returns error if a new id cannot be stored.
pub fn session_id(backend: &dyn StorageBackend) -> Result<String, StorageError> {
    if let Some(existing) = backend.get(SESSION_KEY)?.filter(|id| !id.is_empty()) {
        return Ok(existing);
    }

    let random = uuid::Uuid::new_v4().simple().to_string();
    let id = format!(
        "session_{}_{}",
        Utc::now().timestamp_millis(),
        random.get(..9).unwrap_or(&random)
    );
    backend.set(SESSION_KEY, &id)?;
    Ok(id)
}
