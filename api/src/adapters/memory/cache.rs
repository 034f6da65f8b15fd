//! Process-local cache
//!
//! Entries live in a `DashMap` and expire lazily: an expired entry is
//! dropped the next time it is read, and `purge_expired` sweeps the rest.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::ports::Cache;
use crate::error::CacheError;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                tracing::trace!(key, "Cache hit");
                return Ok(Some(entry.value.clone()));
            }
        }
        // Read guard is released above; remove only if still expired
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        tracing::trace!(key, "Cache miss");
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn invalidate(&self, pattern: &str) -> Result<u64, CacheError> {
        let removed = match pattern.strip_suffix('*') {
            Some(prefix) => {
                let before = self.entries.len();
                self.entries.retain(|key, _| !key.starts_with(prefix));
                before.saturating_sub(self.entries.len()) as u64
            }
            None => u64::from(self.entries.remove(pattern).is_some()),
        };

        tracing::debug!(pattern, removed, "Cache invalidated");
        Ok(removed)
    }
}
