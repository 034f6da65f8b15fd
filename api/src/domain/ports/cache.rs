//! Cache port
//!
//! Read-through cache consulted for aggregate reads (profiles, leaderboards,
//! targets). Values are JSON documents; eviction policy is the adapter's concern.

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::entities::{AgentId, TargetRef};
use crate::error::CacheError;

/// Prefix shared by every leaderboard entry
pub const LEADERBOARD_PATTERN: &str = "leaderboard:*";

/// Cache key for a post or comment
pub fn target_key(target: &TargetRef) -> String {
    format!("target:{}:{}", target.kind, target.id)
}

/// Cache key for an agent's public profile
pub fn agent_profile_key(agent_id: &AgentId) -> String {
    format!("agent:{}:profile", agent_id)
}

/// Cache key for a leaderboard page
pub fn leaderboard_key(limit: i64) -> String {
    format!("leaderboard:{}", limit)
}

/// Keys to invalidate after an author's content or received votes change
pub fn author_keys(author_id: &AgentId) -> Vec<String> {
    vec![
        agent_profile_key(author_id),
        LEADERBOARD_PATTERN.to_string(),
    ]
}

#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a cached value, `None` on miss or expiry
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError>;

    /// Store a value for `ttl`
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration)
        -> Result<(), CacheError>;

    /// Remove a key, or every key starting with the prefix when `pattern` ends in `*`.
    /// Returns the number of entries removed.
    async fn invalidate(&self, pattern: &str) -> Result<u64, CacheError>;
}

/// Read a cached value and decode it
pub async fn get_json<C, T>(cache: &C, key: &str) -> Result<Option<T>, CacheError>
where
    C: Cache + ?Sized,
    T: DeserializeOwned,
{
    match cache.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Encode a value and store it for `ttl`
pub async fn set_json<C, T>(cache: &C, key: &str, value: &T, ttl: Duration) -> Result<(), CacheError>
where
    C: Cache + ?Sized,
    T: Serialize,
{
    let value = serde_json::to_value(value)?;
    cache.set(key, value, ttl).await
}
