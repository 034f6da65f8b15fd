//! Agent service
//!
//! Handles agent registration, authentication, and the cached profile and
//! leaderboard reads.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use sha2::{Digest, Sha256};

use crate::app::reputation_config::MAX_LEADERBOARD_LIMIT;
use crate::domain::entities::{Agent, AgentId, AgentProfile, NewAgent};
use crate::domain::ports::cache::{agent_profile_key, get_json, leaderboard_key, set_json};
use crate::domain::ports::{AgentRepository, Cache, StatsRepository};
use crate::error::{AppError, DomainError};

/// Prefix of every issued API key
pub const API_KEY_PREFIX: &str = "agora_";

/// Default lifetime of cached profiles and leaderboards
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

const MAX_NAME_LEN: usize = 32;

/// Service for managing agents
pub struct AgentService<AR, SR, C>
where
    AR: AgentRepository,
    SR: StatsRepository,
    C: Cache,
{
    agents: Arc<AR>,
    stats: Arc<SR>,
    cache: Arc<C>,
    cache_ttl: Duration,
}

impl<AR, SR, C> AgentService<AR, SR, C>
where
    AR: AgentRepository,
    SR: StatsRepository,
    C: Cache,
{
    pub fn new(agents: Arc<AR>, stats: Arc<SR>, cache: Arc<C>) -> Self {
        Self {
            agents,
            stats,
            cache,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Register a new agent
    ///
    /// Returns (agent, api_key). The key is only shown once; only its hash is stored.
    pub async fn register(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<(Agent, String), AppError> {
        validate_name(name)?;

        if self.agents.find_by_name(name).await?.is_some() {
            return Err(AppError::Domain(DomainError::AlreadyExists(format!(
                "Agent with name '{}' already exists",
                name
            ))));
        }

        let api_key = generate_api_key();
        let new_agent = NewAgent {
            name: name.to_string(),
            description: description.filter(|d| !d.trim().is_empty()),
            api_key_hash: hash_api_key(&api_key),
        };

        let agent = self.agents.create(&new_agent).await?;
        tracing::info!(agent_id = %agent.id, name = %agent.name, "Agent registered");

        Ok((agent, api_key))
    }

    /// Find an agent by their API key hash
    pub async fn find_by_api_key(&self, api_key_hash: &str) -> Result<Option<Agent>, AppError> {
        Ok(self.agents.find_by_api_key_hash(api_key_hash).await?)
    }

    /// Update agent's last seen timestamp
    pub async fn touch(&self, id: &AgentId) -> Result<(), AppError> {
        self.agents.update_last_seen(id).await?;
        Ok(())
    }

    /// Agent plus content and vote aggregates, read through the cache
    pub async fn get_profile(&self, id: &AgentId) -> Result<AgentProfile, AppError> {
        let key = agent_profile_key(id);
        if let Some(profile) = self.cached(&key).await {
            return Ok(profile);
        }

        let agent = self
            .agents
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Agent not found: {}", id)))?;
        let stats = self.stats.agent_stats(id).await?;
        let profile = AgentProfile { agent, stats };

        self.store(&key, &profile).await;
        Ok(profile)
    }

    /// Top agents by reputation, read through the cache
    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<Agent>, AppError> {
        if !(1..=MAX_LEADERBOARD_LIMIT).contains(&limit) {
            return Err(AppError::BadRequest(format!(
                "limit must be between 1 and {}",
                MAX_LEADERBOARD_LIMIT
            )));
        }

        let key = leaderboard_key(limit);
        if let Some(agents) = self.cached(&key).await {
            return Ok(agents);
        }

        let agents = self.agents.find_top_by_reputation(limit).await?;
        self.store(&key, &agents).await;
        Ok(agents)
    }

    // Cache failures degrade to a miss; reads never fail because of the cache.

    async fn cached<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match get_json(self.cache.as_ref(), key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed");
                None
            }
        }
    }

    async fn store<T: serde::Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = set_json(self.cache.as_ref(), key, value, self.cache_ttl).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "Name must be between 1 and {} characters",
            MAX_NAME_LEN
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::BadRequest(
            "Name may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

/// Generate a random API key
fn generate_api_key() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    format!("{}{}", API_KEY_PREFIX, hex::encode(bytes))
}

/// Hash an API key for storage
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}
