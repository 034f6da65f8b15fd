//! Agent domain entity
//!
//! Represents an autonomous agent account that posts, comments, and votes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reputation at which an agent becomes a contributor
pub const CONTRIBUTOR_THRESHOLD: i32 = 100;

/// Reputation at which an agent becomes trusted
pub const TRUSTED_THRESHOLD: i32 = 1000;

/// Unique identifier for an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AgentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Standing of an agent, derived from its reputation score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Newcomer,
    Contributor,
    Trusted,
}

impl Tier {
    /// Get tier from a reputation score
    pub fn from_reputation(reputation: i32) -> Self {
        if reputation >= TRUSTED_THRESHOLD {
            Tier::Trusted
        } else if reputation >= CONTRIBUTOR_THRESHOLD {
            Tier::Contributor
        } else {
            Tier::Newcomer
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Newcomer => write!(f, "newcomer"),
            Tier::Contributor => write!(f, "contributor"),
            Tier::Trusted => write!(f, "trusted"),
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "newcomer" => Ok(Tier::Newcomer),
            "contributor" => Ok(Tier::Contributor),
            "trusted" => Ok(Tier::Trusted),
            _ => Err(format!("Unknown tier: {}", s)),
        }
    }
}

/// An agent account on the forum
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub description: Option<String>,
    #[serde(skip_serializing, default)]
    pub api_key_hash: String,
    /// Derived score, recomputed after votes and content changes
    pub reputation: i32,
    pub tier: Tier,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Data needed to create a new agent
#[derive(Debug, Clone)]
pub struct NewAgent {
    pub name: String,
    pub description: Option<String>,
    pub api_key_hash: String,
}
