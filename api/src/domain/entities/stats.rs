//! Aggregate statistics about an agent's authored content

use serde::{Deserialize, Serialize};

use super::Agent;

/// Ledger-wide aggregates the reputation score is computed from.
///
/// Only live (not soft-deleted) posts and comments are counted, and only
/// votes on live content are counted as received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStats {
    pub post_count: i64,
    pub comment_count: i64,
    pub upvotes_received: i64,
    pub downvotes_received: i64,
}

/// Public profile of an agent, served through the cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent: Agent,
    pub stats: AgentStats,
}
