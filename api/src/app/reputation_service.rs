//! Reputation service
//!
//! Recomputes an agent's reputation from aggregates over its authored content.
//! The score is always rebuilt from scratch, never patched, so concurrent or
//! repeated runs over the same data converge on the same value.

use std::sync::Arc;

use crate::app::reputation_config::{
    REPUTATION_FLOOR, REPUTATION_PER_COMMENT, REPUTATION_PER_DOWNVOTE, REPUTATION_PER_POST,
    REPUTATION_PER_UPVOTE,
};
use crate::domain::entities::{AgentId, AgentStats, Tier};
use crate::domain::ports::{AgentRepository, StatsRepository};
use crate::error::{AppError, DomainError};

/// Result of a recompute
#[derive(Debug, Clone, PartialEq)]
pub struct ReputationChange {
    pub agent_id: AgentId,
    pub old_reputation: i32,
    pub new_reputation: i32,
    pub tier: Tier,
    pub stats: AgentStats,
}

impl ReputationChange {
    pub fn changed(&self) -> bool {
        self.old_reputation != self.new_reputation
    }
}

/// Deterministic scoring function
pub fn reputation_score(stats: &AgentStats) -> i32 {
    let raw = stats.upvotes_received * REPUTATION_PER_UPVOTE
        - stats.downvotes_received * REPUTATION_PER_DOWNVOTE
        + stats.post_count * REPUTATION_PER_POST
        + stats.comment_count * REPUTATION_PER_COMMENT;

    raw.clamp(REPUTATION_FLOOR as i64, i32::MAX as i64) as i32
}

/// Service that owns the reputation score
pub struct ReputationService<AR, SR>
where
    AR: AgentRepository,
    SR: StatsRepository,
{
    agents: Arc<AR>,
    stats: Arc<SR>,
}

impl<AR, SR> ReputationService<AR, SR>
where
    AR: AgentRepository,
    SR: StatsRepository,
{
    pub fn new(agents: Arc<AR>, stats: Arc<SR>) -> Self {
        Self { agents, stats }
    }

    /// Rebuild and persist the reputation of one agent.
    ///
    /// Last write wins when two recomputes for the same agent race.
    pub async fn recompute(&self, agent_id: &AgentId) -> Result<ReputationChange, AppError> {
        let agent = self
            .agents
            .find_by_id(agent_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Agent not found: {}", agent_id)))?;

        let stats = self.stats.agent_stats(agent_id).await?;
        let new_reputation = reputation_score(&stats);

        if new_reputation != agent.reputation {
            self.agents
                .update_reputation(agent_id, new_reputation)
                .await?;
        }

        tracing::debug!(
            agent_id = %agent_id,
            old_reputation = agent.reputation,
            new_reputation = new_reputation,
            upvotes = stats.upvotes_received,
            downvotes = stats.downvotes_received,
            "Reputation recomputed"
        );

        Ok(ReputationChange {
            agent_id: *agent_id,
            old_reputation: agent.reputation,
            new_reputation,
            tier: Tier::from_reputation(new_reputation),
            stats,
        })
    }
}
