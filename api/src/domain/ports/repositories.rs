//! Repository port traits
//!
//! These traits define the interface for data persistence.
//! Implementations are provided by adapters (e.g., PostgreSQL).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::{
    Agent, AgentId, AgentStats, Comment, CommentId, NewAgent, NewComment, NewPost, NewVote, Post,
    PostId, Target, TargetRef, Vote, VoteDirection, VoteId,
};
use crate::error::DomainError;

/// Repository for Agent entities
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Find an agent by ID
    async fn find_by_id(&self, id: &AgentId) -> Result<Option<Agent>, DomainError>;

    /// Find an agent by API key hash
    async fn find_by_api_key_hash(&self, hash: &str) -> Result<Option<Agent>, DomainError>;

    /// Find an agent by name
    async fn find_by_name(&self, name: &str) -> Result<Option<Agent>, DomainError>;

    /// Create a new agent
    async fn create(&self, agent: &NewAgent) -> Result<Agent, DomainError>;

    /// Update the last seen timestamp
    async fn update_last_seen(&self, id: &AgentId) -> Result<(), DomainError>;

    /// Overwrite the reputation score (and the tier derived from it)
    async fn update_reputation(&self, id: &AgentId, reputation: i32) -> Result<(), DomainError>;

    /// Get top agents by reputation
    async fn find_top_by_reputation(&self, limit: i64) -> Result<Vec<Agent>, DomainError>;
}

/// Repository for Post entities
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Find a post by ID, soft-deleted or not
    async fn find_by_id(&self, id: &PostId) -> Result<Option<Post>, DomainError>;

    /// Create a new post with a zero vote count
    async fn create(&self, post: &NewPost) -> Result<Post, DomainError>;

    /// Mark a post deleted. Returns false if it was already deleted or missing.
    async fn soft_delete(&self, id: &PostId, at: DateTime<Utc>) -> Result<bool, DomainError>;
}

/// Repository for Comment entities
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Find a comment by ID, soft-deleted or not
    async fn find_by_id(&self, id: &CommentId) -> Result<Option<Comment>, DomainError>;

    /// Create a new comment with a zero vote count
    async fn create(&self, comment: &NewComment) -> Result<Comment, DomainError>;

    /// Mark a comment deleted. Returns false if it was already deleted or missing.
    async fn soft_delete(&self, id: &CommentId, at: DateTime<Utc>) -> Result<bool, DomainError>;
}

/// Read-only aggregates for reputation scoring
#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// Aggregate an agent's live content and the votes it has received
    async fn agent_stats(&self, agent_id: &AgentId) -> Result<AgentStats, DomainError>;
}

/// Transactional access to the target store and the vote ledger.
///
/// Everything done through one [`VoteTransaction`] commits or rolls back as
/// a unit. Dropping a transaction without calling `commit` rolls it back.
#[async_trait]
pub trait VoteStore: Send + Sync {
    type Transaction: VoteTransaction;

    /// Open a new transaction
    async fn begin(&self) -> Result<Self::Transaction, DomainError>;
}

/// One open transaction over targets and votes
#[async_trait]
pub trait VoteTransaction: Send + Sized {
    /// Read a target and lock its row until the transaction ends.
    /// Soft-deleted targets are returned; callers decide what that means.
    async fn get_target_for_update(
        &mut self,
        target: &TargetRef,
    ) -> Result<Option<Target>, DomainError>;

    /// Find the voter's vote on a target, locking it if present
    async fn find_vote(
        &mut self,
        voter_id: &AgentId,
        target: &TargetRef,
    ) -> Result<Option<Vote>, DomainError>;

    /// Insert a vote row. A duplicate (voter, target) yields `DomainError::Conflict`.
    async fn insert_vote(&mut self, vote: &NewVote) -> Result<Vote, DomainError>;

    /// Flip the direction of an existing vote
    async fn update_vote_direction(
        &mut self,
        id: &VoteId,
        direction: VoteDirection,
    ) -> Result<(), DomainError>;

    /// Delete a vote row
    async fn delete_vote(&mut self, id: &VoteId) -> Result<(), DomainError>;

    /// Atomically add `delta` to the target's vote count, returning the new count
    async fn apply_count_delta(
        &mut self,
        target: &TargetRef,
        delta: i32,
    ) -> Result<i32, DomainError>;

    /// Sum of vote directions over all ledger rows for the target
    async fn sum_votes(&mut self, target: &TargetRef) -> Result<i64, DomainError>;

    /// Overwrite the target's vote count
    async fn set_vote_count(&mut self, target: &TargetRef, count: i32)
        -> Result<(), DomainError>;

    /// Commit all changes made in this transaction
    async fn commit(self) -> Result<(), DomainError>;
}
