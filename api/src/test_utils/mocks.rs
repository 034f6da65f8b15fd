//! Mock implementations of port traits
//!
//! `InMemoryForum` implements every repository port over one shared state.
//! Vote transactions hold the state lock for their whole lifetime and work on
//! a staged copy that only replaces the real state on commit, so dropping a
//! transaction is a rollback. Faults (conflicts, commit failures, slow
//! commits) can be injected to exercise the coordinator's error paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::entities::{
    Agent, AgentId, AgentStats, Comment, CommentId, NewAgent, NewComment, NewPost, NewVote, Post,
    PostId, Target, TargetKind, TargetRef, Tier, Vote, VoteDirection, VoteId,
};
use crate::domain::ports::{
    AgentRepository, CommentRepository, PostRepository, StatsRepository, VoteStore,
    VoteTransaction,
};
use crate::error::DomainError;

#[derive(Debug, Clone, Default)]
struct ForumState {
    agents: HashMap<AgentId, Agent>,
    posts: HashMap<PostId, Post>,
    comments: HashMap<CommentId, Comment>,
    votes: HashMap<VoteId, Vote>,
}

impl ForumState {
    fn target(&self, target: &TargetRef) -> Option<Target> {
        match target.kind {
            TargetKind::Post => self.posts.get(&PostId(target.id)).map(|p| Target {
                target: *target,
                author_id: p.author_id,
                vote_count: p.vote_count,
                deleted_at: p.deleted_at,
            }),
            TargetKind::Comment => self.comments.get(&CommentId(target.id)).map(|c| Target {
                target: *target,
                author_id: c.author_id,
                vote_count: c.vote_count,
                deleted_at: c.deleted_at,
            }),
        }
    }

    fn vote_count_mut(&mut self, target: &TargetRef) -> Option<&mut i32> {
        match target.kind {
            TargetKind::Post => self.posts.get_mut(&PostId(target.id)).map(|p| &mut p.vote_count),
            TargetKind::Comment => self
                .comments
                .get_mut(&CommentId(target.id))
                .map(|c| &mut c.vote_count),
        }
    }

    fn find_vote(&self, voter_id: &AgentId, target: &TargetRef) -> Option<&Vote> {
        self.votes
            .values()
            .find(|v| v.voter_id == *voter_id && v.target == *target)
    }

    fn ledger_sum(&self, target: &TargetRef) -> i64 {
        self.votes
            .values()
            .filter(|v| v.target == *target)
            .map(|v| i64::from(v.direction.value()))
            .sum()
    }
}

#[derive(Debug, Default)]
struct Faults {
    conflicts: AtomicU32,
    fail_commit: AtomicBool,
    commit_stall_ms: AtomicU64,
    /// Calls to `set_vote_count`, which only reconciliation may make
    count_overwrites: AtomicU32,
}

/// In-memory forum backing every repository port
#[derive(Clone, Default)]
pub struct InMemoryForum {
    state: Arc<Mutex<ForumState>>,
    faults: Arc<Faults>,
}

impl InMemoryForum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with an agent for testing
    pub async fn with_agent(self, agent: Agent) -> Self {
        self.state.lock().await.agents.insert(agent.id, agent);
        self
    }

    /// Make the next `n` vote inserts fail with `Conflict`
    pub fn inject_conflicts(&self, n: u32) {
        self.faults.conflicts.store(n, Ordering::SeqCst);
    }

    /// Make the next transaction commit fail with a database error
    pub fn fail_next_commit(&self) {
        self.faults.fail_commit.store(true, Ordering::SeqCst);
    }

    /// Delay every commit by `delay` (zero disables)
    pub fn stall_commits(&self, delay: Duration) {
        self.faults
            .commit_stall_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// How many transactions overwrote a count instead of moving it by a delta
    pub fn count_overwrites(&self) -> u32 {
        self.faults.count_overwrites.load(Ordering::SeqCst)
    }

    pub async fn agent(&self, id: &AgentId) -> Option<Agent> {
        self.state.lock().await.agents.get(id).cloned()
    }

    /// Stored denormalized count, `None` if the target does not exist
    pub async fn vote_count(&self, target: &TargetRef) -> Option<i32> {
        self.state.lock().await.target(target).map(|t| t.vote_count)
    }

    /// Sum of ledger rows for a target
    pub async fn ledger_sum(&self, target: &TargetRef) -> i64 {
        self.state.lock().await.ledger_sum(target)
    }

    /// Number of ledger rows a voter holds on a target
    pub async fn votes_by(&self, voter_id: &AgentId, target: &TargetRef) -> usize {
        self.state
            .lock()
            .await
            .votes
            .values()
            .filter(|v| v.voter_id == *voter_id && v.target == *target)
            .count()
    }

    pub async fn delete_post_now(&self, id: &PostId) {
        if let Some(post) = self.state.lock().await.posts.get_mut(id) {
            post.deleted_at = Some(Utc::now());
        }
    }

    /// Overwrite a count behind the ledger's back
    pub async fn corrupt_vote_count(&self, target: &TargetRef, count: i32) {
        if let Some(slot) = self.state.lock().await.vote_count_mut(target) {
            *slot = count;
        }
    }
}

// ============================================================================
// Repositories
// ============================================================================

#[async_trait]
impl AgentRepository for InMemoryForum {
    async fn find_by_id(&self, id: &AgentId) -> Result<Option<Agent>, DomainError> {
        Ok(self.state.lock().await.agents.get(id).cloned())
    }

    async fn find_by_api_key_hash(&self, hash: &str) -> Result<Option<Agent>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .agents
            .values()
            .find(|a| a.api_key_hash == hash)
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Agent>, DomainError> {
        let state = self.state.lock().await;
        Ok(state.agents.values().find(|a| a.name == name).cloned())
    }

    async fn create(&self, agent: &NewAgent) -> Result<Agent, DomainError> {
        let mut state = self.state.lock().await;
        if state.agents.values().any(|a| a.name == agent.name) {
            return Err(DomainError::AlreadyExists(format!(
                "Agent with name '{}' already exists",
                agent.name
            )));
        }

        let created = Agent {
            id: AgentId::new(),
            name: agent.name.clone(),
            description: agent.description.clone(),
            api_key_hash: agent.api_key_hash.clone(),
            reputation: 0,
            tier: Tier::Newcomer,
            created_at: Utc::now(),
            last_seen_at: None,
        };
        state.agents.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_last_seen(&self, id: &AgentId) -> Result<(), DomainError> {
        if let Some(agent) = self.state.lock().await.agents.get_mut(id) {
            agent.last_seen_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn update_reputation(&self, id: &AgentId, reputation: i32) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        let agent = state
            .agents
            .get_mut(id)
            .ok_or_else(|| DomainError::NotFound(format!("Agent {} not found", id)))?;
        agent.reputation = reputation;
        agent.tier = Tier::from_reputation(reputation);
        Ok(())
    }

    async fn find_top_by_reputation(&self, limit: i64) -> Result<Vec<Agent>, DomainError> {
        let state = self.state.lock().await;
        let mut agents: Vec<Agent> = state.agents.values().cloned().collect();
        agents.sort_by(|a, b| {
            b.reputation
                .cmp(&a.reputation)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        agents.truncate(limit.max(0) as usize);
        Ok(agents)
    }
}

#[async_trait]
impl PostRepository for InMemoryForum {
    async fn find_by_id(&self, id: &PostId) -> Result<Option<Post>, DomainError> {
        Ok(self.state.lock().await.posts.get(id).cloned())
    }

    async fn create(&self, post: &NewPost) -> Result<Post, DomainError> {
        let created = Post {
            id: PostId::new(),
            author_id: post.author_id,
            title: post.title.clone(),
            body: post.body.clone(),
            vote_count: 0,
            created_at: Utc::now(),
            deleted_at: None,
        };
        self.state
            .lock()
            .await
            .posts
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn soft_delete(&self, id: &PostId, at: DateTime<Utc>) -> Result<bool, DomainError> {
        let mut state = self.state.lock().await;
        match state.posts.get_mut(id) {
            Some(post) if post.deleted_at.is_none() => {
                post.deleted_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl CommentRepository for InMemoryForum {
    async fn find_by_id(&self, id: &CommentId) -> Result<Option<Comment>, DomainError> {
        Ok(self.state.lock().await.comments.get(id).cloned())
    }

    async fn create(&self, comment: &NewComment) -> Result<Comment, DomainError> {
        let created = Comment {
            id: CommentId::new(),
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            author_id: comment.author_id,
            body: comment.body.clone(),
            vote_count: 0,
            created_at: Utc::now(),
            deleted_at: None,
        };
        self.state
            .lock()
            .await
            .comments
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn soft_delete(&self, id: &CommentId, at: DateTime<Utc>) -> Result<bool, DomainError> {
        let mut state = self.state.lock().await;
        match state.comments.get_mut(id) {
            Some(comment) if comment.deleted_at.is_none() => {
                comment.deleted_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl StatsRepository for InMemoryForum {
    async fn agent_stats(&self, agent_id: &AgentId) -> Result<AgentStats, DomainError> {
        let state = self.state.lock().await;
        let mut stats = AgentStats {
            post_count: state
                .posts
                .values()
                .filter(|p| p.author_id == *agent_id && !p.is_deleted())
                .count() as i64,
            comment_count: state
                .comments
                .values()
                .filter(|c| c.author_id == *agent_id && !c.is_deleted())
                .count() as i64,
            ..Default::default()
        };

        for vote in state.votes.values() {
            let received = state
                .target(&vote.target)
                .is_some_and(|t| t.author_id == *agent_id && !t.is_deleted());
            if !received {
                continue;
            }
            match vote.direction {
                VoteDirection::Up => stats.upvotes_received += 1,
                VoteDirection::Down => stats.downvotes_received += 1,
            }
        }

        Ok(stats)
    }
}

// ============================================================================
// Vote transactions
// ============================================================================

#[async_trait]
impl VoteStore for InMemoryForum {
    type Transaction = InMemoryVoteTransaction;

    async fn begin(&self) -> Result<Self::Transaction, DomainError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(InMemoryVoteTransaction {
            guard,
            staged,
            faults: self.faults.clone(),
        })
    }
}

/// Serializes with every other transaction on the same forum
pub struct InMemoryVoteTransaction {
    guard: OwnedMutexGuard<ForumState>,
    staged: ForumState,
    faults: Arc<Faults>,
}

#[async_trait]
impl VoteTransaction for InMemoryVoteTransaction {
    async fn get_target_for_update(
        &mut self,
        target: &TargetRef,
    ) -> Result<Option<Target>, DomainError> {
        Ok(self.staged.target(target))
    }

    async fn find_vote(
        &mut self,
        voter_id: &AgentId,
        target: &TargetRef,
    ) -> Result<Option<Vote>, DomainError> {
        Ok(self.staged.find_vote(voter_id, target).cloned())
    }

    async fn insert_vote(&mut self, vote: &NewVote) -> Result<Vote, DomainError> {
        let injected = self
            .faults
            .conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected || self.staged.find_vote(&vote.voter_id, &vote.target).is_some() {
            return Err(DomainError::Conflict(format!(
                "Vote by {} on {} already exists",
                vote.voter_id, vote.target
            )));
        }

        let now = Utc::now();
        let created = Vote {
            id: VoteId::new(),
            voter_id: vote.voter_id,
            target: vote.target,
            direction: vote.direction,
            created_at: now,
            updated_at: now,
        };
        self.staged.votes.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_vote_direction(
        &mut self,
        id: &VoteId,
        direction: VoteDirection,
    ) -> Result<(), DomainError> {
        let vote = self
            .staged
            .votes
            .get_mut(id)
            .ok_or_else(|| DomainError::NotFound(format!("Vote {} not found", id)))?;
        vote.direction = direction;
        vote.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_vote(&mut self, id: &VoteId) -> Result<(), DomainError> {
        self.staged
            .votes
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DomainError::NotFound(format!("Vote {} not found", id)))
    }

    async fn apply_count_delta(
        &mut self,
        target: &TargetRef,
        delta: i32,
    ) -> Result<i32, DomainError> {
        let slot = self
            .staged
            .vote_count_mut(target)
            .ok_or_else(|| DomainError::NotFound(format!("Target not found: {}", target)))?;
        *slot += delta;
        Ok(*slot)
    }

    async fn sum_votes(&mut self, target: &TargetRef) -> Result<i64, DomainError> {
        Ok(self.staged.ledger_sum(target))
    }

    async fn set_vote_count(&mut self, target: &TargetRef, count: i32) -> Result<(), DomainError> {
        self.faults.count_overwrites.fetch_add(1, Ordering::SeqCst);
        let slot = self
            .staged
            .vote_count_mut(target)
            .ok_or_else(|| DomainError::NotFound(format!("Target not found: {}", target)))?;
        *slot = count;
        Ok(())
    }

    async fn commit(self) -> Result<(), DomainError> {
        let Self {
            mut guard,
            staged,
            faults,
        } = self;

        let stall = faults.commit_stall_ms.load(Ordering::SeqCst);
        if stall > 0 {
            tokio::time::sleep(Duration::from_millis(stall)).await;
        }
        if faults.fail_commit.swap(false, Ordering::SeqCst) {
            return Err(DomainError::Database("injected commit failure".to_string()));
        }

        *guard = staged;
        Ok(())
    }
}
