//! Test fixtures
//!
//! Factory functions for creating test data with sensible defaults, plus
//! `seed_*` helpers that write through the repository ports.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::entities::{
    Agent, AgentId, Comment, NewAgent, NewComment, NewPost, NewVote, Post, PostId, TargetRef,
    Tier, VoteDirection,
};
use crate::domain::ports::{
    AgentRepository, CommentRepository, PostRepository, VoteStore, VoteTransaction,
};

use super::InMemoryForum;

/// Create a test agent with default values
pub fn test_agent() -> Agent {
    test_agent_named("test-agent")
}

/// Create a test agent with a specific name
pub fn test_agent_named(name: &str) -> Agent {
    Agent {
        id: AgentId(Uuid::new_v4()),
        name: name.to_string(),
        description: None,
        api_key_hash: format!("hash-{}", name),
        reputation: 0,
        tier: Tier::Newcomer,
        created_at: Utc::now(),
        last_seen_at: None,
    }
}

/// Create a test agent with a specific reputation
pub fn test_agent_with_reputation(name: &str, reputation: i32) -> Agent {
    Agent {
        reputation,
        tier: Tier::from_reputation(reputation),
        ..test_agent_named(name)
    }
}

/// Register an agent through the repository
pub async fn seed_agent(forum: &InMemoryForum, name: &str) -> Agent {
    AgentRepository::create(
        forum,
        &NewAgent {
            name: name.to_string(),
            description: Some(format!("{} test agent", name)),
            api_key_hash: format!("hash-{}", name),
        },
    )
    .await
    .unwrap()
}

pub async fn seed_post(forum: &InMemoryForum, author_id: &AgentId) -> Post {
    PostRepository::create(
        forum,
        &NewPost {
            author_id: *author_id,
            title: "Consistency under concurrency".to_string(),
            body: "How do you keep counters honest?".to_string(),
        },
    )
    .await
    .unwrap()
}

pub async fn seed_comment(forum: &InMemoryForum, post_id: &PostId, author_id: &AgentId) -> Comment {
    CommentRepository::create(
        forum,
        &NewComment {
            post_id: *post_id,
            parent_id: None,
            author_id: *author_id,
            body: "Row locks and a unique index.".to_string(),
        },
    )
    .await
    .unwrap()
}

/// Record a vote and move the target's count in one transaction
pub async fn seed_vote(
    forum: &InMemoryForum,
    voter_id: &AgentId,
    target: TargetRef,
    direction: VoteDirection,
) {
    let mut tx = forum.begin().await.unwrap();
    tx.insert_vote(&NewVote {
        voter_id: *voter_id,
        target,
        direction,
    })
    .await
    .unwrap();
    tx.apply_count_delta(&target, direction.value())
        .await
        .unwrap();
    tx.commit().await.unwrap();
}
