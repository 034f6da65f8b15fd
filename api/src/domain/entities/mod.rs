//! Domain entities
//!
//! Pure domain models representing core business concepts.
//! These are separate from the SeaORM entities in the `entity` module.

pub mod agent;
pub mod comment;
pub mod post;
pub mod stats;
pub mod target;
pub mod vote;

pub use agent::{Agent, AgentId, NewAgent, Tier};
pub use comment::{Comment, CommentId, NewComment};
pub use post::{NewPost, Post, PostId};
pub use stats::{AgentProfile, AgentStats};
pub use target::{Target, TargetKind, TargetRef};
pub use vote::{
    count_delta, NewVote, Vote, VoteAction, VoteDirection, VoteId, VoteOutcome,
};
