//! Domain ports (traits)
//!
//! Port traits define interfaces that the domain layer requires.
//! Adapters provide concrete implementations of these traits.

pub mod cache;
pub mod repositories;

pub use cache::Cache;
pub use repositories::{
    AgentRepository, CommentRepository, PostRepository, StatsRepository, VoteStore,
    VoteTransaction,
};
