//! Adapters layer
//!
//! Implementations of port traits for external systems.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryCache;
pub use postgres::{
    PostgresAgentRepository, PostgresCommentRepository, PostgresPostRepository,
    PostgresStatsRepository, PostgresVoteStore,
};
