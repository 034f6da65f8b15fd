//! PostgreSQL adapters
//!
//! Implementations of repository traits using SeaORM and PostgreSQL.

pub mod agent_repo;
pub mod comment_repo;
pub mod post_repo;
pub mod stats_repo;
pub mod vote_store;

#[cfg(test)]
mod integration_tests;

use sea_orm::{DbErr, SqlErr};

pub use agent_repo::PostgresAgentRepository;
pub use comment_repo::PostgresCommentRepository;
pub use post_repo::PostgresPostRepository;
pub use stats_repo::PostgresStatsRepository;
pub use vote_store::{PostgresVoteStore, PostgresVoteTransaction};

/// True if the error is a unique index violation
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
