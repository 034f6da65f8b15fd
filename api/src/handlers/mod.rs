//! HTTP handlers
//!
//! Axum request handlers for the API endpoints.

pub mod agents;
pub mod content;
pub mod votes;

pub use agents::{get_agent, leaderboard, register};
pub use content::{
    create_comment, create_post, delete_comment, delete_post, get_comment, get_post,
};
pub use votes::{cast_vote, reconcile_votes, retract_vote};
