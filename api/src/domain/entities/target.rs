//! Voteable target
//!
//! Posts and comments are the only things agents can vote on. The kind is a
//! closed enum; adapters map each variant to a concrete table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AgentId;

/// Kind of content a vote can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Post,
    Comment,
}

impl TargetKind {
    /// Tag stored in the ledger's `target_type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Post => "post",
            TargetKind::Comment => "comment",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "post" => Ok(TargetKind::Post),
            "comment" => Ok(TargetKind::Comment),
            _ => Err(format!(
                "Unknown target type: {}. Use: post, comment",
                s
            )),
        }
    }
}

/// Reference to a voteable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRef {
    pub kind: TargetKind,
    pub id: Uuid,
}

impl TargetRef {
    pub fn new(kind: TargetKind, id: Uuid) -> Self {
        Self { kind, id }
    }

    pub fn post(id: Uuid) -> Self {
        Self::new(TargetKind::Post, id)
    }

    pub fn comment(id: Uuid) -> Self {
        Self::new(TargetKind::Comment, id)
    }
}

impl std::fmt::Display for TargetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// The vote-relevant slice of a post or comment, as read inside a vote transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub target: TargetRef,
    pub author_id: AgentId,
    /// Denormalized sum of all live vote directions
    pub vote_count: i32,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Target {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
