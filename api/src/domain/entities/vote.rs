//! Vote domain entity
//!
//! One ledger row per (voter, target). The row's direction is the source of
//! truth for the target's denormalized `vote_count`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AgentId, TargetRef};

/// Unique identifier for a vote row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteId(pub Uuid);

impl VoteId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for VoteId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for VoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a vote: upvote (+1) or downvote (-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn value(self) -> i32 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

impl TryFrom<i32> for VoteDirection {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteDirection::Up),
            -1 => Ok(VoteDirection::Down),
            other => Err(format!("vote_type must be 1 or -1, got {}", other)),
        }
    }
}

impl From<VoteDirection> for i32 {
    fn from(direction: VoteDirection) -> Self {
        direction.value()
    }
}

impl std::fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteDirection::Up => write!(f, "up"),
            VoteDirection::Down => write!(f, "down"),
        }
    }
}

/// A live vote in the ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vote {
    pub id: VoteId,
    pub voter_id: AgentId,
    pub target: TargetRef,
    pub direction: VoteDirection,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to insert a new vote row
#[derive(Debug, Clone)]
pub struct NewVote {
    pub voter_id: AgentId,
    pub target: TargetRef,
    pub direction: VoteDirection,
}

/// What a vote operation did to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    Recorded,
    Updated,
    AlreadyRecorded,
    Removed,
    NoVoteToRemove,
}

impl VoteAction {
    pub fn message(&self) -> &'static str {
        match self {
            VoteAction::Recorded => "Vote recorded",
            VoteAction::Updated => "Vote updated",
            VoteAction::AlreadyRecorded => "Vote already recorded",
            VoteAction::Removed => "Vote removed",
            VoteAction::NoVoteToRemove => "No vote to remove",
        }
    }

    /// True when the operation committed without changing any state
    pub fn is_no_op(&self) -> bool {
        matches!(self, VoteAction::AlreadyRecorded | VoteAction::NoVoteToRemove)
    }
}

/// Result of a cast or retract
#[derive(Debug, Clone, PartialEq)]
pub struct VoteOutcome {
    pub target: TargetRef,
    /// Direction now on record for the voter, `None` after a retract
    pub direction: Option<VoteDirection>,
    pub total_votes: i32,
    pub action: VoteAction,
}

impl VoteOutcome {
    pub fn was_no_op(&self) -> bool {
        self.action.is_no_op()
    }

    pub fn message(&self) -> &'static str {
        self.action.message()
    }
}

/// Count delta when replacing `previous` with `next` on the same target.
///
/// Inserting is `previous = None`, retracting is `next = None`.
pub fn count_delta(previous: Option<VoteDirection>, next: Option<VoteDirection>) -> i32 {
    next.map_or(0, VoteDirection::value) - previous.map_or(0, VoteDirection::value)
}
