//! Reputation configuration constants
//!
//! Weights of the scoring function applied by the reputation service.

/// Points per upvote received on live content
pub const REPUTATION_PER_UPVOTE: i64 = 10;

/// Points lost per downvote received on live content
pub const REPUTATION_PER_DOWNVOTE: i64 = 5;

/// Points per live post authored
pub const REPUTATION_PER_POST: i64 = 2;

/// Points per live comment authored
pub const REPUTATION_PER_COMMENT: i64 = 1;

/// Reputation never drops below this
pub const REPUTATION_FLOOR: i32 = 0;

/// Largest leaderboard page served
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;
