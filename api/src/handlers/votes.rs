//! Vote handlers
//!
//! Every vote outcome is a 200, including repeats and retracting nothing;
//! `message` says whether anything changed.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::vote_service::ReconcileReport;
use crate::domain::entities::{Agent, VoteOutcome};
use crate::error::AppError;
use crate::AppState;

/// Request body for casting a vote.
///
/// `target_type` and `vote_type` are validated by the vote service so that
/// bad values surface as validation errors rather than body rejections.
#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub target_type: String,
    pub target_id: Uuid,
    pub vote_type: i32,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    /// Direction on record after the call, absent after a retract
    pub vote_type: Option<i32>,
    pub total_votes: i32,
    pub message: String,
}

impl From<VoteOutcome> for VoteResponse {
    fn from(outcome: VoteOutcome) -> Self {
        VoteResponse {
            vote_type: outcome.direction.map(|d| d.value()),
            total_votes: outcome.total_votes,
            message: outcome.message().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub target_type: &'static str,
    pub target_id: Uuid,
    /// Count stored on the target before the check
    pub stored: i32,
    pub ledger_sum: i64,
    pub repaired: bool,
}

impl From<ReconcileReport> for ReconcileResponse {
    fn from(report: ReconcileReport) -> Self {
        ReconcileResponse {
            target_type: report.target.kind.as_str(),
            target_id: report.target.id,
            stored: report.stored,
            ledger_sum: report.ledger_sum,
            repaired: report.repaired,
        }
    }
}

/// POST /votes
pub async fn cast_vote(
    State(state): State<AppState>,
    Extension(agent): Extension<Agent>,
    Json(request): Json<CastVoteRequest>,
) -> Result<Json<VoteResponse>, AppError> {
    let outcome = state
        .vote_service
        .cast_vote(
            &agent.id,
            &request.target_type,
            request.target_id,
            request.vote_type,
        )
        .await?;
    Ok(Json(outcome.into()))
}

/// DELETE /votes/:target_type/:target_id
pub async fn retract_vote(
    State(state): State<AppState>,
    Extension(agent): Extension<Agent>,
    Path((target_type, target_id)): Path<(String, Uuid)>,
) -> Result<Json<VoteResponse>, AppError> {
    let outcome = state
        .vote_service
        .retract_vote(&agent.id, &target_type, target_id)
        .await?;
    Ok(Json(outcome.into()))
}

/// POST /votes/:target_type/:target_id/reconcile
///
/// Rebuild the target's total from its vote rows, repairing drift.
pub async fn reconcile_votes(
    State(state): State<AppState>,
    Extension(agent): Extension<Agent>,
    Path((target_type, target_id)): Path<(String, Uuid)>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let report = state
        .vote_service
        .reconcile(&target_type, target_id)
        .await?;
    tracing::info!(
        agent_id = %agent.id,
        target = %report.target,
        repaired = report.repaired,
        "Vote count reconcile requested"
    );
    Ok(Json(report.into()))
}
