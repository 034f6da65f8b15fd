//! Vote coordinator
//!
//! Casts, flips, and retracts votes. Each operation is one transaction over
//! the target row and the voter's ledger row: the target is locked, the
//! ledger row is written, and the target's `vote_count` is moved by the
//! difference between the old and new direction. Reputation and cache work
//! is queued only after the commit lands.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::app::side_effects::{SideEffect, SideEffectQueue};
use crate::domain::entities::{
    count_delta, AgentId, NewVote, Target, TargetKind, TargetRef, VoteAction, VoteDirection,
    VoteOutcome,
};
use crate::domain::ports::cache::target_key;
use crate::domain::ports::{VoteStore, VoteTransaction};
use crate::error::{AppError, DomainError};

/// Default bound on a single vote transaction
pub const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(5);

/// Attempts per operation: the first run plus one retry on `Conflict`
const MAX_ATTEMPTS: u32 = 2;

/// Result of comparing a target's stored count against its ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub target: TargetRef,
    pub stored: i32,
    pub ledger_sum: i64,
    pub repaired: bool,
}

pub struct VoteService<VS: VoteStore> {
    store: Arc<VS>,
    effects: SideEffectQueue,
    tx_timeout: Duration,
}

impl<VS: VoteStore> VoteService<VS> {
    pub fn new(store: Arc<VS>, effects: SideEffectQueue) -> Self {
        Self {
            store,
            effects,
            tx_timeout: DEFAULT_TX_TIMEOUT,
        }
    }

    pub fn with_tx_timeout(mut self, tx_timeout: Duration) -> Self {
        self.tx_timeout = tx_timeout;
        self
    }

    /// Cast or change a vote.
    ///
    /// Re-casting the direction already on record commits nothing and reports
    /// `VoteAction::AlreadyRecorded`.
    pub async fn cast_vote(
        &self,
        voter_id: &AgentId,
        target_type: &str,
        target_id: Uuid,
        vote_type: i32,
    ) -> Result<VoteOutcome, AppError> {
        let target = parse_target(target_type, target_id)?;
        let direction = VoteDirection::try_from(vote_type).map_err(DomainError::Validation)?;

        let (outcome, author_id) = self
            .run_with_retry("cast_vote", move || self.cast_once(voter_id, target, direction))
            .await?;

        tracing::info!(
            voter_id = %voter_id,
            target = %target,
            direction = %direction,
            total_votes = outcome.total_votes,
            action = ?outcome.action,
            "Vote cast"
        );

        self.after_commit(&outcome, &author_id);
        Ok(outcome)
    }

    /// Remove the voter's vote on a target, if any.
    ///
    /// Retracting when no vote exists succeeds with `VoteAction::NoVoteToRemove`.
    pub async fn retract_vote(
        &self,
        voter_id: &AgentId,
        target_type: &str,
        target_id: Uuid,
    ) -> Result<VoteOutcome, AppError> {
        let target = parse_target(target_type, target_id)?;

        let (outcome, author_id) = self
            .run_with_retry("retract_vote", move || self.retract_once(voter_id, target))
            .await?;

        tracing::info!(
            voter_id = %voter_id,
            target = %target,
            total_votes = outcome.total_votes,
            action = ?outcome.action,
            "Vote retracted"
        );

        self.after_commit(&outcome, &author_id);
        Ok(outcome)
    }

    /// `reconcile_target` for a target named by the wire strings.
    pub async fn reconcile(
        &self,
        target_type: &str,
        target_id: Uuid,
    ) -> Result<ReconcileReport, AppError> {
        let target = parse_target(target_type, target_id)?;
        self.reconcile_target(target).await
    }

    /// Re-derive a target's count from its ledger rows and repair drift.
    pub async fn reconcile_target(&self, target: TargetRef) -> Result<ReconcileReport, AppError> {
        let report = self
            .run_with_retry("reconcile_target", move || self.reconcile_once(target))
            .await?;

        if report.repaired {
            tracing::warn!(
                target = %target,
                stored = report.stored,
                ledger_sum = report.ledger_sum,
                "Vote count drifted from ledger, repaired"
            );
            self.effects
                .dispatch(SideEffect::InvalidateCache(vec![target_key(&target)]));
        } else {
            tracing::debug!(target = %target, vote_count = report.stored, "Vote count consistent");
        }

        Ok(report)
    }

    async fn cast_once(
        &self,
        voter_id: &AgentId,
        target: TargetRef,
        direction: VoteDirection,
    ) -> Result<(VoteOutcome, AgentId), DomainError> {
        let mut tx = self.store.begin().await?;

        let current = live_target(&mut tx, &target).await?;
        if current.author_id == *voter_id {
            return Err(DomainError::Forbidden(
                "Agents cannot vote on their own content".to_string(),
            ));
        }

        let (action, previous) = match tx.find_vote(voter_id, &target).await? {
            None => {
                tx.insert_vote(&NewVote {
                    voter_id: *voter_id,
                    target,
                    direction,
                })
                .await?;
                (VoteAction::Recorded, None)
            }
            Some(existing) if existing.direction == direction => {
                tx.commit().await?;
                let outcome = VoteOutcome {
                    target,
                    direction: Some(direction),
                    total_votes: current.vote_count,
                    action: VoteAction::AlreadyRecorded,
                };
                return Ok((outcome, current.author_id));
            }
            Some(existing) => {
                tx.update_vote_direction(&existing.id, direction).await?;
                (VoteAction::Updated, Some(existing.direction))
            }
        };

        let total_votes = tx
            .apply_count_delta(&target, count_delta(previous, Some(direction)))
            .await?;
        tx.commit().await?;

        let outcome = VoteOutcome {
            target,
            direction: Some(direction),
            total_votes,
            action,
        };
        Ok((outcome, current.author_id))
    }

    async fn retract_once(
        &self,
        voter_id: &AgentId,
        target: TargetRef,
    ) -> Result<(VoteOutcome, AgentId), DomainError> {
        let mut tx = self.store.begin().await?;

        let current = live_target(&mut tx, &target).await?;

        let Some(existing) = tx.find_vote(voter_id, &target).await? else {
            tx.commit().await?;
            let outcome = VoteOutcome {
                target,
                direction: None,
                total_votes: current.vote_count,
                action: VoteAction::NoVoteToRemove,
            };
            return Ok((outcome, current.author_id));
        };

        tx.delete_vote(&existing.id).await?;
        let total_votes = tx
            .apply_count_delta(&target, count_delta(Some(existing.direction), None))
            .await?;
        tx.commit().await?;

        let outcome = VoteOutcome {
            target,
            direction: None,
            total_votes,
            action: VoteAction::Removed,
        };
        Ok((outcome, current.author_id))
    }

    async fn reconcile_once(&self, target: TargetRef) -> Result<ReconcileReport, DomainError> {
        let mut tx = self.store.begin().await?;

        // Deleted targets keep their ledger rows, so they are reconciled too
        let current = tx
            .get_target_for_update(&target)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Target not found: {}", target)))?;

        let ledger_sum = tx.sum_votes(&target).await?;
        let repaired = i64::from(current.vote_count) != ledger_sum;

        if repaired {
            let count = i32::try_from(ledger_sum).map_err(|_| {
                DomainError::Internal(format!("Ledger sum out of range for {}", target))
            })?;
            tx.set_vote_count(&target, count).await?;
        }
        tx.commit().await?;

        Ok(ReconcileReport {
            target,
            stored: current.vote_count,
            ledger_sum,
            repaired,
        })
    }

    /// Run one transactional attempt under the timeout, retrying once on `Conflict`.
    ///
    /// A timed-out attempt is dropped mid-flight, which rolls its transaction back.
    async fn run_with_retry<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let mut tries = 0;
        loop {
            tries += 1;
            let result = match tokio::time::timeout(self.tx_timeout, attempt()).await {
                Ok(result) => result,
                Err(_) => Err(DomainError::Timeout(format!(
                    "{} exceeded {}ms",
                    operation,
                    self.tx_timeout.as_millis()
                ))),
            };

            match result {
                Err(DomainError::Conflict(msg)) if tries < MAX_ATTEMPTS => {
                    tracing::warn!(operation, error = %msg, "Vote conflict, retrying");
                }
                other => return other.map_err(AppError::from),
            }
        }
    }

    fn after_commit(&self, outcome: &VoteOutcome, author_id: &AgentId) {
        if outcome.was_no_op() {
            return;
        }
        self.effects.content_changed(Some(&outcome.target), author_id);
    }
}

fn parse_target(target_type: &str, target_id: Uuid) -> Result<TargetRef, DomainError> {
    let kind = target_type
        .parse::<TargetKind>()
        .map_err(DomainError::Validation)?;
    Ok(TargetRef::new(kind, target_id))
}

async fn live_target<T: VoteTransaction>(
    tx: &mut T,
    target: &TargetRef,
) -> Result<Target, DomainError> {
    match tx.get_target_for_update(target).await? {
        Some(current) if !current.is_deleted() => Ok(current),
        _ => Err(DomainError::NotFound(format!("Target not found: {}", target))),
    }
}
