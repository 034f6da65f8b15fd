//! PostgreSQL adapter for VoteStore
//!
//! Every transaction locks the target row first (`SELECT ... FOR UPDATE`) and
//! the voter's ledger row second, so concurrent operations on one target
//! queue behind each other in the same order and cannot deadlock. Count
//! changes are relative SQL updates, never read-modify-write.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, QuerySelect, Set, Statement,
    TransactionTrait,
};
use uuid::Uuid;

use super::is_unique_violation;
use crate::domain::entities::{
    AgentId, NewVote, Target, TargetKind, TargetRef, Vote, VoteDirection, VoteId,
};
use crate::domain::ports::{VoteStore, VoteTransaction};
use crate::entity::{comments, posts, votes};
use crate::error::DomainError;

/// PostgreSQL implementation of VoteStore
pub struct PostgresVoteStore {
    db: DatabaseConnection,
}

impl PostgresVoteStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VoteStore for PostgresVoteStore {
    type Transaction = PostgresVoteTransaction;

    async fn begin(&self) -> Result<Self::Transaction, DomainError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(PostgresVoteTransaction { txn })
    }
}

/// Open transaction; rolls back when dropped uncommitted
pub struct PostgresVoteTransaction {
    txn: DatabaseTransaction,
}

/// Table holding the counter for each target kind
fn count_table(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Post => "posts",
        TargetKind::Comment => "comments",
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Database(e.to_string())
}

#[async_trait]
impl VoteTransaction for PostgresVoteTransaction {
    async fn get_target_for_update(
        &mut self,
        target: &TargetRef,
    ) -> Result<Option<Target>, DomainError> {
        let found = match target.kind {
            TargetKind::Post => posts::Entity::find_by_id(target.id)
                .lock_exclusive()
                .one(&self.txn)
                .await
                .map_err(db_err)?
                .map(|m| (m.author_id, m.vote_count, m.deleted_at)),
            TargetKind::Comment => comments::Entity::find_by_id(target.id)
                .lock_exclusive()
                .one(&self.txn)
                .await
                .map_err(db_err)?
                .map(|m| (m.author_id, m.vote_count, m.deleted_at)),
        };

        Ok(found.map(|(author_id, vote_count, deleted_at)| Target {
            target: *target,
            author_id: AgentId(author_id),
            vote_count,
            deleted_at: deleted_at.map(|dt| dt.with_timezone(&Utc)),
        }))
    }

    async fn find_vote(
        &mut self,
        voter_id: &AgentId,
        target: &TargetRef,
    ) -> Result<Option<Vote>, DomainError> {
        let result = votes::Entity::find()
            .filter(votes::Column::AgentId.eq(voter_id.0))
            .filter(votes::Column::TargetType.eq(target.kind.as_str()))
            .filter(votes::Column::TargetId.eq(target.id))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?;

        result.map(Vote::try_from).transpose()
    }

    async fn insert_vote(&mut self, vote: &NewVote) -> Result<Vote, DomainError> {
        let now = Utc::now().fixed_offset();

        let model = votes::ActiveModel {
            id: Set(Uuid::new_v4()),
            agent_id: Set(vote.voter_id.0),
            target_type: Set(vote.target.kind.as_str().to_string()),
            target_id: Set(vote.target.id),
            vote_type: Set(vote.direction.value()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = model.insert(&self.txn).await.map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::Conflict(format!(
                    "Vote by {} on {} already exists",
                    vote.voter_id, vote.target
                ))
            } else {
                db_err(e)
            }
        })?;

        Vote::try_from(result)
    }

    async fn update_vote_direction(
        &mut self,
        id: &VoteId,
        direction: VoteDirection,
    ) -> Result<(), DomainError> {
        let result = votes::Entity::update_many()
            .col_expr(votes::Column::VoteType, Expr::value(direction.value()))
            .col_expr(votes::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(votes::Column::Id.eq(id.0))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound(format!("Vote {} not found", id)));
        }
        Ok(())
    }

    async fn delete_vote(&mut self, id: &VoteId) -> Result<(), DomainError> {
        let result = votes::Entity::delete_by_id(id.0)
            .exec(&self.txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound(format!("Vote {} not found", id)));
        }
        Ok(())
    }

    async fn apply_count_delta(
        &mut self,
        target: &TargetRef,
        delta: i32,
    ) -> Result<i32, DomainError> {
        // Atomic increment; the table name comes from the closed TargetKind
        let sql = format!(
            "UPDATE {} SET vote_count = vote_count + $1 WHERE id = $2 RETURNING vote_count",
            count_table(target.kind)
        );
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            &sql,
            [delta.into(), target.id.into()],
        );

        let row = self
            .txn
            .query_one(stmt)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::NotFound(format!("Target not found: {}", target)))?;

        row.try_get::<i32>("", "vote_count").map_err(db_err)
    }

    async fn sum_votes(&mut self, target: &TargetRef) -> Result<i64, DomainError> {
        let result: Option<Option<i64>> = votes::Entity::find()
            .filter(votes::Column::TargetType.eq(target.kind.as_str()))
            .filter(votes::Column::TargetId.eq(target.id))
            .select_only()
            .column_as(Expr::col(votes::Column::VoteType).sum(), "sum")
            .into_tuple()
            .one(&self.txn)
            .await
            .map_err(db_err)?;

        Ok(result.flatten().unwrap_or(0))
    }

    async fn set_vote_count(&mut self, target: &TargetRef, count: i32) -> Result<(), DomainError> {
        let result = match target.kind {
            TargetKind::Post => posts::Entity::update_many()
                .col_expr(posts::Column::VoteCount, Expr::value(count))
                .filter(posts::Column::Id.eq(target.id))
                .exec(&self.txn)
                .await,
            TargetKind::Comment => comments::Entity::update_many()
                .col_expr(comments::Column::VoteCount, Expr::value(count))
                .filter(comments::Column::Id.eq(target.id))
                .exec(&self.txn)
                .await,
        }
        .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound(format!("Target not found: {}", target)));
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), DomainError> {
        self.txn.commit().await.map_err(db_err)
    }
}

/// Convert SeaORM model to domain entity
impl TryFrom<votes::Model> for Vote {
    type Error = DomainError;

    fn try_from(model: votes::Model) -> Result<Self, Self::Error> {
        let kind: TargetKind = model.target_type.parse().map_err(DomainError::Internal)?;
        let direction = VoteDirection::try_from(model.vote_type).map_err(DomainError::Internal)?;

        Ok(Vote {
            id: VoteId(model.id),
            voter_id: AgentId(model.agent_id),
            target: TargetRef::new(kind, model.target_id),
            direction,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}
