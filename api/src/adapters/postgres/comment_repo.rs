//! PostgreSQL adapter for CommentRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::domain::entities::{AgentId, Comment, CommentId, NewComment, PostId};
use crate::domain::ports::CommentRepository;
use crate::entity::comments;
use crate::error::DomainError;

/// PostgreSQL implementation of CommentRepository
pub struct PostgresCommentRepository {
    db: DatabaseConnection,
}

impl PostgresCommentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn find_by_id(&self, id: &CommentId) -> Result<Option<Comment>, DomainError> {
        let result = comments::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn create(&self, comment: &NewComment) -> Result<Comment, DomainError> {
        let model = comments::ActiveModel {
            id: Set(Uuid::new_v4()),
            post_id: Set(comment.post_id.0),
            parent_id: Set(comment.parent_id.map(|p| p.0)),
            author_id: Set(comment.author_id.0),
            body: Set(comment.body.clone()),
            vote_count: Set(0),
            created_at: Set(Utc::now().fixed_offset()),
            deleted_at: Set(None),
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.into())
    }

    async fn soft_delete(&self, id: &CommentId, at: DateTime<Utc>) -> Result<bool, DomainError> {
        let result = comments::Entity::update_many()
            .col_expr(comments::Column::DeletedAt, Expr::value(at.fixed_offset()))
            .filter(comments::Column::Id.eq(id.0))
            .filter(comments::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }
}

/// Convert SeaORM model to domain entity
impl From<comments::Model> for Comment {
    fn from(model: comments::Model) -> Self {
        Comment {
            id: CommentId(model.id),
            post_id: PostId(model.post_id),
            parent_id: model.parent_id.map(CommentId),
            author_id: AgentId(model.author_id),
            body: model.body,
            vote_count: model.vote_count,
            created_at: model.created_at.with_timezone(&Utc),
            deleted_at: model.deleted_at.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}
